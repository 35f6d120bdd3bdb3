//! The durable event-bus port (C6), consumer-group, at-least-once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::EventError;

/// Delivery priority, carried by the bus but not interpreted by this
/// service beyond passthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// One message read from the bus. `payload` is the event's JSON body;
/// handlers pull out the fields the table in spec.md §4.5 requires and
/// surface `EventError::MissingField` for anything absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub event_type: String,
    pub correlation_id: Option<String>,
    pub priority: EventPriority,
    pub occurred_at: DateTime<Utc>,
    pub payload: Value,
}

impl Event {
    pub fn require_str(&self, field: &'static str) -> Result<String, EventError> {
        self.payload
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EventError::MissingField { event_type: self.event_type.clone(), field })
    }

    pub fn require_f64(&self, field: &'static str) -> Result<f64, EventError> {
        self.payload
            .get(field)
            .and_then(Value::as_f64)
            .ok_or_else(|| EventError::MissingField { event_type: self.event_type.clone(), field })
    }

    pub fn require_bool(&self, field: &'static str) -> Result<bool, EventError> {
        self.payload
            .get(field)
            .and_then(Value::as_bool)
            .ok_or_else(|| EventError::MissingField { event_type: self.event_type.clone(), field })
    }

    pub fn optional_f64(&self, field: &'static str, default: f64) -> f64 {
        self.payload.get(field).and_then(Value::as_f64).unwrap_or(default)
    }
}

/// A handle an [`EventStream`] hands back for a received message, used to
/// ack or nack it once the handler has run.
#[async_trait]
pub trait EventHandle: Send + Sync {
    async fn ack(&self) -> Result<(), EventError>;
    async fn nack(&self) -> Result<(), EventError>;
}

/// Durable, consumer-group event bus. Only the interface is specified;
/// the real bus is an external collaborator (spec.md §1). Shipped with
/// one in-memory adapter good enough to drive tests and local runs.
#[async_trait]
pub trait EventStream: Send + Sync {
    /// Blocks until a message arrives, the bound timeout elapses (`None`),
    /// or the stream is shut down (`None`).
    async fn receive(&self, group: &str, timeout_ms: u64) -> Option<(Event, Box<dyn EventHandle>)>;

    /// Publishes an event, e.g. `rl.experience_learned` / `rl.batch_processed`.
    async fn publish(&self, event: Event) -> Result<(), EventError>;

    /// Unblocks any in-flight `receive` call and causes subsequent calls
    /// to return `None` immediately, for graceful consumer shutdown.
    fn shutdown(&self);
}
