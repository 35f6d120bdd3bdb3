//! An in-process event bus good enough to exercise the consumer loop in
//! tests and single-node deployments, without standing up a broker.

use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::domain::error::EventError;
use crate::ports::event_stream::{Event, EventHandle, EventStream};

/// Acks/nacks are no-ops: there is nothing upstream to redeliver from,
/// since the event already left the channel the moment `receive` returned it.
struct InMemoryHandle;

#[async_trait]
impl EventHandle for InMemoryHandle {
    async fn ack(&self) -> Result<(), EventError> {
        Ok(())
    }

    async fn nack(&self) -> Result<(), EventError> {
        Ok(())
    }
}

/// A single unbounded mpsc channel shared by every consumer group.
/// Good enough for a single-process deployment (spec.md §9's default
/// event_bus_enabled wiring); a real broker adapter would fan out per
/// group instead.
pub struct InMemoryEventStream {
    sender: StdMutex<Option<mpsc::UnboundedSender<Event>>>,
    receiver: Mutex<mpsc::UnboundedReceiver<Event>>,
}

impl InMemoryEventStream {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender: StdMutex::new(Some(sender)), receiver: Mutex::new(receiver) }
    }
}

impl Default for InMemoryEventStream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStream for InMemoryEventStream {
    async fn receive(&self, _group: &str, timeout_ms: u64) -> Option<(Event, Box<dyn EventHandle>)> {
        let mut receiver = self.receiver.lock().await;
        let event = if timeout_ms == 0 {
            receiver.recv().await
        } else {
            tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), receiver.recv()).await.ok().flatten()
        };
        event.map(|e| (e, Box::new(InMemoryHandle) as Box<dyn EventHandle>))
    }

    async fn publish(&self, event: Event) -> Result<(), EventError> {
        let sender = self.sender.lock().expect("sender mutex poisoned").clone();
        match sender {
            Some(sender) => sender.send(event).map_err(|_| EventError::UnrecognizedType("event bus is shut down".to_string())),
            None => Err(EventError::UnrecognizedType("event bus is shut down".to_string())),
        }
    }

    /// Drops the sender so every in-flight and future `receive` call
    /// observes a closed channel and returns `None`.
    fn shutdown(&self) {
        *self.sender.lock().expect("sender mutex poisoned") = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::ports::event_stream::EventPriority;

    fn sample_event(id: &str) -> Event {
        Event {
            id: id.to_string(),
            event_type: "rl.strategy_feedback".to_string(),
            correlation_id: None,
            priority: EventPriority::Low,
            occurred_at: Utc::now(),
            payload: serde_json::json!({"context": "ctx", "action": "optimize_for_ctr", "reward": 0.5}),
        }
    }

    #[tokio::test]
    async fn published_events_are_received_in_order() {
        let stream = InMemoryEventStream::new();
        stream.publish(sample_event("e1")).await.unwrap();
        stream.publish(sample_event("e2")).await.unwrap();

        let (first, _) = stream.receive("group", 100).await.unwrap();
        let (second, _) = stream.receive("group", 100).await.unwrap();
        assert_eq!(first.id, "e1");
        assert_eq!(second.id, "e2");
    }

    #[tokio::test]
    async fn receive_times_out_when_nothing_published() {
        let stream = InMemoryEventStream::new();
        let result = stream.receive("group", 20).await;
        assert!(result.is_none());
    }
}
