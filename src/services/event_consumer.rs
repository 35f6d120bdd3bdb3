//! The event consumer (C6): subscribes to reward-bearing event streams,
//! computes reward from metrics where the event doesn't carry one, and
//! invokes `RlService::learn`. At-least-once delivery, deduplicated by
//! event id.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::domain::error::EventError;
use crate::domain::models::Action;
use crate::ports::event_stream::EventStream;
use crate::services::engine::ExperienceMetadata;
use crate::services::reward::{calculate_reward, RewardInputs};
use crate::services::rl_service::RlService;

const DEDUP_CAPACITY: usize = 4096;

/// Long-lived worker driven by a cancellation signal, kept in its own
/// execution unit so it can apply independent back-pressure from any
/// ingress surface (spec.md §9).
pub struct EventConsumer {
    stream: Arc<dyn EventStream>,
    service: RlService,
    group: String,
    seen_event_ids: Mutex<LruCache<String, ()>>,
}

impl EventConsumer {
    pub fn new(stream: Arc<dyn EventStream>, service: RlService, group: impl Into<String>) -> Self {
        Self {
            stream,
            service,
            group: group.into(),
            seen_event_ids: Mutex::new(LruCache::new(NonZeroUsize::new(DEDUP_CAPACITY).expect("nonzero capacity"))),
        }
    }

    /// Runs until `shutdown()` is called on the underlying stream. At
    /// most one in-flight message completes after shutdown is signalled.
    pub async fn run(&self, poll_timeout_ms: u64) {
        loop {
            let Some((event, handle)) = self.stream.receive(&self.group, poll_timeout_ms).await else {
                break;
            };

            let already_seen = { self.seen_event_ids.lock().await.contains(&event.id) };
            if already_seen {
                debug!(event_id = %event.id, "duplicate event, acking without reprocessing");
                if let Err(err) = handle.ack().await {
                    warn!(error = %err, "failed to ack duplicate event");
                }
                continue;
            }

            match self.dispatch(&event.event_type, &event).await {
                Ok(()) => {
                    // Only marked seen once the handler has actually succeeded, so a
                    // transient failure leaves the id eligible for reprocessing on
                    // redelivery instead of being silently dropped as a duplicate.
                    self.seen_event_ids.lock().await.put(event.id.clone(), ());
                    if let Err(err) = handle.ack().await {
                        warn!(error = %err, "failed to ack processed event");
                    }
                }
                Err(err) => {
                    error!(error = %err, event_type = %event.event_type, "event handler failed, leaving unacked for redelivery");
                    if let Err(nack_err) = handle.nack().await {
                        warn!(error = %nack_err, "failed to nack event");
                    }
                }
            }
        }
    }

    async fn dispatch(&self, event_type: &str, event: &crate::ports::event_stream::Event) -> Result<(), EventError> {
        match event_type {
            "traffic.request_completed" => self.handle_traffic_request_completed(event).await,
            "campaign.performance_updated" => self.handle_campaign_performance_updated(event).await,
            "rl.strategy_feedback" => self.handle_strategy_feedback(event).await,
            other => Err(EventError::UnrecognizedType(other.to_string())),
        }
    }

    async fn handle_traffic_request_completed(&self, event: &crate::ports::event_stream::Event) -> Result<(), EventError> {
        let context = event.require_str("context")?;
        let action_str = event.require_str("action")?;
        let action: Action = action_str.parse()?;
        let success = event.require_bool("success")?;
        let roas = event.optional_f64("roas", 0.0);
        let ctr = event.optional_f64("ctr", 0.0);
        let conversions = event.optional_f64("conversions", 0.0);

        let reward = calculate_reward(RewardInputs { success, roas, ctr, conversions });
        self.learn(context, action, reward, event.correlation_id.clone()).await
    }

    async fn handle_campaign_performance_updated(&self, event: &crate::ports::event_stream::Event) -> Result<(), EventError> {
        let context = event.require_str("strategic_context")?;
        let action_str = event.require_str("previous_action")?;
        let action: Action = action_str.parse()?;
        let improvement = event.require_bool("improvement")?;
        let roas = event.optional_f64("roas", 0.0);

        let mut reward = if improvement { 0.5 } else { -0.5 };
        if roas > 3.0 {
            reward += 0.3;
        } else if roas < 1.0 {
            reward -= 0.3;
        }
        let reward = reward.clamp(-1.0, 1.0);

        self.learn(context, action, reward, event.correlation_id.clone()).await
    }

    async fn handle_strategy_feedback(&self, event: &crate::ports::event_stream::Event) -> Result<(), EventError> {
        let context = event.require_str("context")?;
        let action_str = event.require_str("action")?;
        let action: Action = action_str.parse()?;
        let reward = event.require_f64("reward")?.clamp(-1.0, 1.0);

        self.learn(context, action, reward, event.correlation_id.clone()).await
    }

    async fn learn(&self, context: String, action: Action, reward: f64, correlation_id: Option<String>) -> Result<(), EventError> {
        let metadata = ExperienceMetadata { fields: Default::default(), correlation_id };
        self.service
            .learn(context, action, reward, metadata)
            .await
            .map(|_| ())
            .map_err(EventError::Validation)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex as TokioMutex;

    use super::*;
    use crate::domain::error::PersistenceError;
    use crate::domain::models::{Experience, Strategy};
    use crate::ports::event_stream::{Event, EventHandle, EventPriority};
    use crate::ports::persistence::{LoadedState, RlRepository};
    use crate::services::engine::EngineConfig;
    use uuid::Uuid;

    struct NoopRepository;

    #[async_trait]
    impl RlRepository for NoopRepository {
        async fn save_strategies(&self, _all: &std::collections::HashMap<String, Strategy>) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn save_q_row(&self, _context: &str, _row: &std::collections::HashMap<Action, f64>) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn insert_experience(&self, _exp: &Experience) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn delete_experience(&self, _id: Uuid) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn bulk_insert_history(&self, _exps: &[Experience]) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn cleanup_history(&self, _before: chrono::DateTime<Utc>) -> Result<u64, PersistenceError> {
            Ok(0)
        }
        async fn load_all(&self) -> Result<LoadedState, PersistenceError> {
            Ok(LoadedState::default())
        }
        async fn ping(&self) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    struct FakeHandle {
        acked: StdArc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandle for FakeHandle {
        async fn ack(&self) -> Result<(), EventError> {
            self.acked.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn nack(&self) -> Result<(), EventError> {
            Ok(())
        }
    }

    struct QueueStream {
        queue: TokioMutex<Vec<Event>>,
        acked: StdArc<AtomicUsize>,
    }

    #[async_trait]
    impl EventStream for QueueStream {
        async fn receive(&self, _group: &str, _timeout_ms: u64) -> Option<(Event, Box<dyn EventHandle>)> {
            let mut queue = self.queue.lock().await;
            queue.pop().map(|e| (e, Box::new(FakeHandle { acked: self.acked.clone() }) as Box<dyn EventHandle>))
        }
        async fn publish(&self, _event: Event) -> Result<(), EventError> {
            Ok(())
        }
        fn shutdown(&self) {}
    }

    fn traffic_event(id: &str) -> Event {
        Event {
            id: id.to_string(),
            event_type: "traffic.request_completed".to_string(),
            correlation_id: None,
            priority: EventPriority::Low,
            occurred_at: Utc::now(),
            payload: serde_json::json!({
                "context": "ctx_conversion_moderate_moderate",
                "action": "optimize_for_ctr",
                "success": true,
                "roas": 4.0,
                "ctr": 3.0,
                "conversions": 40.0,
            }),
        }
    }

    #[tokio::test]
    async fn duplicate_event_id_is_acked_without_relearning() {
        let acked = StdArc::new(AtomicUsize::new(0));
        let stream = StdArc::new(QueueStream {
            queue: TokioMutex::new(vec![traffic_event("e1"), traffic_event("e1")]),
            acked: acked.clone(),
        });
        let service = RlService::new(EngineConfig::default(), StdArc::new(NoopRepository), None);
        let consumer = EventConsumer::new(stream.clone(), service.clone(), "test-group");

        consumer.run(10).await;

        assert_eq!(acked.load(Ordering::SeqCst), 2);
        let buffer = service.get_metrics().await;
        assert_eq!(buffer.buffer.active_unprocessed, 1);
    }

    #[tokio::test]
    async fn unrecognized_event_type_is_nacked() {
        let acked = StdArc::new(AtomicUsize::new(0));
        let mut bad = traffic_event("e2");
        bad.event_type = "something.unknown".to_string();
        let stream = StdArc::new(QueueStream { queue: TokioMutex::new(vec![bad]), acked: acked.clone() });
        let service = RlService::new(EngineConfig::default(), StdArc::new(NoopRepository), None);
        let consumer = EventConsumer::new(stream, service, "test-group");

        consumer.run(10).await;

        assert_eq!(acked.load(Ordering::SeqCst), 0);
    }
}
