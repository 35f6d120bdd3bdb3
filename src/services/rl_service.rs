//! The learning-service use-case surface (C5): the single entry point
//! callers (CLI, event consumer) drive. Every operation here is an
//! atomic unit under the engine lock; persistence and event publication
//! happen after the lock is released (spec.md §5).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{error, warn};
use uuid::Uuid;

use crate::domain::error::{PersistenceError, ValidationError};
use crate::domain::models::{Action, BufferUtilization, CampaignContext, CampaignMetrics, Experience, Strategy};
use crate::ports::event_stream::{Event, EventPriority, EventStream};
use crate::ports::persistence::RlRepository;
use crate::services::engine::{EngineConfig, ExperienceMetadata, ProcessingStats, QLearningEngine};
use crate::services::rng::SplitMix64Rng;

/// Which buffer a `get_buffer` caller wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Active,
    History,
}

/// Result of `generate_action`. Echoes the request's context and metrics
/// back to the caller alongside the decision, per spec.md §6.
#[derive(Debug, Clone)]
pub struct GenerateActionResult {
    pub action: Action,
    pub confidence: f64,
    pub reasoning: String,
    pub normalized_context: String,
    pub context: CampaignContext,
    pub metrics: CampaignMetrics,
    pub buffer: BufferUtilization,
    pub generated_at: DateTime<Utc>,
}

/// Result of `learn`.
#[derive(Debug, Clone)]
pub struct LearnResult {
    pub experience_id: Uuid,
    pub buffer: BufferUtilization,
    pub strategies_count: usize,
    pub auto_processed: bool,
    pub processing: Option<ProcessingStats>,
}

/// Snapshot returned by `get_metrics`.
#[derive(Debug, Clone)]
pub struct LearningMetrics {
    pub contexts_learned: usize,
    pub total_experiences: u64,
    pub buffer: BufferUtilization,
    pub average_confidence: f64,
    pub confidence_samples: usize,
}

/// Everything `RlService::generate_action` needs, with the defaults from
/// spec.md §6 applied by the caller before construction.
#[derive(Debug, Clone)]
pub struct GenerateActionRequest {
    pub context: CampaignContext,
    pub metrics: CampaignMetrics,
}

/// The use-case surface. Cheaply cloneable: holds only `Arc`s, so the CLI
/// and the event consumer can share one instance.
#[derive(Clone)]
pub struct RlService {
    engine: Arc<Mutex<QLearningEngine>>,
    repository: Arc<dyn RlRepository>,
    events: Option<Arc<dyn EventStream>>,
}

impl RlService {
    pub fn new(config: EngineConfig, repository: Arc<dyn RlRepository>, events: Option<Arc<dyn EventStream>>) -> Self {
        let engine = QLearningEngine::new(config, Box::new(SplitMix64Rng::from_entropy()));
        Self { engine: Arc::new(Mutex::new(engine)), repository, events }
    }

    /// Loads persisted state into the engine. Called once at startup
    /// (C8); a load failure on this non-critical collection degrades to
    /// an empty in-memory state with a warning, per spec.md §7.
    pub async fn load_from_repository(&self) {
        match self.repository.load_all().await {
            Ok(loaded) => {
                let mut engine = self.engine.lock().await;
                let config = *engine.config();
                let q_table = crate::domain::models::QTable::from_rows(loaded.q_rows);
                let mut buffer = crate::domain::models::DualBuffer::from_parts(
                    loaded.active_experiences.into(),
                    loaded.history_experiences.into(),
                    config.max_active_buffer,
                    config.max_history_buffer,
                    config.auto_process_threshold,
                    config.history_retention_hours,
                );
                buffer.prune_history(Utc::now());
                engine.load_state(q_table, loaded.strategies, buffer);
            }
            Err(err) => {
                warn!(error = %err, "failed to load persisted RL state, starting cold");
            }
        }
    }

    pub async fn generate_action(&self, req: GenerateActionRequest) -> GenerateActionResult {
        let mut engine = self.engine.lock().await;
        let (action, confidence, reasoning) = engine.generate_action(&req.context, &req.metrics);
        let normalized_context = req.context.normalize();
        GenerateActionResult {
            action,
            confidence,
            reasoning,
            normalized_context,
            context: req.context,
            metrics: req.metrics,
            buffer: engine.buffer_utilization(),
            generated_at: Utc::now(),
        }
    }

    /// Validates and appends an experience; if the active buffer crosses
    /// the auto-process threshold, runs a processing pass synchronously
    /// before returning. Never fails on a persistence error (write-behind).
    pub async fn learn(
        &self,
        normalized_context: impl Into<String>,
        action: Action,
        reward: f64,
        metadata: ExperienceMetadata,
    ) -> Result<LearnResult, ValidationError> {
        let now = Utc::now();
        let normalized_context = normalized_context.into();
        if normalized_context.trim().is_empty() {
            return Err(ValidationError::InvalidContext);
        }

        let correlation_id = metadata.correlation_id.clone();
        let (experience_id, auto_processed, processing, new_experience, promoted_batch) = {
            let mut engine = self.engine.lock().await;
            let id = engine.add_experience(normalized_context.clone(), action, reward, now, metadata)?;
            let exp = engine.active_experiences().iter().find(|e| e.id == id).cloned();

            if engine.should_auto_process() {
                let stats = engine.process_experiences(now);
                let batch: Vec<Experience> = engine.history_experiences().iter().rev().take(stats.processed_count as usize).cloned().collect();
                (id, true, Some(stats), exp, batch)
            } else {
                (id, false, None, exp, Vec::new())
            }
        };

        let buffer;
        let strategies_count;
        {
            let engine = self.engine.lock().await;
            buffer = engine.buffer_utilization();
            strategies_count = engine.strategies().len();
        }

        if let Some(exp) = new_experience {
            if let Err(err) = self.repository.insert_experience(&exp).await {
                error!(error = %err, "failed to persist new experience");
            }
        }

        if !promoted_batch.is_empty() {
            self.persist_processing_batch(&promoted_batch).await;
        }

        self.publish_if_bound("rl.experience_learned", &normalized_context, action, correlation_id.clone()).await;
        if auto_processed {
            self.publish_if_bound("rl.batch_processed", &normalized_context, action, correlation_id).await;
        }

        Ok(LearnResult { experience_id, buffer, strategies_count, auto_processed, processing })
    }

    /// Forces a processing pass regardless of threshold.
    pub async fn process(&self) -> ProcessingStats {
        let now = Utc::now();
        let (stats, batch) = {
            let mut engine = self.engine.lock().await;
            let stats = engine.process_experiences(now);
            let batch: Vec<Experience> = engine.history_experiences().iter().rev().take(stats.processed_count as usize).cloned().collect();
            (stats, batch)
        };
        if !batch.is_empty() {
            self.persist_processing_batch(&batch).await;
        }
        stats
    }

    pub async fn get_strategies(&self) -> Vec<Strategy> {
        self.engine.lock().await.strategies().values().cloned().collect()
    }

    pub async fn get_metrics(&self) -> LearningMetrics {
        let engine = self.engine.lock().await;
        let history = engine.confidence_history();
        let average_confidence = if history.is_empty() { 0.0 } else { history.iter().sum::<f64>() / history.len() as f64 };
        let total_experiences = engine.strategies().values().map(|s| s.total_experiences).sum();
        LearningMetrics {
            contexts_learned: engine.strategies().len(),
            total_experiences,
            buffer: engine.buffer_utilization(),
            average_confidence,
            confidence_samples: history.len(),
        }
    }

    pub async fn get_buffer(&self, kind: BufferKind) -> Vec<Experience> {
        let engine = self.engine.lock().await;
        match kind {
            BufferKind::Active => engine.active_experiences().iter().cloned().collect(),
            BufferKind::History => engine.history_experiences().iter().cloned().collect(),
        }
    }

    /// Snapshots Q-table and strategies under the lock and writes them
    /// out after release. Used by both the periodic auto-save tick and
    /// graceful shutdown (C8); safe to call twice in a row (P8).
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let (strategies, rows) = {
            let engine = self.engine.lock().await;
            (engine.strategies().clone(), engine.q_table().snapshot().clone())
        };
        self.repository.save_strategies(&strategies).await?;
        for (context, row) in &rows {
            self.repository.save_q_row(context, row).await?;
        }
        Ok(())
    }

    /// Runs `prune_history` under the lock then asks the repository to
    /// drop the now-stale rows (C8 memory_cleanup tick).
    pub async fn run_memory_cleanup(&self, retention_hours: i64) {
        let now = Utc::now();
        {
            let mut engine = self.engine.lock().await;
            engine.prune_history(now);
        }
        let before = now - chrono::Duration::hours(retention_hours);
        if let Err(err) = self.repository.cleanup_history(before).await {
            error!(error = %err, "history cleanup against persistence failed");
        }
    }

    async fn persist_processing_batch(&self, batch: &[Experience]) {
        if let Err(err) = self.repository.bulk_insert_history(batch).await {
            error!(error = %err, "failed to persist processed batch to history");
            return;
        }
        for exp in batch {
            if let Err(err) = self.repository.delete_experience(exp.id).await {
                error!(error = %err, "failed to remove promoted experience from active store");
            }
        }
    }

    async fn publish_if_bound(&self, event_type: &str, context: &str, action: Action, correlation_id: Option<String>) {
        let Some(events) = &self.events else { return };
        let event = Event {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            correlation_id,
            priority: EventPriority::Low,
            occurred_at: Utc::now(),
            payload: serde_json::json!({ "context": context, "action": action.as_str() }),
        };
        if let Err(err) = events.publish(event).await {
            warn!(error = %err, event_type, "failed to publish RL event");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::models::{CampaignType, Competition, RiskAppetite};
    use crate::ports::persistence::LoadedState;

    #[derive(Default)]
    struct InMemoryRepository {
        strategies: StdMutex<HashMap<String, Strategy>>,
        q_rows: StdMutex<HashMap<String, HashMap<Action, f64>>>,
        active: StdMutex<HashMap<Uuid, Experience>>,
        history: StdMutex<Vec<Experience>>,
    }

    #[async_trait]
    impl RlRepository for InMemoryRepository {
        async fn save_strategies(&self, all: &HashMap<String, Strategy>) -> Result<(), PersistenceError> {
            *self.strategies.lock().unwrap() = all.clone();
            Ok(())
        }

        async fn save_q_row(&self, context: &str, row: &HashMap<Action, f64>) -> Result<(), PersistenceError> {
            self.q_rows.lock().unwrap().insert(context.to_string(), row.clone());
            Ok(())
        }

        async fn insert_experience(&self, exp: &Experience) -> Result<(), PersistenceError> {
            self.active.lock().unwrap().insert(exp.id, exp.clone());
            Ok(())
        }

        async fn delete_experience(&self, id: Uuid) -> Result<(), PersistenceError> {
            self.active.lock().unwrap().remove(&id);
            Ok(())
        }

        async fn bulk_insert_history(&self, exps: &[Experience]) -> Result<(), PersistenceError> {
            self.history.lock().unwrap().extend_from_slice(exps);
            Ok(())
        }

        async fn cleanup_history(&self, before: DateTime<Utc>) -> Result<u64, PersistenceError> {
            let mut history = self.history.lock().unwrap();
            let before_len = history.len();
            history.retain(|e| e.created_at >= before);
            Ok((before_len - history.len()) as u64)
        }

        async fn load_all(&self) -> Result<LoadedState, PersistenceError> {
            Ok(LoadedState::default())
        }

        async fn ping(&self) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    fn sample_context() -> CampaignContext {
        CampaignContext::new(
            "MAXIMIZE_ROAS", CampaignType::Conversion, RiskAppetite::Moderate, Competition::Moderate,
            "a", "b", "c", "d", "e",
        )
        .unwrap()
    }

    fn sample_metrics() -> CampaignMetrics {
        CampaignMetrics::default()
    }

    fn service() -> RlService {
        RlService::new(EngineConfig::default(), Arc::new(InMemoryRepository::default()), None)
    }

    #[tokio::test]
    async fn learn_below_threshold_does_not_auto_process() {
        let svc = service();
        let result = svc.learn("ctx", Action::OptimizeBiddingStrategy, 0.3, ExperienceMetadata::default()).await.unwrap();
        assert!(!result.auto_processed);
        assert!(result.processing.is_none());
        assert_eq!(result.buffer.active_unprocessed, 1);
    }

    #[tokio::test]
    async fn learn_rejects_empty_context() {
        let svc = service();
        let err = svc.learn("   ", Action::OptimizeBiddingStrategy, 0.3, ExperienceMetadata::default()).await.unwrap_err();
        assert_eq!(err, ValidationError::InvalidContext);
    }

    #[tokio::test]
    async fn generate_action_returns_buffer_snapshot() {
        let svc = service();
        let result = svc.generate_action(GenerateActionRequest { context: sample_context(), metrics: sample_metrics() }).await;
        assert_eq!(result.normalized_context, "MAXIMIZE_ROAS_conversion_moderate_moderate");
        assert_eq!(result.buffer.active_size, 0);
    }

    #[tokio::test]
    async fn flush_is_idempotent() {
        let svc = service();
        svc.learn("ctx", Action::OptimizeBiddingStrategy, 0.3, ExperienceMetadata::default()).await.unwrap();
        svc.process().await;
        svc.flush().await.unwrap();
        svc.flush().await.unwrap();
    }

    #[tokio::test]
    async fn process_forces_a_pass_below_threshold() {
        let svc = service();
        svc.learn("ctx", Action::OptimizeBiddingStrategy, 0.3, ExperienceMetadata::default()).await.unwrap();
        let stats = svc.process().await;
        assert_eq!(stats.processed_count, 1);
        let metrics = svc.get_metrics().await;
        assert_eq!(metrics.contexts_learned, 1);
    }
}
