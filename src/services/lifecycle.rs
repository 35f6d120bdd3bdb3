//! Initialization order, periodic maintenance, and graceful shutdown
//! flush (C8).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::interval;
use tracing::{error, info};

use crate::services::rl_service::RlService;

/// Periodic-task intervals, read once at startup.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleConfig {
    pub auto_save_interval_seconds: u64,
    pub memory_cleanup_interval_seconds: u64,
    pub history_retention_hours: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self { auto_save_interval_seconds: 180, memory_cleanup_interval_seconds: 1800, history_retention_hours: 72 }
    }
}

/// Drives the service's background ticks and coordinates shutdown. A
/// plain `Notify` (rather than a cancellation-token crate) is enough:
/// every background loop observes it via `tokio::select!`.
pub struct Lifecycle {
    service: RlService,
    config: LifecycleConfig,
    shutdown: Arc<Notify>,
}

impl Lifecycle {
    pub fn new(service: RlService, config: LifecycleConfig) -> Self {
        Self { service, config, shutdown: Arc::new(Notify::new()) }
    }

    /// Runs the auto-save and memory-cleanup periodic tasks until
    /// `shutdown()` is called, then performs one final flush.
    pub async fn run(&self) {
        info!("RL lifecycle starting background tasks");
        self.service.load_from_repository().await;

        let mut auto_save = interval(Duration::from_secs(self.config.auto_save_interval_seconds));
        let mut memory_cleanup = interval(Duration::from_secs(self.config.memory_cleanup_interval_seconds));

        loop {
            tokio::select! {
                _ = auto_save.tick() => {
                    if let Err(err) = self.service.flush().await {
                        error!(error = %err, "auto-save flush failed, will retry next tick");
                    }
                }
                _ = memory_cleanup.tick() => {
                    self.service.run_memory_cleanup(self.config.history_retention_hours).await;
                }
                () = self.shutdown.notified() => {
                    break;
                }
            }
        }

        info!("RL lifecycle shutting down, performing final flush");
        if let Err(err) = self.service.flush().await {
            error!(error = %err, "final shutdown flush failed");
        }
    }

    /// Unblocks `run()`'s select loop so it performs its final flush and
    /// returns. Idempotent: notifying twice is harmless.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc as StdArc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::domain::error::PersistenceError;
    use crate::domain::models::{Action, Experience, Strategy};
    use crate::ports::persistence::{LoadedState, RlRepository};
    use crate::services::engine::EngineConfig;
    use uuid::Uuid;

    #[derive(Default)]
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
        async fn cleanup_history(&self, _before: DateTime<Utc>) -> Result<u64, PersistenceError> {
            Ok(0)
        }
        async fn load_all(&self) -> Result<LoadedState, PersistenceError> {
            Ok(LoadedState::default())
        }
        async fn ping(&self) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn shutdown_unblocks_the_run_loop() {
        let service = RlService::new(EngineConfig::default(), StdArc::new(NoopRepository), None);
        let lifecycle = Lifecycle::new(
            service,
            LifecycleConfig { auto_save_interval_seconds: 3600, memory_cleanup_interval_seconds: 3600, history_retention_hours: 72 },
        );
        let shutdown = lifecycle.shutdown_handle();

        let handle = tokio::spawn(async move { lifecycle.run().await });
        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(5), handle).await.expect("lifecycle run should exit promptly after shutdown").unwrap();
    }
}
