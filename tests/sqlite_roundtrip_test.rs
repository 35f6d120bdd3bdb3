//! End-to-end test of the persistence contract (spec.md §4.6): a second
//! `RlService` backed by the same SQLite file, after a restart, sees the
//! Q-table and strategies the first instance flushed.

use std::sync::Arc;

use rl_engine::adapters::sqlite::{create_migrated_test_pool, SqliteRlRepository};
use rl_engine::domain::models::Action;
use rl_engine::ports::persistence::RlRepository;
use rl_engine::services::engine::{EngineConfig, ExperienceMetadata};
use rl_engine::services::rl_service::RlService;

#[tokio::test]
async fn learned_state_survives_a_simulated_restart() {
    let pool = create_migrated_test_pool().await.expect("migrated pool");

    let repo: Arc<dyn RlRepository> = Arc::new(SqliteRlRepository::new(pool.clone()));
    let first = RlService::new(EngineConfig::default(), repo.clone(), None);

    for _ in 0..20 {
        first.learn("restart-ctx", Action::ExpandReachCampaigns, 0.9, ExperienceMetadata::default()).await.unwrap();
    }
    first.process().await;
    first.flush().await.unwrap();

    // A fresh engine over the same pool, as if the process had restarted.
    let repo2: Arc<dyn RlRepository> = Arc::new(SqliteRlRepository::new(pool));
    let second = RlService::new(EngineConfig::default(), repo2, None);
    second.load_from_repository().await;

    let strategies = second.get_strategies().await;
    let strategy = strategies.iter().find(|s| s.context == "restart-ctx").expect("strategy survived restart");
    assert_eq!(strategy.best_action, Action::ExpandReachCampaigns);
    assert_eq!(strategy.total_experiences, 20);
    assert!(strategy.best_q_value > 0.0);
}

#[tokio::test]
async fn active_buffer_survives_a_simulated_restart_when_below_threshold() {
    let pool = create_migrated_test_pool().await.expect("migrated pool");

    let repo: Arc<dyn RlRepository> = Arc::new(SqliteRlRepository::new(pool.clone()));
    let first = RlService::new(EngineConfig::default(), repo.clone(), None);

    // Below auto_process_threshold (15 by default): stays unprocessed in active.
    for _ in 0..5 {
        first.learn("unprocessed-ctx", Action::OptimizeForCtr, 0.2, ExperienceMetadata::default()).await.unwrap();
    }

    let repo2: Arc<dyn RlRepository> = Arc::new(SqliteRlRepository::new(pool));
    let second = RlService::new(EngineConfig::default(), repo2, None);
    second.load_from_repository().await;

    let active = second.get_buffer(rl_engine::services::rl_service::BufferKind::Active).await;
    assert_eq!(active.iter().filter(|e| e.context == "unprocessed-ctx").count(), 5);
    assert!(active.iter().all(|e| !e.processed));
}
