//! The durable-store port (C7).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::error::PersistenceError;
use crate::domain::models::{Action, Experience, Strategy};

type Result<T> = std::result::Result<T, PersistenceError>;

/// Everything persisted at startup, loaded in one round trip.
#[derive(Debug, Clone, Default)]
pub struct LoadedState {
    pub strategies: HashMap<String, Strategy>,
    pub q_rows: HashMap<String, HashMap<Action, f64>>,
    pub active_experiences: Vec<Experience>,
    pub history_experiences: Vec<Experience>,
}

/// Durable store of Q-table rows, strategies, and both experience buffers.
///
/// Every write here is an upsert keyed by a natural key (context or
/// experience id), so repeated delivery of the same write is harmless.
/// `save_strategies` is the one exception: it is a full replace and must
/// only ever be called by the single writer holding the engine lock's
/// snapshot (spec.md §4.6).
#[async_trait]
pub trait RlRepository: Send + Sync {
    /// Full replace of the strategies collection.
    async fn save_strategies(&self, all: &HashMap<String, Strategy>) -> Result<()>;

    /// Upsert of a single Q-table row.
    async fn save_q_row(&self, context: &str, row: &HashMap<Action, f64>) -> Result<()>;

    /// Upsert of a single active-buffer experience.
    async fn insert_experience(&self, exp: &Experience) -> Result<()>;

    /// Removes an experience from the active collection (after promotion).
    async fn delete_experience(&self, id: Uuid) -> Result<()>;

    /// Upserts a batch of now-processed experiences into history.
    async fn bulk_insert_history(&self, exps: &[Experience]) -> Result<()>;

    /// Deletes history rows older than `before`.
    async fn cleanup_history(&self, before: DateTime<Utc>) -> Result<u64>;

    /// Loads the full persisted state at startup.
    async fn load_all(&self) -> Result<LoadedState>;

    /// Verifies connectivity; a failure here aborts startup (spec.md §7).
    async fn ping(&self) -> Result<()>;
}
