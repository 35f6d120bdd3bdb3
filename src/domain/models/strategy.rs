//! The per-context derived index summarizing a Q-table row.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::action::Action;

/// The current fixed algorithm identifier stamped onto every strategy,
/// so persisted rows can be migrated if the learning rule ever changes.
pub const ALGORITHM_VERSION: &str = "tabular-q-v1";

/// Per-action rollup inside a [`Strategy`]: how many times it was chosen,
/// and the running sums needed to report mean reward / mean Q on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDetail {
    pub count: u64,
    pub sum_reward: f64,
    pub sum_q: f64,
}

impl ActionDetail {
    fn record(&mut self, reward: f64, q: f64) {
        self.count += 1;
        self.sum_reward += reward;
        self.sum_q += q;
    }
}

/// Derived summary of a Q-table row (invariant I2: `best_action`/
/// `best_q_value` must always agree with `QTable[context][·]`'s argmax).
/// Strategies are never maintained as views; [`Strategy::restore_best`]
/// performs the full O(|actions|) recompute after every update, per the
/// derived-index design used throughout this engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub context: String,
    pub best_action: Action,
    pub best_q_value: f64,
    pub total_experiences: u64,
    pub action_details: HashMap<Action, ActionDetail>,
    pub q_values: HashMap<Action, f64>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub algorithm_version: String,
}

impl Strategy {
    /// Creates a strategy on first processed experience for a context.
    pub fn new(context: impl Into<String>, best_action: Action, best_q_value: f64, now: DateTime<Utc>) -> Self {
        Self {
            context: context.into(),
            best_action,
            best_q_value,
            total_experiences: 0,
            action_details: HashMap::new(),
            q_values: HashMap::new(),
            created_at: now,
            last_updated: now,
            algorithm_version: ALGORITHM_VERSION.to_string(),
        }
    }

    pub fn actions_count(&self) -> usize {
        self.action_details.len()
    }

    /// Folds one processed experience's outcome into the rollups.
    pub fn record_outcome(&mut self, action: Action, reward: f64, new_q: f64, now: DateTime<Utc>) {
        self.action_details.entry(action).or_default().record(reward, new_q);
        self.q_values.insert(action, new_q);
        self.total_experiences += 1;
        self.last_updated = now;
    }

    /// Restores I2 by recomputing `best_action`/`best_q_value` as the
    /// argmax over `q_values`, ties broken by enum declaration order.
    pub fn restore_best(&mut self) {
        let mut best: Option<(Action, f64)> = None;
        for action in Action::all() {
            let Some(&q) = self.q_values.get(&action) else { continue };
            match best {
                Some((_, best_q)) if q > best_q => best = Some((action, q)),
                Some(_) => {}
                None => best = Some((action, q)),
            }
        }
        if let Some((action, q)) = best {
            self.best_action = action;
            self.best_q_value = q;
        }
    }

    /// `min(0.95, 0.3 + 0.05 * log2(1 + n) + 0.1 * normalized(best_q))`.
    ///
    /// Pinned against the three anchor points from spec.md §4.3: zero
    /// experiences gives ≤0.3, ≥50 experiences with a positive Q gives
    /// ≥0.8, and the result is always within [0, 0.95].
    pub fn confidence(&self) -> f64 {
        let n = self.total_experiences as f64;
        let normalized_q = self.best_q_value.clamp(-1.0, 1.0);
        let raw = 0.3 + 0.05 * (1.0 + n).log2() + 0.1 * normalized_q;
        raw.clamp(0.0, 0.95)
    }
}
