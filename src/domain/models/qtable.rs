//! The tabular Q-value store: one row per normalized context, one column
//! per action.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::models::action::Action;

/// `Q(context, action) -> value`. Rows are created lazily on first write;
/// a missing `(context, action)` pair reads as `0.0`, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QTable {
    rows: HashMap<String, HashMap<Action, f64>>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a table from persisted rows, e.g. at startup load.
    pub fn from_rows(rows: HashMap<String, HashMap<Action, f64>>) -> Self {
        Self { rows }
    }

    /// Current value of `Q(context, action)`, or `0.0` if the cell has
    /// never been written.
    pub fn get(&self, context: &str, action: Action) -> f64 {
        self.rows
            .get(context)
            .and_then(|row| row.get(&action))
            .copied()
            .unwrap_or(0.0)
    }

    /// `Q(c,a) <- Q(c,a) + learning_rate * (reward - Q(c,a))`. The single-step
    /// update used by this engine; there is no bootstrap term since every
    /// experience is treated as terminal.
    pub fn update(&mut self, context: &str, action: Action, reward: f64, learning_rate: f64) -> f64 {
        let row = self.rows.entry(context.to_string()).or_default();
        let current = row.get(&action).copied().unwrap_or(0.0);
        let updated = current + learning_rate * (reward - current);
        row.insert(action, updated);
        updated
    }

    /// The action with the highest `Q(context, *)`, ties broken by the
    /// fixed declaration order of [`Action::ALL`]. Returns `None` if the
    /// context has no row at all (cold start).
    pub fn best_action(&self, context: &str) -> Option<(Action, f64)> {
        let row = self.rows.get(context)?;
        let mut best: Option<(Action, f64)> = None;
        for action in Action::all() {
            let q = row.get(&action).copied().unwrap_or(0.0);
            match best {
                Some((_, best_q)) if q > best_q => best = Some((action, q)),
                Some(_) => {}
                None => best = Some((action, q)),
            }
        }
        best
    }

    /// Whether `context` has any learned cells at all.
    pub fn has_row(&self, context: &str) -> bool {
        self.rows.contains_key(context)
    }

    /// Full snapshot of all rows, for persistence.
    pub fn snapshot(&self) -> &HashMap<String, HashMap<Action, f64>> {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
