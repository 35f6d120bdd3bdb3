//! The bounded active/history experience pipeline (C3).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::experience::Experience;

/// Point-in-time occupancy report, used by `RlService::get_buffer` and the
/// `status` CLI subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferUtilization {
    pub active_size: usize,
    pub active_capacity: usize,
    pub active_unprocessed: usize,
    pub history_size: usize,
    pub history_capacity: usize,
    pub overflow_count: u64,
}

/// Bounded active FIFO plus bounded, age-pruned history FIFO.
///
/// Eviction is drop-oldest on both sides; this is lossy by design under
/// sustained overload (spec.md §7) and the data loss is recorded, not
/// prevented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualBuffer {
    active: VecDeque<Experience>,
    history: VecDeque<Experience>,
    max_active_size: usize,
    max_history_size: usize,
    auto_process_threshold: usize,
    retention_hours: i64,
    overflow_count: u64,
}

impl DualBuffer {
    pub fn new(max_active_size: usize, max_history_size: usize, auto_process_threshold: usize, retention_hours: i64) -> Self {
        Self {
            active: VecDeque::new(),
            history: VecDeque::new(),
            max_active_size,
            max_history_size,
            auto_process_threshold,
            retention_hours,
            overflow_count: 0,
        }
    }

    /// Rebuilds a buffer from persisted rows at startup load.
    pub fn from_parts(
        active: VecDeque<Experience>,
        history: VecDeque<Experience>,
        max_active_size: usize,
        max_history_size: usize,
        auto_process_threshold: usize,
        retention_hours: i64,
    ) -> Self {
        Self { active, history, max_active_size, max_history_size, auto_process_threshold, retention_hours, overflow_count: 0 }
    }

    /// Appends to the active buffer; drops the oldest entry (processed or
    /// not) if the bound is exceeded (I5).
    pub fn append(&mut self, exp: Experience) {
        self.active.push_back(exp);
        if self.active.len() > self.max_active_size {
            self.active.pop_front();
            self.overflow_count += 1;
        }
    }

    /// Active entries with `processed == false`, in append order.
    pub fn unprocessed(&self) -> Vec<&Experience> {
        self.active.iter().filter(|e| !e.processed).collect()
    }

    pub fn should_auto_process(&self) -> bool {
        self.unprocessed().len() >= self.auto_process_threshold
    }

    /// Moves the given (already-processed) experiences from active into
    /// history, in the order supplied, enforcing the history bound.
    pub fn promote(&mut self, ids: &[Uuid]) {
        for id in ids {
            if let Some(pos) = self.active.iter().position(|e| &e.id == id) {
                let exp = self.active.remove(pos).expect("position was just found");
                self.history.push_back(exp);
                if self.history.len() > self.max_history_size {
                    self.history.pop_front();
                }
            }
        }
    }

    /// Removes history entries older than `retention_hours`.
    pub fn prune_history(&mut self, now: DateTime<Utc>) {
        self.history.retain(|e| e.age_minutes(now) <= (self.retention_hours as f64) * 60.0);
    }

    pub fn utilization(&self) -> BufferUtilization {
        BufferUtilization {
            active_size: self.active.len(),
            active_capacity: self.max_active_size,
            active_unprocessed: self.unprocessed().len(),
            history_size: self.history.len(),
            history_capacity: self.max_history_size,
            overflow_count: self.overflow_count,
        }
    }

    pub fn active(&self) -> &VecDeque<Experience> {
        &self.active
    }

    pub fn history(&self) -> &VecDeque<Experience> {
        &self.history
    }

    pub fn active_mut(&mut self) -> &mut VecDeque<Experience> {
        &mut self.active
    }
}
