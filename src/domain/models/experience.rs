//! A single observed (context, action, reward) transition awaiting learning.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::ValidationError;
use crate::domain::models::action::Action;

/// An experience is a message, not an aggregate: it is appended once,
/// read by a processing pass, marked processed exactly once, and
/// eventually pruned out of history. Nothing ever mutates
/// context/action/reward/metadata after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub id: Uuid,
    /// The normalized context key (`CampaignContext::normalize()`), not
    /// the raw situation — this is the Q-table row this sample updates.
    pub context: String,
    pub action: Action,
    pub reward: f64,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
    pub correlation_id: Option<String>,
}

impl Experience {
    pub fn new(
        context: impl Into<String>,
        action: Action,
        reward: f64,
        created_at: DateTime<Utc>,
        metadata: HashMap<String, String>,
        correlation_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let context = context.into();
        if context.trim().is_empty() {
            return Err(ValidationError::InvalidContext);
        }
        if !reward.is_finite() || !(-1.0..=1.0).contains(&reward) {
            return Err(ValidationError::InvalidReward(reward));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            context,
            action,
            reward,
            created_at,
            processed: false,
            processed_at: None,
            metadata,
            correlation_id,
        })
    }

    /// Marks this experience as consumed by a learning pass. Idempotent:
    /// calling it again leaves `processed_at` at its first value.
    pub fn mark_processed(&mut self, now: DateTime<Utc>) {
        if !self.processed {
            self.processed = true;
            self.processed_at = Some(now);
        }
    }

    /// Minutes elapsed between `created_at` and `now`, used by history
    /// pruning (`retention_hours`) and buffer-status reporting.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds() as f64 / 60_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Experience {
        Experience::new("MAXIMIZE_ROAS_conversion_moderate_moderate", Action::OptimizeBiddingStrategy, 0.4, Utc::now(), HashMap::new(), None).unwrap()
    }

    #[test]
    fn new_experience_is_unprocessed() {
        let exp = sample();
        assert!(!exp.processed);
        assert!(exp.processed_at.is_none());
    }

    #[test]
    fn mark_processed_sets_processed_at_once() {
        let mut exp = sample();
        let first = Utc::now();
        exp.mark_processed(first);
        let again = first + chrono::Duration::seconds(5);
        exp.mark_processed(again);
        assert!(exp.processed);
        assert_eq!(exp.processed_at, Some(first));
    }

    #[test]
    fn rejects_reward_outside_range() {
        let err = Experience::new("ctx", Action::OptimizeBiddingStrategy, 1.2, Utc::now(), HashMap::new(), None).unwrap_err();
        assert_eq!(err, ValidationError::InvalidReward(1.2));
    }

    #[test]
    fn rejects_empty_context() {
        let err = Experience::new("   ", Action::OptimizeBiddingStrategy, 0.4, Utc::now(), HashMap::new(), None).unwrap_err();
        assert_eq!(err, ValidationError::InvalidContext);
    }

    #[test]
    fn age_minutes_reflects_elapsed_time() {
        let created = Utc::now() - chrono::Duration::minutes(90);
        let exp = Experience::new("ctx", Action::OptimizeBiddingStrategy, 0.4, created, HashMap::new(), None).unwrap();
        let age = exp.age_minutes(Utc::now());
        assert!((89.0..=91.0).contains(&age), "age was {age}");
    }
}
