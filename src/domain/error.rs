//! Domain error types for the RL decision service.
//!
//! Each enum represents errors from a specific concern, following the
//! per-domain `thiserror` split used throughout this codebase. `RlError`
//! aggregates them for surfaces (the CLI) that want a single error type.

use thiserror::Error;

/// Input-invariant violations (spec §7 "Input invariants"). These are
/// surfaced directly to callers and are never logged at error level.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The strategic context was empty or whitespace-only.
    #[error("context must not be empty")]
    InvalidContext,

    /// The action string did not match any member of the closed `Action` enum.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// The reward fell outside [-1.0, 1.0].
    #[error("reward {0} out of range [-1.0, 1.0]")]
    InvalidReward(f64),

    /// A metric was negative, NaN, or infinite.
    #[error("invalid metric {field}: {value}")]
    InvalidMetric { field: &'static str, value: f64 },

    /// An enum-valued context field (campaign_type, risk_appetite, competition)
    /// did not match a recognized variant.
    #[error("unrecognized {field}: {value}")]
    UnrecognizedEnum { field: &'static str, value: String },
}

/// Errors from the persistence collaborator (C7). Per spec §7, write
/// failures are recovered locally (the in-memory mutation stands); load
/// failures on non-critical collections degrade to an empty state with a
/// warning. This enum exists so callers can tell which happened.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The connection pool could not be established or a ping failed.
    #[error("persistence unavailable: {0}")]
    Unavailable(String),

    /// A write (upsert/delete) failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// A read failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization/deserialization of a persisted row failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PersistenceError {
    /// Whether retrying the same operation later might succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::WriteFailed(_))
    }
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        Self::ReadFailed(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors from the event-consumption collaborator (C6).
#[derive(Error, Debug)]
pub enum EventError {
    /// A required field was missing from the event payload.
    #[error("event {event_type} missing required field: {field}")]
    MissingField {
        event_type: String,
        field: &'static str,
    },

    /// The event type is not one this consumer subscribes to.
    #[error("unrecognized event type: {0}")]
    UnrecognizedType(String),

    /// The event's embedded reward/metrics failed domain validation.
    #[error("event validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Fatal, non-recoverable invariant violations (spec §7 "Internal invariant
/// violation", invariants I1-I6 in §3). Constructing one of these means the
/// service must stop accepting writes, flush, and terminate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FatalError {
    /// History contains an unprocessed experience (violates I1).
    #[error("invariant I1 violated: unprocessed experience {0} found in history")]
    UnprocessedInHistory(uuid::Uuid),

    /// A strategy's best_action/best_q_value disagree with its Q-table row (I2).
    #[error("invariant I2 violated for context {context}: strategy says {claimed_action:?}/{claimed_q}, q-table argmax is {actual_action:?}/{actual_q}")]
    StrategyQTableMismatch {
        context: String,
        claimed_action: String,
        claimed_q: f64,
        actual_action: String,
        actual_q: f64,
    },

    /// A buffer exceeded its configured bound (I5).
    #[error("invariant I5 violated: {buffer} buffer size {size} exceeds bound {bound}")]
    BufferOverflow {
        buffer: &'static str,
        size: usize,
        bound: usize,
    },
}

/// Aggregate error type for outer surfaces (the CLI) that want one type.
#[derive(Error, Debug)]
pub enum RlError {
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// See [`PersistenceError`]. Only surfaced from explicit save operations;
    /// `learn`/`generate_action` never fail on persistence errors.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// See [`EventError`].
    #[error(transparent)]
    Event(#[from] EventError),

    /// See [`FatalError`]. Reaching this means the process is shutting down.
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_reward_display() {
        let err = ValidationError::InvalidReward(1.5);
        assert_eq!(err.to_string(), "reward 1.5 out of range [-1.0, 1.0]");
    }

    #[test]
    fn invalid_action_display() {
        let err = ValidationError::InvalidAction("frobnicate".to_string());
        assert_eq!(err.to_string(), "invalid action: frobnicate");
    }

    #[test]
    fn persistence_error_transience() {
        assert!(PersistenceError::Unavailable("timeout".into()).is_transient());
        assert!(PersistenceError::WriteFailed("locked".into()).is_transient());
        assert!(!PersistenceError::MigrationFailed("bad sql".into()).is_transient());
    }

    #[test]
    fn rl_error_wraps_validation() {
        let err: RlError = ValidationError::InvalidContext.into();
        assert_eq!(err.to_string(), "context must not be empty");
    }
}
