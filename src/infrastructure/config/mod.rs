//! Configuration management: a single explicit options record loaded
//! once at startup from a TOML file plus environment overrides.

mod loader;

pub use loader::{ConfigError, ConfigLoader};

use serde::{Deserialize, Serialize};

fn default_service_name() -> String {
    "rl-engine".to_string()
}

fn default_event_consumer_group() -> String {
    "rl-engine".to_string()
}

fn default_persistence_url() -> String {
    "sqlite://rl_engine.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Everything the service needs to start, read once by
/// [`ConfigLoader::load`] and passed down to `QLearningEngine`,
/// `RlService`, and `Lifecycle` as plain values — never re-read from
/// ambient global state after startup (spec.md §9 Design Notes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service_name: String,

    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,

    pub max_active_buffer: usize,
    pub max_history_buffer: usize,
    pub auto_process_threshold: usize,
    pub history_retention_hours: i64,

    pub auto_save_interval_seconds: u64,
    pub memory_cleanup_interval_seconds: u64,

    pub event_bus_enabled: bool,
    pub event_consumer_group: String,

    pub persistence_url: String,

    /// Observability-only: never gates core learning behavior (SPEC_FULL §3).
    pub confidence_threshold: f64,
    /// Observability-only: never gates core learning behavior (SPEC_FULL §3).
    pub min_experiences_for_learning: u64,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            learning_rate: 0.1,
            discount_factor: 0.95,
            exploration_rate: 0.15,
            max_active_buffer: 25,
            max_history_buffer: 1000,
            auto_process_threshold: 15,
            history_retention_hours: 72,
            auto_save_interval_seconds: 180,
            memory_cleanup_interval_seconds: 1800,
            event_bus_enabled: true,
            event_consumer_group: default_event_consumer_group(),
            persistence_url: default_persistence_url(),
            confidence_threshold: 0.7,
            min_experiences_for_learning: 10,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Builds the engine-layer config slice from this record.
    pub fn engine_config(&self) -> crate::services::EngineConfig {
        crate::services::EngineConfig {
            learning_rate: self.learning_rate,
            discount_factor: self.discount_factor,
            exploration_rate: self.exploration_rate,
            max_active_buffer: self.max_active_buffer,
            max_history_buffer: self.max_history_buffer,
            auto_process_threshold: self.auto_process_threshold,
            history_retention_hours: self.history_retention_hours,
        }
    }

    /// Builds the lifecycle-layer config slice from this record.
    pub fn lifecycle_config(&self) -> crate::services::LifecycleConfig {
        crate::services::LifecycleConfig {
            auto_save_interval_seconds: self.auto_save_interval_seconds,
            memory_cleanup_interval_seconds: self.memory_cleanup_interval_seconds,
            history_retention_hours: self.history_retention_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_documented_values() {
        let config = Config::default();
        assert!((config.learning_rate - 0.1).abs() < 1e-9);
        assert!((config.discount_factor - 0.95).abs() < 1e-9);
        assert!((config.exploration_rate - 0.15).abs() < 1e-9);
        assert_eq!(config.max_active_buffer, 25);
        assert_eq!(config.max_history_buffer, 1000);
        assert_eq!(config.auto_process_threshold, 15);
        assert_eq!(config.history_retention_hours, 72);
        assert_eq!(config.auto_save_interval_seconds, 180);
        assert_eq!(config.memory_cleanup_interval_seconds, 1800);
        assert!(config.event_bus_enabled);
    }
}
