use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use thiserror::Error;

use super::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid learning_rate: {0}, must be in (0.0, 1.0]")]
    InvalidLearningRate(f64),

    #[error("invalid discount_factor: {0}, must be in [0.0, 1.0]")]
    InvalidDiscountFactor(f64),

    #[error("invalid exploration_rate: {0}, must be in [0.0, 1.0]")]
    InvalidExplorationRate(f64),

    #[error("max_active_buffer must be positive")]
    EmptyActiveBuffer,

    #[error("auto_process_threshold ({0}) must not exceed max_active_buffer ({1})")]
    ThresholdExceedsActiveBuffer(usize, usize),

    #[error("persistence_url must not be empty")]
    EmptyPersistenceUrl,

    #[error("invalid logging level: {0}")]
    InvalidLogLevel(String),

    #[error("invalid logging format: {0}, must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Loads [`Config`] with figment's hierarchical merge: programmatic
/// defaults, then an optional `rl-engine.toml`, then `RL_ENGINE_`-prefixed
/// environment variables (highest priority), mirroring the teacher's
/// `ConfigLoader` precedence.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("rl-engine.toml"))
            .merge(Env::prefixed("RL_ENGINE_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.learning_rate <= 0.0 || config.learning_rate > 1.0 {
            return Err(ConfigError::InvalidLearningRate(config.learning_rate));
        }
        if !(0.0..=1.0).contains(&config.discount_factor) {
            return Err(ConfigError::InvalidDiscountFactor(config.discount_factor));
        }
        if !(0.0..=1.0).contains(&config.exploration_rate) {
            return Err(ConfigError::InvalidExplorationRate(config.exploration_rate));
        }
        if config.max_active_buffer == 0 {
            return Err(ConfigError::EmptyActiveBuffer);
        }
        if config.auto_process_threshold > config.max_active_buffer {
            return Err(ConfigError::ThresholdExceedsActiveBuffer(config.auto_process_threshold, config.max_active_buffer));
        }
        if config.persistence_url.trim().is_empty() {
            return Err(ConfigError::EmptyPersistenceUrl);
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ConfigLoader::validate(&Config::default()).expect("default config should validate");
    }

    #[test]
    fn rejects_threshold_above_active_buffer() {
        let mut config = Config::default();
        config.auto_process_threshold = config.max_active_buffer + 1;
        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdExceedsActiveBuffer(_, _)));
    }

    #[test]
    fn rejects_learning_rate_out_of_range() {
        let mut config = Config::default();
        config.learning_rate = 1.5;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidLearningRate(_))));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidLogLevel(_))));
    }

    #[test]
    fn loads_toml_file_overrides() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "learning_rate = 0.2\nmax_active_buffer = 50\n[logging]\nlevel = \"debug\"").unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert!((config.learning_rate - 0.2).abs() < 1e-9);
        assert_eq!(config.max_active_buffer, 50);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.exploration_rate, Config::default().exploration_rate);
    }
}
