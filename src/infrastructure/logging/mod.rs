//! Structured logging bootstrap: an env-filter plus a JSON or compact
//! formatter selectable by config, following the teacher's
//! `infrastructure::logging` layering without its file-rotation/audit/
//! secret-scrubbing layers, which this service has no use for.

use anyhow::{bail, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::LoggingConfig;

/// Holds the non-blocking writer's guard alive for the process lifetime;
/// dropping it would silently stop flushing buffered log lines.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Initializes the global `tracing` subscriber from `config`. Must be
/// called exactly once, before anything else logs.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = parse_level(&config.level)?;
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(writer).with_target(true);

    match config.format.as_str() {
        "json" => subscriber.json().init(),
        "pretty" => subscriber.pretty().init(),
        other => bail!("unknown log format: {other}"),
    }

    Ok(LoggingGuard { _guard: guard })
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => bail!("invalid log level: {other}"),
    }
}
