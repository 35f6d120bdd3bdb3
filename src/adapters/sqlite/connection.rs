//! SQLite connection pool setup: WAL mode, busy timeout, and the
//! directory bootstrap a fresh deployment needs before its first write.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to parse database url {url}: {source}")]
    InvalidUrl { url: String, #[source] source: sqlx::Error },

    #[error("failed to create database directory {path}: {source}")]
    DirectoryCreation { path: String, #[source] source: std::io::Error },

    #[error("failed to establish connection pool: {0}")]
    PoolCreation(#[source] sqlx::Error),

    #[error("connection verification failed: {0}")]
    VerificationFailed(#[source] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_connections: 5, min_connections: 1, acquire_timeout: Duration::from_secs(3) }
    }
}

/// Opens (and migrates-directory-for) `database_url`, returning a pool
/// configured for a single-writer workload: WAL journaling, `NORMAL`
/// synchronous, and a busy timeout so the writer-lock contention the
/// engine's single-mutex design already avoids in-process doesn't turn
/// into `SQLITE_BUSY` across processes either.
pub async fn create_pool(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, ConnectionError> {
    let config = config.unwrap_or_default();
    ensure_database_directory(database_url)?;

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|source| ConnectionError::InvalidUrl { url: database_url.to_string(), source })?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(30));

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(ConnectionError::PoolCreation)
}

/// An in-memory pool for tests: one shared-cache connection so every
/// handle sees the same database for the life of the pool.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|source| ConnectionError::InvalidUrl { url: "sqlite::memory:".to_string(), source })?
        .shared_cache(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(ConnectionError::PoolCreation)
}

fn ensure_database_directory(database_url: &str) -> Result<(), ConnectionError> {
    let path = database_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ConnectionError::DirectoryCreation { path: parent.display().to_string(), source })?;
        }
    }
    Ok(())
}

/// Runs `SELECT 1` to confirm the pool can actually serve a query.
/// Called once at startup (spec.md §7): a failure here aborts the
/// process rather than limping along on an unreachable store.
pub async fn verify_connection(pool: &SqlitePool) -> Result<(), ConnectionError> {
    sqlx::query("SELECT 1").execute(pool).await.map_err(ConnectionError::VerificationFailed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_verifies() {
        let pool = create_test_pool().await.expect("test pool");
        verify_connection(&pool).await.expect("verification");
    }

    #[tokio::test]
    async fn file_url_creates_parent_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("rl.db");
        let url = format!("sqlite://{}", db_path.display());

        let pool = create_pool(&url, None).await.expect("pool");
        verify_connection(&pool).await.expect("verification");
        assert!(db_path.parent().unwrap().exists());
    }
}
