//! The durable-store adapter (C7): SQLite-backed `RlRepository`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::error::PersistenceError;
use crate::domain::models::{Action, ActionDetail, Experience, Strategy};
use crate::ports::persistence::{LoadedState, RlRepository};

#[derive(Clone)]
pub struct SqliteRlRepository {
    pool: SqlitePool,
}

impl SqliteRlRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct StrategyRow {
    context: String,
    best_action: String,
    best_q_value: f64,
    total_experiences: i64,
    action_details_json: String,
    q_values_json: String,
    created_at: String,
    last_updated: String,
    algorithm_version: String,
}

impl TryFrom<StrategyRow> for Strategy {
    type Error = PersistenceError;

    fn try_from(row: StrategyRow) -> Result<Self, Self::Error> {
        let best_action: Action =
            row.best_action.parse().map_err(|_| PersistenceError::Serialization(format!("unknown action {}", row.best_action)))?;
        let action_details: HashMap<Action, ActionDetail> = serde_json::from_str(&row.action_details_json)?;
        let q_values: HashMap<Action, f64> = serde_json::from_str(&row.q_values_json)?;
        Ok(Strategy {
            context: row.context,
            best_action,
            best_q_value: row.best_q_value,
            total_experiences: row.total_experiences as u64,
            action_details,
            q_values,
            created_at: parse_datetime(&row.created_at)?,
            last_updated: parse_datetime(&row.last_updated)?,
            algorithm_version: row.algorithm_version,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExperienceRow {
    id: String,
    context: String,
    action: String,
    reward: f64,
    created_at: String,
    processed: i64,
    processed_at: Option<String>,
    metadata_json: String,
    correlation_id: Option<String>,
}

impl TryFrom<ExperienceRow> for Experience {
    type Error = PersistenceError;

    fn try_from(row: ExperienceRow) -> Result<Self, Self::Error> {
        let action: Action = row.action.parse().map_err(|_| PersistenceError::Serialization(format!("unknown action {}", row.action)))?;
        let metadata: HashMap<String, String> = serde_json::from_str(&row.metadata_json)?;
        Ok(Experience {
            id: Uuid::parse_str(&row.id).map_err(|e| PersistenceError::Serialization(e.to_string()))?,
            context: row.context,
            action,
            reward: row.reward,
            created_at: parse_datetime(&row.created_at)?,
            processed: row.processed != 0,
            processed_at: row.processed_at.as_deref().map(parse_datetime).transpose()?,
            metadata,
            correlation_id: row.correlation_id,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)).map_err(|e| PersistenceError::Serialization(e.to_string()))
}

#[async_trait]
impl RlRepository for SqliteRlRepository {
    async fn save_strategies(&self, all: &HashMap<String, Strategy>) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;

        sqlx::query("DELETE FROM strategies").execute(&mut *tx).await.map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;

        for strategy in all.values() {
            let action_details_json = serde_json::to_string(&strategy.action_details)?;
            let q_values_json = serde_json::to_string(&strategy.q_values)?;

            sqlx::query(
                "INSERT INTO strategies (context, best_action, best_q_value, total_experiences, action_details_json, q_values_json, created_at, last_updated, algorithm_version)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&strategy.context)
            .bind(strategy.best_action.as_str())
            .bind(strategy.best_q_value)
            .bind(strategy.total_experiences as i64)
            .bind(&action_details_json)
            .bind(&q_values_json)
            .bind(strategy.created_at.to_rfc3339())
            .bind(strategy.last_updated.to_rfc3339())
            .bind(&strategy.algorithm_version)
            .execute(&mut *tx)
            .await
            .map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;
        }

        tx.commit().await.map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn save_q_row(&self, context: &str, row: &HashMap<Action, f64>) -> Result<(), PersistenceError> {
        let values_json = serde_json::to_string(row)?;
        sqlx::query(
            "INSERT INTO q_table (context, values_json) VALUES (?, ?)
             ON CONFLICT(context) DO UPDATE SET values_json = excluded.values_json",
        )
        .bind(context)
        .bind(&values_json)
        .execute(&self.pool)
        .await
        .map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn insert_experience(&self, exp: &Experience) -> Result<(), PersistenceError> {
        let metadata_json = serde_json::to_string(&exp.metadata)?;
        sqlx::query(
            "INSERT INTO experiences_active (id, context, action, reward, created_at, processed, processed_at, metadata_json, correlation_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET processed = excluded.processed, processed_at = excluded.processed_at",
        )
        .bind(exp.id.to_string())
        .bind(&exp.context)
        .bind(exp.action.as_str())
        .bind(exp.reward)
        .bind(exp.created_at.to_rfc3339())
        .bind(exp.processed as i64)
        .bind(exp.processed_at.map(|t| t.to_rfc3339()))
        .bind(&metadata_json)
        .bind(&exp.correlation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn delete_experience(&self, id: Uuid) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM experiences_active WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn bulk_insert_history(&self, exps: &[Experience]) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;

        for exp in exps {
            let metadata_json = serde_json::to_string(&exp.metadata)?;
            sqlx::query(
                "INSERT INTO experiences_history (id, context, action, reward, created_at, processed, processed_at, metadata_json, correlation_id)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET processed_at = excluded.processed_at",
            )
            .bind(exp.id.to_string())
            .bind(&exp.context)
            .bind(exp.action.as_str())
            .bind(exp.reward)
            .bind(exp.created_at.to_rfc3339())
            .bind(exp.processed as i64)
            .bind(exp.processed_at.map(|t| t.to_rfc3339()))
            .bind(&metadata_json)
            .bind(&exp.correlation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;

            sqlx::query("DELETE FROM experiences_active WHERE id = ?")
                .bind(exp.id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;
        }

        tx.commit().await.map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn cleanup_history(&self, before: DateTime<Utc>) -> Result<u64, PersistenceError> {
        let result = sqlx::query("DELETE FROM experiences_history WHERE created_at < ?")
            .bind(before.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn load_all(&self) -> Result<LoadedState, PersistenceError> {
        let strategy_rows: Vec<StrategyRow> = sqlx::query_as(
            "SELECT context, best_action, best_q_value, total_experiences, action_details_json, q_values_json, created_at, last_updated, algorithm_version FROM strategies",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceError::ReadFailed(e.to_string()))?;

        let mut strategies = HashMap::with_capacity(strategy_rows.len());
        for row in strategy_rows {
            let context = row.context.clone();
            strategies.insert(context, Strategy::try_from(row)?);
        }

        let q_rows: Vec<(String, String)> = sqlx::query_as("SELECT context, values_json FROM q_table")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PersistenceError::ReadFailed(e.to_string()))?;
        let mut q_table = HashMap::with_capacity(q_rows.len());
        for (context, values_json) in q_rows {
            let row: HashMap<Action, f64> = serde_json::from_str(&values_json)?;
            q_table.insert(context, row);
        }

        let active_rows: Vec<ExperienceRow> = sqlx::query_as(
            "SELECT id, context, action, reward, created_at, processed, processed_at, metadata_json, correlation_id FROM experiences_active ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceError::ReadFailed(e.to_string()))?;
        let active_experiences =
            active_rows.into_iter().map(Experience::try_from).collect::<Result<Vec<_>, _>>()?;

        let history_rows: Vec<ExperienceRow> = sqlx::query_as(
            "SELECT id, context, action, reward, created_at, processed, processed_at, metadata_json, correlation_id FROM experiences_history ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceError::ReadFailed(e.to_string()))?;
        let history_experiences =
            history_rows.into_iter().map(Experience::try_from).collect::<Result<Vec<_>, _>>()?;

        Ok(LoadedState { strategies, q_rows: q_table, active_experiences, history_experiences })
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
