//! SQLite implementation of the ExecutionRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_datetime, parse_optional_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ExecutionRecord, ExecutionStatus};
use crate::domain::ports::ExecutionRepository;

/// `ExecutionRepository` backed by the `agent_executions` table.
#[derive(Clone)]
pub struct SqliteExecutionRepository {
    pool: SqlitePool,
}

impl SqliteExecutionRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionRepository for SqliteExecutionRepository {
    async fn insert(&self, record: &ExecutionRecord) -> DomainResult<()> {
        let result_json = record.result.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"INSERT INTO agent_executions (id, evaluation_id, agent_name, status, started_at,
               completed_at, result, error, execution_time_ms, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(&record.evaluation_id)
        .bind(&record.agent_name)
        .bind(record.status.as_str())
        .bind(record.started_at.map(|t| t.to_rfc3339()))
        .bind(record.completed_at.map(|t| t.to_rfc3339()))
        .bind(result_json)
        .bind(&record.error)
        .bind(record.execution_time_ms.map(millis_to_i64))
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<ExecutionRecord>> {
        let row: Option<ExecutionRow> = sqlx::query_as("SELECT * FROM agent_executions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ExecutionRecord::try_from).transpose()
    }

    async fn update(&self, record: &ExecutionRecord) -> DomainResult<()> {
        let result_json = record.result.as_ref().map(serde_json::to_string).transpose()?;

        let result = sqlx::query(
            r#"UPDATE agent_executions SET status = ?, started_at = ?, completed_at = ?,
               result = ?, error = ?, execution_time_ms = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(record.status.as_str())
        .bind(record.started_at.map(|t| t.to_rfc3339()))
        .bind(record.completed_at.map(|t| t.to_rfc3339()))
        .bind(result_json)
        .bind(&record.error)
        .bind(record.execution_time_ms.map(millis_to_i64))
        .bind(record.updated_at.to_rfc3339())
        .bind(record.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ExecutionNotFound(record.id));
        }

        Ok(())
    }

    async fn list_by_evaluation(&self, evaluation_id: &str) -> DomainResult<Vec<ExecutionRecord>> {
        let rows: Vec<ExecutionRow> = sqlx::query_as(
            "SELECT * FROM agent_executions WHERE evaluation_id = ? ORDER BY rowid",
        )
        .bind(evaluation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ExecutionRecord::try_from).collect()
    }
}

fn millis_to_i64(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

#[derive(sqlx::FromRow)]
struct ExecutionRow {
    id: String,
    evaluation_id: String,
    agent_name: String,
    status: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    result: Option<String>,
    error: Option<String>,
    execution_time_ms: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ExecutionRow> for ExecutionRecord {
    type Error = DomainError;

    fn try_from(row: ExecutionRow) -> Result<Self, Self::Error> {
        let status = ExecutionStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid status: {}", row.status)))?;

        let result = row.result.map(|s| serde_json::from_str(&s)).transpose()?;

        Ok(Self {
            id: parse_uuid(&row.id)?,
            evaluation_id: row.evaluation_id,
            agent_name: row.agent_name,
            status,
            started_at: parse_optional_datetime(row.started_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
            result,
            error: row.error,
            execution_time_ms: row.execution_time_ms.map(|ms| u64::try_from(ms).unwrap_or(0)),
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
