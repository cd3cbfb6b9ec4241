use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{Execution, ExecutionStatus, Progress};
use crate::domain::ports::ExecutionRepository;

#[derive(Clone)]
pub struct PgExecutionRepository {
    pool: PgPool,
}

impl PgExecutionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ExecutionRow {
    id: i64,
    job_name: String,
    task_name: String,
    task_id: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    result: Option<serde_json::Value>,
    error_message: Option<String>,
    worker: Option<String>,
    triggered_by: Option<String>,
    progress: serde_json::Value,
}

fn row_to_execution(row: ExecutionRow) -> Result<Execution, DatabaseError> {
    let progress: Progress = serde_json::from_value(row.progress)?;
    Ok(Execution {
        id: row.id,
        job_name: row.job_name,
        task_name: row.task_name,
        task_id: row.task_id,
        status: ExecutionStatus::from_str(&row.status).unwrap_or(ExecutionStatus::Queued),
        created_at: row.created_at,
        started_at: row.started_at,
        finished_at: row.finished_at,
        result: row.result,
        error_message: row.error_message,
        worker: row.worker,
        triggered_by: row.triggered_by,
        progress,
    })
}

#[async_trait]
impl ExecutionRepository for PgExecutionRepository {
    async fn insert(&self, execution: &Execution) -> Result<Execution, DatabaseError> {
        let progress = serde_json::to_value(&execution.progress)?;
        let row: ExecutionRow = sqlx::query_as(
            "INSERT INTO scheduler_job_executions
             (job_name, task_name, task_id, status, created_at, triggered_by, progress)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(&execution.job_name)
        .bind(&execution.task_name)
        .bind(&execution.task_id)
        .bind(execution.status.as_str())
        .bind(execution.created_at)
        .bind(&execution.triggered_by)
        .bind(progress)
        .fetch_one(&self.pool)
        .await?;

        row_to_execution(row)
    }

    async fn get(&self, id: i64) -> Result<Option<Execution>, DatabaseError> {
        let row: Option<ExecutionRow> =
            sqlx::query_as("SELECT * FROM scheduler_job_executions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(row_to_execution).transpose()
    }

    async fn mark_started(&self, id: i64, worker: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE scheduler_job_executions SET status = 'running', started_at = now(), worker = $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(worker)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_progress(&self, id: i64, progress: &Progress) -> Result<(), DatabaseError> {
        let value = serde_json::to_value(progress)?;
        sqlx::query("UPDATE scheduler_job_executions SET progress = $2 WHERE id = $1")
            .bind(id)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_terminal(
        &self,
        id: i64,
        status: ExecutionStatus,
        result: Option<serde_json::Value>,
        error_message: Option<String>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE scheduler_job_executions
             SET status = $2, finished_at = now(), result = $3, error_message = $4
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(result)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_stale(&self, stale_timeout: Duration) -> Result<Vec<Execution>, DatabaseError> {
        let cutoff = Utc::now() - stale_timeout;
        let rows: Vec<ExecutionRow> = sqlx::query_as(
            "SELECT * FROM scheduler_job_executions
             WHERE status IN ('queued', 'running') AND created_at < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_execution).collect()
    }

    async fn count_failed_in_window(&self, window: Duration) -> Result<i64, DatabaseError> {
        let since = Utc::now() - window;
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM scheduler_job_executions WHERE status = 'failed' AND created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    async fn count_running_longer_than(&self, max_duration: Duration) -> Result<i64, DatabaseError> {
        let cutoff = Utc::now() - max_duration;
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM scheduler_job_executions WHERE status = 'running' AND started_at < $1",
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }
}
