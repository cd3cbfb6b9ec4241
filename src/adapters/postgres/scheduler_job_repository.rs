use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{ScheduleType, SchedulerJob};
use crate::domain::ports::SchedulerJobRepository;

#[derive(Clone)]
pub struct PgSchedulerJobRepository {
    pool: PgPool,
}

impl PgSchedulerJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SchedulerJobRow {
    name: String,
    task_name: String,
    config: serde_json::Value,
    schedule_type: String,
    interval_seconds: Option<i64>,
    cron_expression: Option<String>,
    enabled: bool,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
    max_runs: Option<i64>,
    run_count: i64,
    last_run_at: Option<DateTime<Utc>>,
    next_run_at: Option<DateTime<Utc>>,
    job_definition_id: Option<i64>,
}

fn row_to_job(row: SchedulerJobRow) -> SchedulerJob {
    SchedulerJob {
        name: row.name,
        task_name: row.task_name,
        config: row.config,
        schedule_type: ScheduleType::from_str(&row.schedule_type).unwrap_or(ScheduleType::Interval),
        interval_seconds: row.interval_seconds,
        cron_expression: row.cron_expression,
        enabled: row.enabled,
        start_at: row.start_at,
        end_at: row.end_at,
        max_runs: row.max_runs,
        run_count: row.run_count,
        last_run_at: row.last_run_at,
        next_run_at: row.next_run_at,
        job_definition_id: row.job_definition_id,
    }
}

#[async_trait]
impl SchedulerJobRepository for PgSchedulerJobRepository {
    async fn get(&self, name: &str) -> Result<Option<SchedulerJob>, DatabaseError> {
        let row: Option<SchedulerJobRow> =
            sqlx::query_as("SELECT * FROM scheduler_jobs WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(row_to_job))
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<SchedulerJob>, DatabaseError> {
        let rows: Vec<SchedulerJobRow> = sqlx::query_as(
            "SELECT * FROM scheduler_jobs
             WHERE enabled = true
               AND (next_run_at IS NULL OR next_run_at <= $1)
               AND (start_at IS NULL OR start_at <= $1)
               AND (end_at IS NULL OR end_at >= $1)
               AND (max_runs IS NULL OR run_count < max_runs)
             ORDER BY next_run_at NULLS FIRST",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_job).collect())
    }

    async fn record_dispatch(
        &self,
        name: &str,
        last_run_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE scheduler_jobs SET last_run_at = $2, run_count = run_count + 1, next_run_at = $3
             WHERE name = $1",
        )
        .bind(name)
        .bind(last_run_at)
        .bind(next_run_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SchedulerJob>, DatabaseError> {
        let rows: Vec<SchedulerJobRow> = sqlx::query_as("SELECT * FROM scheduler_jobs")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_job).collect())
    }
}
