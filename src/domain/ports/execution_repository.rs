use async_trait::async_trait;
use chrono::Duration;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{Execution, ExecutionStatus, Progress};

/// Persistence port for `scheduler_job_executions`.
#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    async fn insert(&self, execution: &Execution) -> Result<Execution, DatabaseError>;

    async fn get(&self, id: i64) -> Result<Option<Execution>, DatabaseError>;

    async fn mark_started(&self, id: i64, worker: &str) -> Result<(), DatabaseError>;

    /// Optimistic read-mutate-write progress update: a lost race only
    /// loses an intermediate progress tick, never corrupts the row.
    async fn update_progress(&self, id: i64, progress: &Progress) -> Result<(), DatabaseError>;

    async fn mark_terminal(
        &self,
        id: i64,
        status: ExecutionStatus,
        result: Option<serde_json::Value>,
        error_message: Option<String>,
    ) -> Result<(), DatabaseError>;

    /// Non-terminal executions older than `stale_timeout`, for the janitor.
    async fn find_stale(&self, stale_timeout: Duration) -> Result<Vec<Execution>, DatabaseError>;

    async fn count_failed_in_window(
        &self,
        window: Duration,
    ) -> Result<i64, DatabaseError>;

    async fn count_running_longer_than(&self, max_duration: Duration) -> Result<i64, DatabaseError>;
}
