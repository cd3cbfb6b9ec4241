use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DatabaseError;
use crate::domain::models::SchedulerJob;

/// Persistence port for `scheduler_jobs`.
#[async_trait]
pub trait SchedulerJobRepository: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<SchedulerJob>, DatabaseError>;

    /// Rows matching the due-job predicate, ordered by
    /// `next_run_at NULLS FIRST`.
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<SchedulerJob>, DatabaseError>;

    /// Advances `last_run_at`/`run_count`/`next_run_at` after dispatch.
    async fn record_dispatch(
        &self,
        name: &str,
        last_run_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<(), DatabaseError>;

    async fn list(&self) -> Result<Vec<SchedulerJob>, DatabaseError>;
}
