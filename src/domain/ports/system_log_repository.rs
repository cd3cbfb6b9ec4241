use async_trait::async_trait;
use chrono::Duration;

use crate::domain::errors::DatabaseError;

/// Read port over `system_logs`, consumed by the rule evaluator's
/// `error_rate`/`error_count` conditions.
#[async_trait]
pub trait SystemLogRepository: Send + Sync {
    async fn count_by_levels_in_window(
        &self,
        levels: &[String],
        window: Duration,
    ) -> Result<i64, DatabaseError>;
}
