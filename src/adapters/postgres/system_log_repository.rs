use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;

use crate::domain::errors::DatabaseError;
use crate::domain::ports::SystemLogRepository;

#[derive(Clone)]
pub struct PgSystemLogRepository {
    pool: PgPool,
}

impl PgSystemLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SystemLogRepository for PgSystemLogRepository {
    async fn count_by_levels_in_window(
        &self,
        levels: &[String],
        window: Duration,
    ) -> Result<i64, DatabaseError> {
        let since = Utc::now() - window;
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM system_logs WHERE level = ANY($1) AND created_at >= $2",
        )
        .bind(levels)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }
}
