use async_trait::async_trait;

use crate::domain::errors::DatabaseError;
use crate::domain::models::AlertRule;

/// Persistence port for `alert_rules`.
#[async_trait]
pub trait AlertRuleRepository: Send + Sync {
    async fn list_enabled(&self) -> Result<Vec<AlertRule>, DatabaseError>;

    async fn get(&self, id: i64) -> Result<Option<AlertRule>, DatabaseError>;
}
