use async_trait::async_trait;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{
    Category, DeliveryResult, NotificationChannel, NotificationRule, Severity,
};

/// Persistence port for `notification_channels`/`notification_rules`/
/// `notification_history`.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn find_matching_rules(
        &self,
        trigger_type: &str,
        severity: Severity,
        category: Category,
    ) -> Result<Vec<NotificationRule>, DatabaseError>;

    async fn get_channel(&self, id: i64) -> Result<Option<NotificationChannel>, DatabaseError>;

    async fn record_delivery(
        &self,
        alert_id: i64,
        channel_id: i64,
        result: DeliveryResult,
        error_message: Option<String>,
    ) -> Result<(), DatabaseError>;
}
