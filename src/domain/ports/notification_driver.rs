use async_trait::async_trait;

use crate::domain::models::DeliveryResult;

/// Per-channel-type delivery mechanism. Drivers never retry internally;
/// failure is reported back and recorded, not retried.
#[async_trait]
pub trait NotificationDriver: Send + Sync {
    fn channel_type(&self) -> &str;

    async fn send(&self, config: &serde_json::Value, title: &str, body: &str) -> DeliveryResult;
}
