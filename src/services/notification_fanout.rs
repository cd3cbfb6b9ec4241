//! Notification fan-out: selects matching rules, cross-joins enabled
//! channels, de-duplicates by channel, invokes the per-channel-type
//! driver, and records the outcome.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::models::{DeliveryResult, RequestContext, StoredAlert};
use crate::domain::ports::{NotificationDriver, NotificationRepository};

pub struct NotificationFanout {
    repo: Arc<dyn NotificationRepository>,
    drivers: HashMap<String, Arc<dyn NotificationDriver>>,
}

impl NotificationFanout {
    pub fn new(repo: Arc<dyn NotificationRepository>, drivers: Vec<Arc<dyn NotificationDriver>>) -> Self {
        let drivers = drivers
            .into_iter()
            .map(|driver| (driver.channel_type().to_string(), driver))
            .collect();
        Self { repo, drivers }
    }

    /// Best-effort: failures are logged and recorded, never propagated. A
    /// notification failure never rolls back the alert write, and failed
    /// deliveries do not retry within the pipeline.
    pub async fn notify(&self, alert: &StoredAlert, ctx: &RequestContext) {
        let rules = match self
            .repo
            .find_matching_rules("alert", alert.severity, alert.category)
            .await
        {
            Ok(rules) => rules,
            Err(err) => {
                tracing::error!(request_id = %ctx.request_id, alert_id = alert.id, error = %err, "failed to load notification rules");
                return;
            }
        };

        let mut seen_channels = HashSet::new();
        let channel_ids: Vec<i64> = rules
            .into_iter()
            .flat_map(|rule| rule.channel_ids)
            .filter(|id| seen_channels.insert(*id))
            .collect();

        let title = format!("[{}] {}", alert.severity.as_str().to_uppercase(), alert.title);
        let body = format!(
            "{}\nDevice: {} ({})\nCategory: {}\nOccurred: {}",
            alert.message,
            alert.device_name.as_deref().unwrap_or("unknown"),
            alert.device_ip,
            alert.category.as_str(),
            alert.occurred_at,
        );

        for channel_id in channel_ids {
            self.deliver_to_channel(channel_id, alert.id, &title, &body, ctx).await;
        }
    }

    async fn deliver_to_channel(
        &self,
        channel_id: i64,
        alert_id: i64,
        title: &str,
        body: &str,
        ctx: &RequestContext,
    ) {
        let channel = match self.repo.get_channel(channel_id).await {
            Ok(Some(channel)) if channel.enabled => channel,
            Ok(_) => return,
            Err(err) => {
                tracing::error!(request_id = %ctx.request_id, channel_id, error = %err, "failed to load notification channel");
                return;
            }
        };

        let Some(driver) = self.drivers.get(&channel.channel_type) else {
            tracing::warn!(request_id = %ctx.request_id, channel_id, channel_type = %channel.channel_type, "no driver registered for channel type");
            return;
        };

        let result = driver.send(&channel.config, title, body).await;
        if result == DeliveryResult::Failed {
            tracing::warn!(request_id = %ctx.request_id, channel_id, alert_id, "notification delivery failed");
        }

        let error_message = if result == DeliveryResult::Failed {
            Some("delivery failed".to_string())
        } else {
            None
        };

        if let Err(err) = self
            .repo
            .record_delivery(alert_id, channel_id, result, error_message)
            .await
        {
            tracing::error!(request_id = %ctx.request_id, channel_id, alert_id, error = %err, "failed to record notification delivery");
        }
    }
}
