//! Slack incoming-webhook driver: same HTTP-POST shape as
//! [`super::webhook::WebhookDriver`], with Slack's `{"text": ...}` envelope
//! in place of the generic `{title, body}` one.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::domain::models::DeliveryResult;
use crate::domain::ports::NotificationDriver;

const SEND_TIMEOUT_SECS: u64 = 10;

pub struct SlackDriver {
    http: Client,
}

impl SlackDriver {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .expect("reqwest client builds with static config");
        Self { http }
    }
}

impl Default for SlackDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationDriver for SlackDriver {
    fn channel_type(&self) -> &str {
        "slack"
    }

    async fn send(&self, config: &serde_json::Value, title: &str, body: &str) -> DeliveryResult {
        let Some(webhook_url) = config.get("webhook_url").and_then(serde_json::Value::as_str) else {
            tracing::warn!("slack channel config missing webhook_url");
            return DeliveryResult::Failed;
        };

        let text = format!("*{title}*\n{body}");
        let payload = serde_json::json!({ "text": text });
        match self.http.post(webhook_url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => DeliveryResult::Sent,
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "slack delivery rejected");
                DeliveryResult::Failed
            }
            Err(err) => {
                tracing::warn!(error = %err, "slack delivery failed");
                DeliveryResult::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_webhook_url_fails_without_sending() {
        let driver = SlackDriver::new();
        let result = driver.send(&serde_json::json!({}), "t", "b").await;
        assert_eq!(result, DeliveryResult::Failed);
    }
}
