//! Generic HTTP-POST webhook driver: one shared `reqwest::Client`,
//! channel-specific target read out of the channel's own `config` JSON
//! rather than a typed struct, per-call errors swallowed into
//! [`DeliveryResult::Failed`] — a failed delivery never retries in-pipeline.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::domain::models::DeliveryResult;
use crate::domain::ports::NotificationDriver;

const SEND_TIMEOUT_SECS: u64 = 10;

pub struct WebhookDriver {
    http: Client,
}

impl WebhookDriver {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .expect("reqwest client builds with static config");
        Self { http }
    }
}

impl Default for WebhookDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationDriver for WebhookDriver {
    fn channel_type(&self) -> &str {
        "webhook"
    }

    async fn send(&self, config: &serde_json::Value, title: &str, body: &str) -> DeliveryResult {
        let Some(url) = config.get("url").and_then(serde_json::Value::as_str) else {
            tracing::warn!("webhook channel config missing url");
            return DeliveryResult::Failed;
        };

        let payload = serde_json::json!({ "title": title, "body": body });
        match self.http.post(url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => DeliveryResult::Sent,
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "webhook delivery rejected");
                DeliveryResult::Failed
            }
            Err(err) => {
                tracing::warn!(error = %err, "webhook delivery failed");
                DeliveryResult::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_url_fails_without_sending() {
        let driver = WebhookDriver::new();
        let result = driver.send(&serde_json::json!({}), "t", "b").await;
        assert_eq!(result, DeliveryResult::Failed);
    }
}
