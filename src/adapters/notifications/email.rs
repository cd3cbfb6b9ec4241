//! Email driver: dispatched as a plain `reqwest` HTTP call against a
//! transactional-email API (`config.endpoint`/`config.api_key`/
//! `config.from`/`config.to`) rather than pulling in an SMTP crate the rest
//! of the stack has no other use for.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::domain::models::DeliveryResult;
use crate::domain::ports::NotificationDriver;

const SEND_TIMEOUT_SECS: u64 = 10;

pub struct EmailDriver {
    http: Client,
}

impl EmailDriver {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .expect("reqwest client builds with static config");
        Self { http }
    }
}

impl Default for EmailDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationDriver for EmailDriver {
    fn channel_type(&self) -> &str {
        "email"
    }

    async fn send(&self, config: &serde_json::Value, title: &str, body: &str) -> DeliveryResult {
        let endpoint = config.get("endpoint").and_then(serde_json::Value::as_str);
        let to = config.get("to").and_then(serde_json::Value::as_str);
        let (Some(endpoint), Some(to)) = (endpoint, to) else {
            tracing::warn!("email channel config missing endpoint or to");
            return DeliveryResult::Failed;
        };
        let from = config
            .get("from")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("opsconductor@localhost");

        let mut request = self.http.post(endpoint).json(&serde_json::json!({
            "from": from,
            "to": to,
            "subject": title,
            "text": body,
        }));
        if let Some(api_key) = config.get("api_key").and_then(serde_json::Value::as_str) {
            request = request.bearer_auth(api_key);
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => DeliveryResult::Sent,
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "email delivery rejected");
                DeliveryResult::Failed
            }
            Err(err) => {
                tracing::warn!(error = %err, "email delivery failed");
                DeliveryResult::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_fields_fail_without_sending() {
        let driver = EmailDriver::new();
        let result = driver.send(&serde_json::json!({"to": "a@b.com"}), "t", "b").await;
        assert_eq!(result, DeliveryResult::Failed);
    }
}
