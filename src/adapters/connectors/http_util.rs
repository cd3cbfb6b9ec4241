//! Shared outbound-HTTP helpers for poll-mode connectors: a `reqwest`
//! client built per `ConnectorConfig` (TLS verification toggle, fixed 30s
//! timeout), and a one-level endpoint fallback for capability probing
//! (PRTG's `getstatus.json` → `table.json` pattern).

use std::time::Duration;

use reqwest::Client;

use crate::domain::errors::ConnectorError;
use crate::domain::models::ConnectorConfig;

const OUTBOUND_TIMEOUT_SECS: u64 = 30;

pub fn build_client(config: &ConnectorConfig) -> Result<Client, ConnectorError> {
    Client::builder()
        .danger_accept_invalid_certs(!config.verify_ssl)
        .timeout(Duration::from_secs(OUTBOUND_TIMEOUT_SECS))
        .build()
        .map_err(|err| ConnectorError::NotConfigured(format!("failed to build http client: {err}")))
}

/// GETs `primary`, falling back to `fallback` once if the primary request
/// fails outright (connection refused, timeout, non-success status).
/// Retries one level and no further.
pub async fn get_with_fallback(
    client: &Client,
    primary: &str,
    fallback: &str,
) -> Result<serde_json::Value, ConnectorError> {
    match get_json(client, primary).await {
        Ok(value) => Ok(value),
        Err(primary_err) => {
            tracing::debug!(url = primary, error = %primary_err, "primary endpoint failed, trying fallback");
            get_json(client, fallback).await.map_err(|fallback_err| {
                ConnectorError::Transient(format!(
                    "both endpoints failed: primary={primary_err}, fallback={fallback_err}"
                ))
            })
        }
    }
}

async fn get_json(client: &Client, url: &str) -> Result<serde_json::Value, ConnectorError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| ConnectorError::Transient(err.to_string()))?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED
        || response.status() == reqwest::StatusCode::FORBIDDEN
    {
        return Err(ConnectorError::AuthenticationFailed(format!(
            "http {}",
            response.status()
        )));
    }
    if !response.status().is_success() {
        return Err(ConnectorError::Transient(format!(
            "http {}",
            response.status()
        )));
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|err| ConnectorError::Transient(format!("invalid json response: {err}")))
}
