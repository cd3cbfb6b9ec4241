use async_trait::async_trait;

use crate::domain::errors::ConnectorError;
use crate::domain::models::{ConnectionTestResult, NormalizedAlert};

/// Common lifecycle every connector implements. A connector is polymorphic
/// over the `poll`/`webhook` capability shapes below; it may implement
/// either or both in addition to this trait.
#[async_trait]
pub trait Connector: Send + Sync {
    fn connector_type(&self) -> &str;

    /// Acquires resources. Idempotent: calling `start` on an already-started
    /// connector returns immediately without re-acquiring anything.
    async fn start(&self) -> Result<(), ConnectorError>;

    /// Releases all resources and cancels in-flight operations. Fails open:
    /// best-effort cleanup, never panics on partial failure.
    async fn stop(&self);

    /// Verifies reachability/auth without emitting any alert.
    async fn test_connection(&self) -> ConnectionTestResult;
}

/// Capability a poll-mode connector implements.
#[async_trait]
pub trait PollingConnector: Connector {
    /// One poll cycle. Implementations must not mutate shared state beyond
    /// their own status counters (`last_poll_at`, `alerts_received`).
    async fn poll(&self) -> Result<Vec<NormalizedAlert>, ConnectorError>;

    fn poll_interval_seconds(&self) -> u64;
}

/// Capability a webhook-mode connector implements.
#[async_trait]
pub trait WebhookConnector: Connector {
    async fn handle_webhook(
        &self,
        payload: serde_json::Value,
    ) -> Result<Option<NormalizedAlert>, ConnectorError>;
}
