use async_trait::async_trait;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{ConnectorRecord, ConnectorStatus};

/// Persistence port for `connectors`, the registered-instance table behind
/// `adapters::connectors::registry::ConnectorRegistry`. Enabled state lives
/// in this table, not in the connector implementations themselves.
#[async_trait]
pub trait ConnectorRepository: Send + Sync {
    async fn list_enabled(&self) -> Result<Vec<ConnectorRecord>, DatabaseError>;

    async fn update_status(
        &self,
        id: i64,
        status: ConnectorStatus,
        last_error: Option<String>,
    ) -> Result<(), DatabaseError>;

    async fn record_poll(&self, id: i64, alerts_received_delta: i64) -> Result<(), DatabaseError>;
}
