//! Postgres adapter for [`ConnectorRepository`], backing
//! `adapters::connectors::registry::ConnectorRegistry`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{ConnectorRecord, ConnectorStatus};
use crate::domain::ports::ConnectorRepository;

use super::row_helpers::connector_status_or_disconnected;

#[derive(Clone)]
pub struct PgConnectorRepository {
    pool: PgPool,
}

impl PgConnectorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ConnectorRow {
    id: i64,
    connector_type: String,
    config: serde_json::Value,
    enabled: bool,
    status: String,
    last_poll_at: Option<DateTime<Utc>>,
    alerts_received: i64,
    last_error: Option<String>,
}

fn row_to_connector(row: ConnectorRow) -> ConnectorRecord {
    ConnectorRecord {
        id: row.id,
        connector_type: row.connector_type,
        config: row.config,
        enabled: row.enabled,
        status: connector_status_or_disconnected(&row.status),
        last_poll_at: row.last_poll_at,
        alerts_received: row.alerts_received,
        last_error: row.last_error,
    }
}

#[async_trait]
impl ConnectorRepository for PgConnectorRepository {
    async fn list_enabled(&self) -> Result<Vec<ConnectorRecord>, DatabaseError> {
        let rows: Vec<ConnectorRow> =
            sqlx::query_as("SELECT * FROM connectors WHERE enabled = true")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(row_to_connector).collect())
    }

    async fn update_status(
        &self,
        id: i64,
        status: ConnectorStatus,
        last_error: Option<String>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE connectors SET status = $2, last_error = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(last_error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_poll(&self, id: i64, alerts_received_delta: i64) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE connectors SET last_poll_at = now(), alerts_received = alerts_received + $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(alerts_received_delta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
