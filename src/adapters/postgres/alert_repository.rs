//! Postgres adapter for [`AlertRepository`]: archives a resolved/expired
//! alert into `alert_history` and deletes it from `system_alerts` in one
//! transaction, using `sqlx` `RETURNING` instead of a separate
//! select-then-delete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{AlertStatus, StoredAlert};
use crate::domain::ports::AlertRepository;

use super::row_helpers::{alert_status_or_active, category_or_default, severity_or_default};

#[derive(Clone)]
pub struct PgAlertRepository {
    pool: PgPool,
}

impl PgAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: i64,
    fingerprint: String,
    source_system: String,
    source_alert_id: String,
    device_ip: String,
    device_name: Option<String>,
    severity: String,
    category: String,
    alert_type: String,
    title: String,
    message: String,
    occurred_at: DateTime<Utc>,
    raw_data: serde_json::Value,
    status: String,
    occurrence_count: i64,
    triggered_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    acknowledged_at: Option<DateTime<Utc>>,
    acknowledged_by: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    rule_id: Option<i64>,
}

fn row_to_alert(row: AlertRow) -> StoredAlert {
    StoredAlert {
        id: row.id,
        fingerprint: row.fingerprint,
        source_system: row.source_system,
        source_alert_id: row.source_alert_id,
        device_ip: row.device_ip,
        device_name: row.device_name,
        severity: severity_or_default(&row.severity),
        category: category_or_default(&row.category),
        alert_type: row.alert_type,
        title: row.title,
        message: row.message,
        occurred_at: row.occurred_at,
        raw_data: row.raw_data,
        status: alert_status_or_active(&row.status),
        occurrence_count: row.occurrence_count,
        triggered_at: row.triggered_at,
        last_seen_at: row.last_seen_at,
        acknowledged_at: row.acknowledged_at,
        acknowledged_by: row.acknowledged_by,
        resolved_at: row.resolved_at,
        expires_at: row.expires_at,
        rule_id: row.rule_id,
    }
}

#[async_trait]
impl AlertRepository for PgAlertRepository {
    async fn find_live_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<StoredAlert>, DatabaseError> {
        let row: Option<AlertRow> = sqlx::query_as(
            "SELECT * FROM system_alerts WHERE fingerprint = $1 AND status IN ('active', 'acknowledged')",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_alert))
    }

    async fn get(&self, id: i64) -> Result<Option<StoredAlert>, DatabaseError> {
        let row: Option<AlertRow> = sqlx::query_as("SELECT * FROM system_alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(row_to_alert))
    }

    async fn insert(&self, alert: &StoredAlert) -> Result<StoredAlert, DatabaseError> {
        let row: AlertRow = sqlx::query_as(
            "INSERT INTO system_alerts
             (fingerprint, source_system, source_alert_id, device_ip, device_name,
              severity, category, alert_type, title, message, occurred_at, raw_data,
              status, occurrence_count, triggered_at, last_seen_at, expires_at, rule_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
             RETURNING *",
        )
        .bind(&alert.fingerprint)
        .bind(&alert.source_system)
        .bind(&alert.source_alert_id)
        .bind(&alert.device_ip)
        .bind(&alert.device_name)
        .bind(alert.severity.as_str())
        .bind(alert.category.as_str())
        .bind(&alert.alert_type)
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(alert.occurred_at)
        .bind(&alert.raw_data)
        .bind(alert.status.as_str())
        .bind(alert.occurrence_count)
        .bind(alert.triggered_at)
        .bind(alert.last_seen_at)
        .bind(alert.expires_at)
        .bind(alert.rule_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_alert(row))
    }

    async fn bump_occurrence(&self, id: i64) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE system_alerts SET occurrence_count = occurrence_count + 1, last_seen_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn acknowledge(&self, id: i64, acknowledged_by: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE system_alerts SET status = 'acknowledged', acknowledged_at = now(), acknowledged_by = $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(acknowledged_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn archive(&self, id: i64, status: AlertStatus) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<AlertRow> = sqlx::query_as("SELECT * FROM system_alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Ok(());
        };

        let resolved_at = if status == AlertStatus::Resolved {
            Some(Utc::now())
        } else {
            row.resolved_at
        };

        sqlx::query(
            "INSERT INTO alert_history
             (id, fingerprint, source_system, source_alert_id, device_ip, device_name,
              severity, category, alert_type, title, message, occurred_at, raw_data,
              status, occurrence_count, triggered_at, last_seen_at, acknowledged_at,
              acknowledged_by, resolved_at, expires_at, rule_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)",
        )
        .bind(row.id)
        .bind(&row.fingerprint)
        .bind(&row.source_system)
        .bind(&row.source_alert_id)
        .bind(&row.device_ip)
        .bind(&row.device_name)
        .bind(&row.severity)
        .bind(&row.category)
        .bind(&row.alert_type)
        .bind(&row.title)
        .bind(&row.message)
        .bind(row.occurred_at)
        .bind(&row.raw_data)
        .bind(status.as_str())
        .bind(row.occurrence_count)
        .bind(row.triggered_at)
        .bind(row.last_seen_at)
        .bind(row.acknowledged_at)
        .bind(&row.acknowledged_by)
        .bind(resolved_at)
        .bind(row.expires_at)
        .bind(row.rule_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM system_alerts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_expired(&self) -> Result<Vec<StoredAlert>, DatabaseError> {
        let rows: Vec<AlertRow> = sqlx::query_as(
            "SELECT * FROM system_alerts
             WHERE status IN ('active', 'acknowledged') AND expires_at IS NOT NULL AND expires_at < now()",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_alert).collect())
    }

    async fn find_live_by_rule(&self, rule_id: i64) -> Result<Vec<StoredAlert>, DatabaseError> {
        let rows: Vec<AlertRow> = sqlx::query_as(
            "SELECT * FROM system_alerts WHERE rule_id = $1 AND status IN ('active', 'acknowledged')",
        )
        .bind(rule_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_alert).collect())
    }

    async fn last_triggered_at_for_rule(
        &self,
        rule_id: i64,
    ) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let row: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
            "SELECT MAX(triggered_at) FROM (
                SELECT triggered_at FROM system_alerts WHERE rule_id = $1
                UNION ALL
                SELECT triggered_at FROM alert_history WHERE rule_id = $1
             ) AS combined",
        )
        .bind(rule_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(t,)| t))
    }
}
