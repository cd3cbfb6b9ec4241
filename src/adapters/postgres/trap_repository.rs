use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{TrapEvent, TrapLogEntry, TrapReceiverStatus};
use crate::domain::ports::TrapRepository;

use super::row_helpers::severity_or_default;

#[derive(Clone)]
pub struct PgTrapRepository {
    pool: PgPool,
}

impl PgTrapRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TrapLogRow {
    id: i64,
    source_addr: String,
    trap_oid: String,
    raw_varbinds: serde_json::Value,
    event_id: Option<i64>,
    received_at: DateTime<Utc>,
}

fn row_to_log(row: TrapLogRow) -> TrapLogEntry {
    TrapLogEntry {
        id: row.id,
        source_addr: row.source_addr,
        trap_oid: row.trap_oid,
        raw_varbinds: row.raw_varbinds,
        event_id: row.event_id,
        received_at: row.received_at,
    }
}

#[derive(sqlx::FromRow)]
struct TrapEventRow {
    id: i64,
    trap_oid: String,
    source_addr: String,
    vendor: String,
    event_type: String,
    severity: String,
    object_type: Option<String>,
    object_id: Option<String>,
    description: String,
    alarm_id: String,
    is_clear: bool,
    cleared_event_id: Option<i64>,
    occurred_at: DateTime<Utc>,
}

fn row_to_event(row: TrapEventRow) -> TrapEvent {
    TrapEvent {
        id: row.id,
        trap_oid: row.trap_oid,
        source_addr: row.source_addr,
        vendor: row.vendor,
        event_type: row.event_type,
        severity: severity_or_default(&row.severity),
        object_type: row.object_type,
        object_id: row.object_id,
        description: row.description,
        alarm_id: row.alarm_id,
        is_clear: row.is_clear,
        cleared_event_id: row.cleared_event_id,
        occurred_at: row.occurred_at,
    }
}

#[async_trait]
impl TrapRepository for PgTrapRepository {
    async fn insert_log(&self, entry: &TrapLogEntry) -> Result<TrapLogEntry, DatabaseError> {
        let row: TrapLogRow = sqlx::query_as(
            "INSERT INTO trap_log (source_addr, trap_oid, raw_varbinds, event_id)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(&entry.source_addr)
        .bind(&entry.trap_oid)
        .bind(&entry.raw_varbinds)
        .bind(entry.event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_log(row))
    }

    async fn find_uncleared_by_alarm_id(
        &self,
        alarm_id: &str,
    ) -> Result<Option<TrapEvent>, DatabaseError> {
        let row: Option<TrapEventRow> = sqlx::query_as(
            "SELECT * FROM trap_events
             WHERE alarm_id = $1 AND is_clear = false AND cleared_event_id IS NULL",
        )
        .bind(alarm_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_event))
    }

    async fn insert_event(&self, event: &TrapEvent) -> Result<TrapEvent, DatabaseError> {
        let row: TrapEventRow = sqlx::query_as(
            "INSERT INTO trap_events
             (trap_oid, source_addr, vendor, event_type, severity, object_type, object_id,
              description, alarm_id, is_clear, cleared_event_id, occurred_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING *",
        )
        .bind(&event.trap_oid)
        .bind(&event.source_addr)
        .bind(&event.vendor)
        .bind(&event.event_type)
        .bind(event.severity.as_str())
        .bind(&event.object_type)
        .bind(&event.object_id)
        .bind(&event.description)
        .bind(&event.alarm_id)
        .bind(event.is_clear)
        .bind(event.cleared_event_id)
        .bind(event.occurred_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_event(row))
    }

    async fn mark_cleared(&self, event_id: i64, cleared_by: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE trap_events SET cleared_event_id = $2 WHERE id = $1")
            .bind(event_id)
            .bind(cleared_by)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn flush_status(&self, status: &TrapReceiverStatus) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO trap_receiver_status
             (id, traps_received, traps_processed, traps_errors, queue_depth, last_trap_at, is_running, updated_at)
             VALUES (1, $1, $2, $3, $4, $5, $6, now())
             ON CONFLICT (id) DO UPDATE SET
               traps_received = EXCLUDED.traps_received,
               traps_processed = EXCLUDED.traps_processed,
               traps_errors = EXCLUDED.traps_errors,
               queue_depth = EXCLUDED.queue_depth,
               last_trap_at = EXCLUDED.last_trap_at,
               is_running = EXCLUDED.is_running,
               updated_at = now()",
        )
        .bind(status.traps_received as i64)
        .bind(status.traps_processed as i64)
        .bind(status.traps_errors as i64)
        .bind(status.queue_depth as i64)
        .bind(status.last_trap_at)
        .bind(status.is_running)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
