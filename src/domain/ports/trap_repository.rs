use async_trait::async_trait;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{TrapEvent, TrapLogEntry, TrapReceiverStatus};

/// Persistence port for `trap_log`/`trap_events`/`trap_receiver_status`.
#[async_trait]
pub trait TrapRepository: Send + Sync {
    async fn insert_log(&self, entry: &TrapLogEntry) -> Result<TrapLogEntry, DatabaseError>;

    /// The un-cleared event with this `alarm_id`, if one exists.
    async fn find_uncleared_by_alarm_id(
        &self,
        alarm_id: &str,
    ) -> Result<Option<TrapEvent>, DatabaseError>;

    async fn insert_event(&self, event: &TrapEvent) -> Result<TrapEvent, DatabaseError>;

    async fn mark_cleared(&self, event_id: i64, cleared_by: i64) -> Result<(), DatabaseError>;

    async fn flush_status(&self, status: &TrapReceiverStatus) -> Result<(), DatabaseError>;
}
