use async_trait::async_trait;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{AlertStatus, StoredAlert};

/// Persistence port for `system_alerts`/`alert_history`.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Finds a live (`active`/`acknowledged`) row by fingerprint.
    async fn find_live_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<StoredAlert>, DatabaseError>;

    async fn get(&self, id: i64) -> Result<Option<StoredAlert>, DatabaseError>;

    /// Inserts a brand-new `active` row for a raise with no existing
    /// active row.
    async fn insert(&self, alert: &StoredAlert) -> Result<StoredAlert, DatabaseError>;

    /// Bumps `last_seen_at`/`occurrence_count` on an existing active row
    /// when a raise arrives for an alert that's already live.
    async fn bump_occurrence(&self, id: i64) -> Result<(), DatabaseError>;

    async fn acknowledge(&self, id: i64, acknowledged_by: &str) -> Result<(), DatabaseError>;

    /// Archives a row to `alert_history` with the given terminal status
    /// (`resolved` or `expired`).
    async fn archive(&self, id: i64, status: AlertStatus) -> Result<(), DatabaseError>;

    /// All live rows whose `expires_at` has passed, for the TTL expirer.
    async fn find_expired(&self) -> Result<Vec<StoredAlert>, DatabaseError>;

    /// All live rows with a non-null `rule_id`, for rule auto-resolve.
    async fn find_live_by_rule(&self, rule_id: i64) -> Result<Vec<StoredAlert>, DatabaseError>;

    /// Most recent `triggered_at` among `system_alerts` + `alert_history`
    /// rows for this rule, for cooldown enforcement.
    async fn last_triggered_at_for_rule(
        &self,
        rule_id: i64,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, DatabaseError>;
}
