//! Deduplication, raise/clear correlation, and lifecycle persistence:
//! fingerprint dedup maps incoming alerts onto an existing live row, and
//! TTL expiry is handled by [`AlertManager::expire_ttl`].

use std::sync::Arc;

use chrono::Duration;

use crate::domain::errors::AlertManagerError;
use crate::domain::models::{AlertStatus, NormalizedAlert, RequestContext, StoredAlert};
use crate::domain::ports::AlertRepository;
use crate::services::notification_fanout::NotificationFanout;

pub struct AlertManager {
    alert_repo: Arc<dyn AlertRepository>,
    notifier: Arc<NotificationFanout>,
    default_ttl: Duration,
}

impl AlertManager {
    pub fn new(
        alert_repo: Arc<dyn AlertRepository>,
        notifier: Arc<NotificationFanout>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            alert_repo,
            notifier,
            default_ttl,
        }
    }

    /// Processes one normalized alert through dedup/correlation. Returns
    /// the affected row, or `None` when a clear found no active
    /// fingerprint to resolve (an "orphan clear", tolerated rather than
    /// treated as an error).
    ///
    /// Notification fan-out only fires for a brand-new raise (a fresh
    /// row) — bumping an existing alert's occurrence count is not itself
    /// notification-worthy.
    pub async fn process_alert(
        &self,
        alert: NormalizedAlert,
        ctx: &RequestContext,
    ) -> Result<Option<StoredAlert>, AlertManagerError> {
        if alert.is_clear {
            return self.process_clear(&alert, ctx).await;
        }
        self.process_raise(alert, ctx).await
    }

    async fn process_clear(
        &self,
        alert: &NormalizedAlert,
        ctx: &RequestContext,
    ) -> Result<Option<StoredAlert>, AlertManagerError> {
        match self
            .alert_repo
            .find_live_by_fingerprint(&alert.fingerprint)
            .await?
        {
            Some(existing) => {
                self.alert_repo.archive(existing.id, AlertStatus::Resolved).await?;
                tracing::info!(
                    request_id = %ctx.request_id,
                    alert_id = existing.id,
                    fingerprint = %alert.fingerprint,
                    "alert resolved by clear"
                );
                Ok(Some(existing))
            }
            None => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    fingerprint = %alert.fingerprint,
                    "clear for unknown fingerprint ignored"
                );
                Ok(None)
            }
        }
    }

    async fn process_raise(
        &self,
        alert: NormalizedAlert,
        ctx: &RequestContext,
    ) -> Result<Option<StoredAlert>, AlertManagerError> {
        match self
            .alert_repo
            .find_live_by_fingerprint(&alert.fingerprint)
            .await?
        {
            Some(existing) => {
                self.alert_repo.bump_occurrence(existing.id).await?;
                tracing::debug!(
                    request_id = %ctx.request_id,
                    alert_id = existing.id,
                    fingerprint = %alert.fingerprint,
                    "existing alert occurrence bumped"
                );
                Ok(Some(existing))
            }
            None => {
                let stored = StoredAlert::from_raise(&alert, self.default_ttl);
                let inserted = self.alert_repo.insert(&stored).await?;
                tracing::info!(
                    request_id = %ctx.request_id,
                    alert_id = inserted.id,
                    fingerprint = %alert.fingerprint,
                    severity = inserted.severity.as_str(),
                    "new alert raised"
                );
                self.notifier.notify(&inserted, ctx).await;
                Ok(Some(inserted))
            }
        }
    }

    /// Fan out a notification for an alert raised outside `process_alert`
    /// (the rule evaluator synthesizes its own `StoredAlert` rows directly,
    /// since they carry a `rule_id` that `process_alert`'s normal path
    /// never sets).
    pub async fn notify_raised(&self, alert: &StoredAlert, ctx: &RequestContext) {
        self.notifier.notify(alert, ctx).await;
    }

    pub async fn acknowledge(
        &self,
        id: i64,
        acknowledged_by: &str,
        ctx: &RequestContext,
    ) -> Result<(), AlertManagerError> {
        self.alert_repo.acknowledge(id, acknowledged_by).await?;
        tracing::info!(request_id = %ctx.request_id, alert_id = id, actor = %acknowledged_by, "alert acknowledged");
        Ok(())
    }

    pub async fn resolve(&self, id: i64, ctx: &RequestContext) -> Result<(), AlertManagerError> {
        self.alert_repo.archive(id, AlertStatus::Resolved).await?;
        tracing::info!(request_id = %ctx.request_id, alert_id = id, "alert manually resolved");
        Ok(())
    }

    /// TTL expirer: archives any row with `expires_at < now` as `expired`.
    /// Returns the count archived.
    pub async fn expire_ttl(&self, ctx: &RequestContext) -> Result<usize, AlertManagerError> {
        let expired = self.alert_repo.find_expired().await?;
        for alert in &expired {
            self.alert_repo.archive(alert.id, AlertStatus::Expired).await?;
            tracing::info!(request_id = %ctx.request_id, alert_id = alert.id, "alert expired by ttl");
        }
        Ok(expired.len())
    }
}
