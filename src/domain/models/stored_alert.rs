use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::normalized_alert::NormalizedAlert;
use super::severity::Severity;

/// Lifecycle status of a persisted alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Expired,
}

impl AlertStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
            Self::Expired => "expired",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "acknowledged" => Some(Self::Acknowledged),
            "resolved" => Some(Self::Resolved),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Rows in either of these statuses are still "live" and participate in
    /// fingerprint dedup / cooldown checks.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Active | Self::Acknowledged)
    }
}

/// A persisted alert record. Lives in `system_alerts` while live, moves to
/// `alert_history` on resolve/expire and is never mutated after archival.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAlert {
    pub id: i64,
    pub fingerprint: String,
    pub source_system: String,
    pub source_alert_id: String,
    pub device_ip: String,
    pub device_name: Option<String>,
    pub severity: Severity,
    pub category: Category,
    pub alert_type: String,
    pub title: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub raw_data: serde_json::Value,
    pub status: AlertStatus,
    pub occurrence_count: i64,
    pub triggered_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub rule_id: Option<i64>,
}

impl StoredAlert {
    /// Build the initial row for a novel fingerprint raise: inserted with
    /// `status = active`.
    pub fn from_raise(alert: &NormalizedAlert, default_ttl: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            fingerprint: alert.fingerprint.clone(),
            source_system: alert.source_system.clone(),
            source_alert_id: alert.source_alert_id.clone(),
            device_ip: alert.device_ip.clone(),
            device_name: alert.device_name.clone(),
            severity: alert.severity,
            category: alert.category,
            alert_type: alert.alert_type.clone(),
            title: alert.title.clone(),
            message: alert.message.clone(),
            occurred_at: alert.occurred_at,
            raw_data: alert.raw_data.clone(),
            status: AlertStatus::Active,
            occurrence_count: 1,
            triggered_at: now,
            last_seen_at: now,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            expires_at: Some(now + default_ttl),
            rule_id: None,
        }
    }

    /// Build the initial row for a rule-evaluator raise: same shape as
    /// [`Self::from_raise`] but attributed to the triggering
    /// `alert_rules.id` so cooldown lookups and auto-resolve walks can find
    /// it by rule.
    pub fn from_rule_raise(alert: &NormalizedAlert, default_ttl: chrono::Duration, rule_id: i64) -> Self {
        Self {
            rule_id: Some(rule_id),
            ..Self::from_raise(alert, default_ttl)
        }
    }
}
