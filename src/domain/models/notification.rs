use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::severity::Severity;

/// A configured delivery endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: i64,
    pub name: String,
    pub channel_type: String,
    pub config: serde_json::Value,
    pub enabled: bool,
}

/// Selects which channels a given alert should notify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRule {
    pub id: i64,
    pub trigger_type: String,
    pub severity_filter: Option<Vec<Severity>>,
    pub category_filter: Option<Vec<Category>>,
    pub channel_ids: Vec<i64>,
    pub enabled: bool,
}

impl NotificationRule {
    /// Whether this rule's filters admit the given alert.
    pub fn matches(&self, severity: Severity, category: Category) -> bool {
        self.enabled
            && self
                .severity_filter
                .as_ref()
                .is_none_or(|f| f.contains(&severity))
            && self
                .category_filter
                .as_ref()
                .is_none_or(|f| f.contains(&category))
    }
}

/// Outcome of a single delivery attempt via a
/// [`crate::domain::ports::notification_driver::NotificationDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryResult {
    Sent,
    Failed,
}

impl DeliveryResult {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

/// A persisted delivery record, recorded in `notification_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationHistoryEntry {
    pub id: i64,
    pub alert_id: i64,
    pub channel_id: i64,
    pub result: DeliveryResult,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(sev: Option<Vec<Severity>>, cat: Option<Vec<Category>>) -> NotificationRule {
        NotificationRule {
            id: 1,
            trigger_type: "alert".to_string(),
            severity_filter: sev,
            category_filter: cat,
            channel_ids: vec![1],
            enabled: true,
        }
    }

    #[test]
    fn null_filters_match_everything() {
        assert!(rule(None, None).matches(Severity::Critical, Category::Network));
    }

    #[test]
    fn severity_filter_excludes_non_matching_severity() {
        let r = rule(Some(vec![Severity::Critical]), None);
        assert!(!r.matches(Severity::Warning, Category::Network));
        assert!(r.matches(Severity::Critical, Category::Network));
    }

    #[test]
    fn disabled_rule_never_matches() {
        let mut r = rule(None, None);
        r.enabled = false;
        assert!(!r.matches(Severity::Critical, Category::Network));
    }
}
