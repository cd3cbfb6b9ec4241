use serde::{Deserialize, Serialize};

use super::category::Category;
use super::severity::Severity;

/// The condition a rule evaluates. Closed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    ErrorRate,
    ErrorCount,
    JobFailureCount,
    WorkerCount,
    LongRunningJob,
}

impl ConditionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ErrorRate => "error_rate",
            Self::ErrorCount => "error_count",
            Self::JobFailureCount => "job_failure_count",
            Self::WorkerCount => "worker_count",
            Self::LongRunningJob => "long_running_job",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "error_rate" => Some(Self::ErrorRate),
            "error_count" => Some(Self::ErrorCount),
            "job_failure_count" => Some(Self::JobFailureCount),
            "worker_count" => Some(Self::WorkerCount),
            "long_running_job" => Some(Self::LongRunningJob),
            _ => None,
        }
    }
}

/// A rule that periodically evaluates operational telemetry and creates a
/// system alert when triggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
    pub severity: Severity,
    pub category: Category,
    pub condition_type: ConditionType,
    pub condition_config: serde_json::Value,
    pub cooldown_minutes: i64,
    /// Whether auto-resolve archives an *acknowledged* alert once its
    /// condition clears, or leaves it for an operator to resolve manually.
    /// Defaults to `true`; set per rule so operators can require manual
    /// resolution for rules where an ack should stick.
    pub auto_resolve_acknowledged: bool,
}

impl AlertRule {
    /// The `alert_key` synthesized for alerts this rule creates:
    /// `"{rule_name}_{rule_id}"`.
    pub fn alert_key(&self) -> String {
        format!("{}_{}", self.name, self.id)
    }
}

/// Parsed `condition_config` for `error_rate`/`error_count`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorRateConfig {
    #[serde(default = "default_threshold")]
    pub threshold: i64,
    #[serde(default = "default_window")]
    pub time_window_minutes: i64,
    #[serde(default = "default_levels")]
    pub levels: Vec<String>,
}

fn default_threshold() -> i64 {
    10
}
fn default_window() -> i64 {
    60
}
fn default_levels() -> Vec<String> {
    vec!["ERROR".to_string(), "CRITICAL".to_string()]
}

/// Parsed `condition_config` for `job_failure_count`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobFailureConfig {
    #[serde(default = "default_job_threshold")]
    pub threshold: i64,
    #[serde(default = "default_window")]
    pub time_window_minutes: i64,
}

fn default_job_threshold() -> i64 {
    3
}

/// Parsed `condition_config` for `worker_count`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerCountConfig {
    #[serde(default = "default_min_workers")]
    pub min_workers: i64,
}

fn default_min_workers() -> i64 {
    1
}

/// Parsed `condition_config` for `long_running_job`.
#[derive(Debug, Clone, Deserialize)]
pub struct LongRunningJobConfig {
    #[serde(default = "default_max_duration")]
    pub max_duration_minutes: i64,
}

fn default_max_duration() -> i64 {
    30
}
