use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a job's `next_run_at` is advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Interval,
    Cron,
}

impl ScheduleType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::Cron => "cron",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "interval" => Some(Self::Interval),
            "cron" => Some(Self::Cron),
            _ => None,
        }
    }
}

/// A scheduled job, keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerJob {
    pub name: String,
    pub task_name: String,
    pub config: serde_json::Value,
    pub schedule_type: ScheduleType,
    pub interval_seconds: Option<i64>,
    pub cron_expression: Option<String>,
    pub enabled: bool,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub max_runs: Option<i64>,
    pub run_count: i64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub job_definition_id: Option<i64>,
}

impl SchedulerJob {
    /// The due-job predicate, evaluated against `now`. The actual
    /// selection runs as SQL (`adapters::postgres`); this mirrors it for
    /// use in unit tests that don't touch a database.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled
            && self.next_run_at.is_none_or(|t| t <= now)
            && self.start_at.is_none_or(|t| t <= now)
            && self.end_at.is_none_or(|t| t >= now)
            && self.max_runs.is_none_or(|m| self.run_count < m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SchedulerJob {
        SchedulerJob {
            name: "discovery".to_string(),
            task_name: "opsconductor.discovery.scan_chunk".to_string(),
            config: serde_json::json!({}),
            schedule_type: ScheduleType::Interval,
            interval_seconds: Some(300),
            cron_expression: None,
            enabled: true,
            start_at: None,
            end_at: None,
            max_runs: None,
            run_count: 0,
            last_run_at: None,
            next_run_at: None,
            job_definition_id: None,
        }
    }

    #[test]
    fn disabled_job_is_never_due() {
        let mut job = base();
        job.enabled = false;
        assert!(!job.is_due(Utc::now()));
    }

    #[test]
    fn job_past_max_runs_is_not_due() {
        let mut job = base();
        job.max_runs = Some(5);
        job.run_count = 5;
        assert!(!job.is_due(Utc::now()));
    }

    #[test]
    fn job_with_future_next_run_is_not_due() {
        let mut job = base();
        job.next_run_at = Some(Utc::now() + chrono::Duration::minutes(5));
        assert!(!job.is_due(Utc::now()));
    }

    #[test]
    fn fresh_job_with_no_next_run_is_due() {
        assert!(base().is_due(Utc::now()));
    }
}
