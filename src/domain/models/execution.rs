use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal/non-terminal lifecycle status of an [`Execution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Success,
    Failed,
    Timeout,
}

impl ExecutionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "timeout" => Some(Self::Timeout),
            _ => None,
        }
    }

    /// Executions in a terminal status never transition again — every
    /// execution eventually reaches one.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Timeout)
    }
}

/// Status of one step within an execution's structured, ordered
/// `steps[]` progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub name: String,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

/// Structured progress for an [`Execution`]. Updated optimistically: a
/// worker reads this JSON, mutates it, writes it back.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Progress {
    pub steps: Vec<ExecutionStep>,
    pub current_step: Option<String>,
    pub percent: u8,
}

impl Progress {
    /// Appends a new step in `Running` status and marks it current.
    pub fn start_step(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.steps.push(ExecutionStep {
            name: name.clone(),
            status: StepStatus::Running,
            started_at: Some(Utc::now()),
            finished_at: None,
            message: None,
        });
        self.current_step = Some(name);
    }

    /// Marks the most recently started step as done or failed and advances
    /// `percent` toward `total_steps`.
    pub fn finish_step(&mut self, success: bool, message: Option<String>, total_steps: usize) {
        if let Some(step) = self.steps.last_mut() {
            step.status = if success {
                StepStatus::Done
            } else {
                StepStatus::Failed
            };
            step.finished_at = Some(Utc::now());
            step.message = message;
        }
        if total_steps > 0 {
            let done = self
                .steps
                .iter()
                .filter(|s| matches!(s.status, StepStatus::Done))
                .count();
            self.percent = ((done * 100) / total_steps).min(100) as u8;
        }
    }
}

/// A single run record for a scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: i64,
    pub job_name: String,
    pub task_name: String,
    pub task_id: Option<String>,
    pub status: ExecutionStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub worker: Option<String>,
    pub triggered_by: Option<String>,
    pub progress: Progress,
}

impl Execution {
    /// Build a fresh `queued` row for a just-dispatched job.
    pub fn new_queued(job_name: impl Into<String>, task_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            job_name: job_name.into(),
            task_name: task_name.into(),
            task_id: None,
            status: ExecutionStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            result: None,
            error_message: None,
            worker: None,
            triggered_by: None,
            progress: Progress::default(),
        }
    }

    /// Whether the janitor should mark this execution `timeout`.
    pub fn is_stale(&self, now: DateTime<Utc>, stale_timeout: chrono::Duration) -> bool {
        !self.status.is_terminal() && now - self.created_at > stale_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_execution_is_not_stale() {
        let exec = Execution::new_queued("discovery", "opsconductor.discovery.scan_chunk");
        assert!(!exec.is_stale(Utc::now(), chrono::Duration::minutes(10)));
    }

    #[test]
    fn old_running_execution_is_stale() {
        let mut exec = Execution::new_queued("discovery", "opsconductor.discovery.scan_chunk");
        exec.status = ExecutionStatus::Running;
        exec.created_at = Utc::now() - chrono::Duration::minutes(30);
        assert!(exec.is_stale(Utc::now(), chrono::Duration::minutes(10)));
    }

    #[test]
    fn terminal_execution_is_never_stale() {
        let mut exec = Execution::new_queued("discovery", "opsconductor.discovery.scan_chunk");
        exec.status = ExecutionStatus::Success;
        exec.created_at = Utc::now() - chrono::Duration::hours(5);
        assert!(!exec.is_stale(Utc::now(), chrono::Duration::minutes(10)));
    }

    #[test]
    fn progress_percent_tracks_completed_steps() {
        let mut progress = Progress::default();
        progress.start_step("resolve_ips");
        progress.finish_step(true, None, 2);
        assert_eq!(progress.percent, 50);
        progress.start_step("scan");
        progress.finish_step(true, None, 2);
        assert_eq!(progress.percent, 100);
    }
}
