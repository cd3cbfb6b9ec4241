use serde::{Deserialize, Serialize};

/// A reusable, named job definition that a [`super::scheduler_job::SchedulerJob`]
/// may reference via `job_definition_id`. Distinct from the schedule
/// itself: the same definition can be attached to more than one schedule,
/// or triggered ad hoc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub definition: serde_json::Value,
    pub enabled: bool,
}
