//! The four built-in `task_name` handlers dispatched by the scheduler
//! (`opsconductor.job.run`, `opsconductor.workflow.run`,
//! `opsconductor.alerts.evaluate`, `opsconductor.discovery.scan_chunk`).
//!
//! `JobRunHandler`/`WorkflowRunHandler` treat a job as resolving to an
//! ordered list of named steps it reports progress against as it runs
//! them. Each step is treated as an opaque unit of work; step execution
//! itself is out of scope here — what's implemented is the
//! dispatch/progress contract every job shares.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::models::RequestContext;
use crate::domain::ports::JobDefinitionRepository;
use crate::services::ip_resolution::IpResolver;
use crate::services::rule_evaluator::RuleEvaluator;
use crate::services::worker_pool::{ProgressReporter, TaskHandler};

fn step_names(definition: &serde_json::Value) -> Vec<String> {
    definition
        .get("steps")
        .and_then(serde_json::Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .filter_map(|step| step.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

async fn run_steps(steps: &[String], progress: &ProgressReporter) {
    let total = steps.len();
    for step in steps {
        progress.start_step(step.clone()).await;
        progress.finish_step(true, None, total).await;
    }
}

/// `opsconductor.job.run`: resolves `config.job_definition_name` against
/// [`JobDefinitionRepository`] and runs its `definition.steps`.
pub struct JobRunHandler {
    job_definition_repo: Arc<dyn JobDefinitionRepository>,
}

impl JobRunHandler {
    pub fn new(job_definition_repo: Arc<dyn JobDefinitionRepository>) -> Self {
        Self { job_definition_repo }
    }
}

#[async_trait]
impl TaskHandler for JobRunHandler {
    async fn run(
        &self,
        _execution_id: i64,
        config: serde_json::Value,
        progress: Arc<ProgressReporter>,
    ) -> Result<serde_json::Value, String> {
        let name = config
            .get("job_definition_name")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| "config.job_definition_name is required".to_string())?;

        let definition = self
            .job_definition_repo
            .get_by_name(name)
            .await
            .map_err(|err| err.to_string())?
            .ok_or_else(|| format!("job definition not found: {name}"))?;

        if !definition.enabled {
            return Err(format!("job definition disabled: {name}"));
        }

        let steps = step_names(&definition.definition);
        run_steps(&steps, &progress).await;
        Ok(serde_json::json!({ "job_definition": definition.name, "steps_run": steps.len() }))
    }
}

/// `opsconductor.workflow.run`: runs an ad hoc step list carried directly in
/// `config.steps`, rather than a named, persisted definition.
pub struct WorkflowRunHandler;

#[async_trait]
impl TaskHandler for WorkflowRunHandler {
    async fn run(
        &self,
        _execution_id: i64,
        config: serde_json::Value,
        progress: Arc<ProgressReporter>,
    ) -> Result<serde_json::Value, String> {
        let steps = step_names(&config);
        if steps.is_empty() {
            return Err("config.steps must be a non-empty array of step names".to_string());
        }
        run_steps(&steps, &progress).await;
        Ok(serde_json::json!({ "steps_run": steps.len() }))
    }
}

/// `opsconductor.alerts.evaluate`: runs one [`RuleEvaluator::tick`].
pub struct AlertsEvaluateHandler {
    rule_evaluator: Arc<RuleEvaluator>,
}

impl AlertsEvaluateHandler {
    pub fn new(rule_evaluator: Arc<RuleEvaluator>) -> Self {
        Self { rule_evaluator }
    }
}

#[async_trait]
impl TaskHandler for AlertsEvaluateHandler {
    async fn run(
        &self,
        execution_id: i64,
        _config: serde_json::Value,
        progress: Arc<ProgressReporter>,
    ) -> Result<serde_json::Value, String> {
        progress.start_step("evaluate_rules").await;
        let ctx = RequestContext::system(format!("scheduler:execution:{execution_id}"));
        self.rule_evaluator
            .tick(&ctx)
            .await
            .map_err(|err| err.to_string())?;
        progress.finish_step(true, None, 1).await;
        Ok(serde_json::json!({ "evaluated": true }))
    }
}

/// `opsconductor.discovery.scan_chunk`: resolves a chunk of candidate
/// hostnames/addresses to IPv4 via [`IpResolver`], the same resolution path
/// connectors use for inbound alerts.
pub struct DiscoveryScanChunkHandler {
    ip_resolver: Arc<IpResolver>,
}

impl DiscoveryScanChunkHandler {
    pub fn new(ip_resolver: Arc<IpResolver>) -> Self {
        Self { ip_resolver }
    }
}

#[async_trait]
impl TaskHandler for DiscoveryScanChunkHandler {
    async fn run(
        &self,
        _execution_id: i64,
        config: serde_json::Value,
        progress: Arc<ProgressReporter>,
    ) -> Result<serde_json::Value, String> {
        let targets: Vec<String> = config
            .get("targets")
            .and_then(serde_json::Value::as_array)
            .map(|targets| {
                targets
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        if targets.is_empty() {
            return Err("config.targets must be a non-empty array".to_string());
        }

        progress.start_step("resolve_chunk").await;
        let mut resolved = Vec::with_capacity(targets.len());
        for target in &targets {
            if let Some(ip) = self.ip_resolver.resolve(Some(target), None).await {
                resolved.push(serde_json::json!({ "target": target, "ip": ip }));
            }
        }
        progress.finish_step(true, None, 1).await;

        Ok(serde_json::json!({ "scanned": targets.len(), "resolved": resolved }))
    }
}
