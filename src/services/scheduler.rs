//! Due-job selection, dispatch, and stale-execution recovery. The
//! dispatch/janitor loop runs as a single `tokio::select!` over two
//! interval tickers and a `tokio_util::sync::CancellationToken`.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::domain::errors::SchedulerError;
use crate::domain::models::{ScheduleType, SchedulerJob};
use crate::domain::ports::SchedulerJobRepository;
use crate::services::worker_pool::WorkerPool;

pub struct Scheduler {
    job_repo: Arc<dyn SchedulerJobRepository>,
    worker_pool: Arc<WorkerPool>,
    tick_interval: Duration,
    stale_timeout: chrono::Duration,
    stale_check_interval: Duration,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        job_repo: Arc<dyn SchedulerJobRepository>,
        worker_pool: Arc<WorkerPool>,
        tick_interval: Duration,
        stale_timeout: chrono::Duration,
        stale_check_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job_repo,
            worker_pool,
            tick_interval,
            stale_timeout,
            stale_check_interval,
            cancel,
        }
    }

    /// Validates a schedule's cron/interval shape before it's persisted.
    /// The minimum interval is 1 second; there's no configured ceiling.
    pub fn validate_schedule(job: &SchedulerJob) -> Result<(), SchedulerError> {
        match job.schedule_type {
            ScheduleType::Cron => {
                let expr = job.cron_expression.as_deref().ok_or_else(|| {
                    SchedulerError::InvalidSchedule(format!("{}: cron schedule missing expression", job.name))
                })?;
                cron::Schedule::from_str(expr).map_err(|err| {
                    SchedulerError::InvalidSchedule(format!("{}: invalid cron expression: {err}", job.name))
                })?;
            }
            ScheduleType::Interval => {
                if job.interval_seconds.is_none_or(|secs| secs < 1) {
                    return Err(SchedulerError::InvalidSchedule(format!(
                        "{}: interval schedule requires interval_seconds >= 1",
                        job.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Runs both the due-job dispatch loop and the stale-execution janitor
    /// until cancelled. Cancellation only stops scheduling new ticks;
    /// already-dispatched executions keep running in the worker pool.
    pub async fn run(self: Arc<Self>) {
        let mut dispatch_ticker = tokio::time::interval(self.tick_interval);
        let mut janitor_ticker = tokio::time::interval(self.stale_check_interval);

        loop {
            tokio::select! {
                _ = dispatch_ticker.tick() => {
                    if let Err(err) = self.dispatch_due_jobs().await {
                        tracing::error!(error = %err, "scheduler tick failed");
                    }
                }
                _ = janitor_ticker.tick() => {
                    match self.worker_pool.reap_stale(self.stale_timeout).await {
                        Ok(0) => {}
                        Ok(count) => tracing::info!(count, "reaped stale executions"),
                        Err(err) => tracing::error!(error = %err, "stale-execution janitor failed"),
                    }
                }
                () = self.cancel.cancelled() => {
                    tracing::info!("scheduler loop shutting down");
                    break;
                }
            }
        }
    }

    async fn dispatch_due_jobs(&self) -> Result<(), SchedulerError> {
        let now = Utc::now();
        let due = self.job_repo.find_due(now).await?;
        for job in due {
            let next_run_at = compute_next_run(&job, now);
            match self
                .worker_pool
                .dispatch(&job.name, &job.task_name, job.config.clone(), Some("scheduler".to_string()))
                .await
            {
                Ok(execution_id) => {
                    tracing::info!(job = %job.name, execution_id, "dispatched due job");
                    self.job_repo.record_dispatch(&job.name, now, next_run_at).await?;
                }
                Err(err) => {
                    tracing::error!(job = %job.name, error = %err, "failed to dispatch due job");
                }
            }
        }
        Ok(())
    }
}

/// Advances `next_run_at` after a dispatch. Interval jobs add
/// `interval_seconds` to `now`; cron jobs take the next firing after `now`
/// from their cron expression. A malformed cron expression (should have
/// been rejected at creation by [`Scheduler::validate_schedule`]) leaves
/// `next_run_at` unset rather than panicking.
fn compute_next_run(job: &SchedulerJob, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match job.schedule_type {
        ScheduleType::Interval => job
            .interval_seconds
            .map(|secs| now + chrono::Duration::seconds(secs)),
        ScheduleType::Cron => job
            .cron_expression
            .as_deref()
            .and_then(|expr| cron::Schedule::from_str(expr).ok())
            .and_then(|schedule| schedule.after(&now).next()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_job(schedule_type: ScheduleType) -> SchedulerJob {
        SchedulerJob {
            name: "discovery".to_string(),
            task_name: "opsconductor.discovery.scan_chunk".to_string(),
            config: serde_json::json!({}),
            schedule_type,
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
    fn interval_job_advances_by_interval_seconds() {
        let job = base_job(ScheduleType::Interval);
        let now = Utc::now();
        let next = compute_next_run(&job, now).unwrap();
        assert_eq!(next, now + chrono::Duration::seconds(300));
    }

    #[test]
    fn cron_job_advances_to_next_firing() {
        let mut job = base_job(ScheduleType::Cron);
        job.interval_seconds = None;
        job.cron_expression = Some("0 0 * * * * *".to_string());
        let now = Utc::now();
        let next = compute_next_run(&job, now).unwrap();
        assert!(next > now);
    }

    #[test]
    fn validate_schedule_rejects_malformed_cron() {
        let mut job = base_job(ScheduleType::Cron);
        job.interval_seconds = None;
        job.cron_expression = Some("not a cron expression".to_string());
        assert!(Scheduler::validate_schedule(&job).is_err());
    }

    #[test]
    fn validate_schedule_rejects_zero_interval() {
        let mut job = base_job(ScheduleType::Interval);
        job.interval_seconds = Some(0);
        assert!(Scheduler::validate_schedule(&job).is_err());
    }

    #[test]
    fn validate_schedule_accepts_well_formed_jobs() {
        assert!(Scheduler::validate_schedule(&base_job(ScheduleType::Interval)).is_ok());
        let mut cron_job = base_job(ScheduleType::Cron);
        cron_job.interval_seconds = None;
        cron_job.cron_expression = Some("0 0 * * * * *".to_string());
        assert!(Scheduler::validate_schedule(&cron_job).is_ok());
    }
}
