//! Bounded-concurrency dispatch substrate for scheduled jobs: a fixed-size
//! worker pool (`Semaphore::new(max_workers)` + `acquire_owned().await` +
//! `tokio::spawn` per task) that dispatches and forgets, keyed by
//! `task_name`, rather than waiting on a same-wave barrier.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::domain::errors::{DatabaseError, SchedulerError};
use crate::domain::models::{Execution, ExecutionStatus, Progress};
use crate::domain::ports::ExecutionRepository;

/// One registered task implementation, keyed by `task_name` in
/// `scheduler_jobs`. `config` is the job's own `config` JSON column.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(
        &self,
        execution_id: i64,
        config: serde_json::Value,
        progress: Arc<ProgressReporter>,
    ) -> Result<serde_json::Value, String>;
}

/// Lets a [`TaskHandler`] push progress updates without holding a reference
/// to the whole pool. Each call is a read-mutate-write against the stored
/// `Progress` JSON; a concurrent update can be lost to a later write, and
/// that's tolerated rather than guarded with an optimistic version check.
pub struct ProgressReporter {
    execution_id: i64,
    execution_repo: Arc<dyn ExecutionRepository>,
}

impl ProgressReporter {
    pub async fn start_step(&self, name: impl Into<String>) {
        self.mutate(|progress| progress.start_step(name)).await;
    }

    pub async fn finish_step(&self, success: bool, message: Option<String>, total_steps: usize) {
        self.mutate(|progress| progress.finish_step(success, message, total_steps))
            .await;
    }

    async fn mutate(&self, f: impl FnOnce(&mut Progress)) {
        let Ok(Some(current)) = self.execution_repo.get(self.execution_id).await else {
            return;
        };
        let mut progress = current.progress;
        f(&mut progress);
        let _ = self
            .execution_repo
            .update_progress(self.execution_id, &progress)
            .await;
    }
}

pub struct WorkerPool {
    execution_repo: Arc<dyn ExecutionRepository>,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    semaphore: Arc<Semaphore>,
    max_workers: usize,
    worker_label: String,
}

impl WorkerPool {
    pub fn new(execution_repo: Arc<dyn ExecutionRepository>, max_workers: usize, worker_label: impl Into<String>) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            execution_repo,
            handlers: HashMap::new(),
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            worker_label: worker_label.into(),
        }
    }

    pub fn register_handler(&mut self, task_name: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(task_name.into(), handler);
    }

    /// Currently acquired permits, used by [`crate::domain::ports::WorkerCountProbe`]
    /// implementations to approximate `worker_count` for the rule evaluator.
    pub fn busy_workers(&self) -> usize {
        self.max_workers.saturating_sub(self.semaphore.available_permits())
    }

    /// Inserts a `queued` Execution row and spawns the dispatch. Returns
    /// the new execution id immediately; the worker itself runs detached
    /// on the runtime.
    pub async fn dispatch(
        self: &Arc<Self>,
        job_name: &str,
        task_name: &str,
        config: serde_json::Value,
        triggered_by: Option<String>,
    ) -> Result<i64, SchedulerError> {
        let handler = self
            .handlers
            .get(task_name)
            .cloned()
            .ok_or_else(|| SchedulerError::UnknownTask(task_name.to_string()))?;

        let mut execution = Execution::new_queued(job_name, task_name);
        execution.triggered_by = triggered_by;
        let inserted = self.execution_repo.insert(&execution).await?;
        let execution_id = inserted.id;

        let pool = Arc::clone(self);
        tokio::spawn(async move {
            pool.run_dispatched(execution_id, handler, config).await;
        });

        Ok(execution_id)
    }

    async fn run_dispatched(
        self: Arc<Self>,
        execution_id: i64,
        handler: Arc<dyn TaskHandler>,
        config: serde_json::Value,
    ) {
        let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
            tracing::error!(execution_id, "worker pool semaphore closed, execution abandoned");
            return;
        };

        if let Err(err) = self
            .execution_repo
            .mark_started(execution_id, &self.worker_label)
            .await
        {
            tracing::warn!(execution_id, error = %err, "failed to mark execution started");
        }

        let progress = Arc::new(ProgressReporter {
            execution_id,
            execution_repo: self.execution_repo.clone(),
        });

        let outcome = handler.run(execution_id, config, progress).await;
        drop(permit);

        let (status, result, error_message) = match outcome {
            Ok(result) => (ExecutionStatus::Success, Some(result), None),
            Err(message) => (ExecutionStatus::Failed, None, Some(message)),
        };

        if let Err(err) = self
            .execution_repo
            .mark_terminal(execution_id, status, result, error_message)
            .await
        {
            tracing::error!(execution_id, error = %err, "failed to mark execution terminal");
        }
    }

    /// Stale-execution janitor: marks any execution with `status ∈
    /// {queued, running}` and `created_at < now - stale_timeout` as
    /// `timeout`.
    pub async fn reap_stale(&self, stale_timeout: chrono::Duration) -> Result<usize, DatabaseError> {
        let stale = self.execution_repo.find_stale(stale_timeout).await?;
        for execution in &stale {
            self.execution_repo
                .mark_terminal(
                    execution.id,
                    ExecutionStatus::Timeout,
                    None,
                    Some("Execution timed out".to_string()),
                )
                .await?;
            tracing::warn!(execution_id = execution.id, "execution reaped as stale");
        }
        Ok(stale.len())
    }
}

#[async_trait]
impl crate::domain::ports::WorkerCountProbe for WorkerPool {
    /// The pool has no separate worker-liveness channel — every configured
    /// slot is always "alive", so this reports the configured size rather
    /// than a reachable subset.
    async fn observed_worker_count(&self) -> Option<usize> {
        Some(self.max_workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ExecutionStatus as Status;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeExecutionRepo {
        rows: StdMutex<HashMap<i64, Execution>>,
        next_id: StdMutex<i64>,
    }

    #[async_trait]
    impl ExecutionRepository for FakeExecutionRepo {
        async fn insert(&self, execution: &Execution) -> Result<Execution, DatabaseError> {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            let mut row = execution.clone();
            row.id = *next_id;
            self.rows.lock().unwrap().insert(row.id, row.clone());
            Ok(row)
        }

        async fn get(&self, id: i64) -> Result<Option<Execution>, DatabaseError> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn mark_started(&self, id: i64, worker: &str) -> Result<(), DatabaseError> {
            if let Some(row) = self.rows.lock().unwrap().get_mut(&id) {
                row.status = Status::Running;
                row.worker = Some(worker.to_string());
            }
            Ok(())
        }

        async fn update_progress(&self, id: i64, progress: &Progress) -> Result<(), DatabaseError> {
            if let Some(row) = self.rows.lock().unwrap().get_mut(&id) {
                row.progress = progress.clone();
            }
            Ok(())
        }

        async fn mark_terminal(
            &self,
            id: i64,
            status: Status,
            result: Option<serde_json::Value>,
            error_message: Option<String>,
        ) -> Result<(), DatabaseError> {
            if let Some(row) = self.rows.lock().unwrap().get_mut(&id) {
                row.status = status;
                row.result = result;
                row.error_message = error_message;
            }
            Ok(())
        }

        async fn find_stale(&self, stale_timeout: chrono::Duration) -> Result<Vec<Execution>, DatabaseError> {
            let now = chrono::Utc::now();
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|row| row.is_stale(now, stale_timeout))
                .cloned()
                .collect())
        }

        async fn count_failed_in_window(&self, _window: chrono::Duration) -> Result<i64, DatabaseError> {
            Ok(0)
        }

        async fn count_running_longer_than(&self, _max_duration: chrono::Duration) -> Result<i64, DatabaseError> {
            Ok(0)
        }
    }

    struct EchoHandler {
        started: Arc<Notify>,
    }

    #[async_trait]
    impl TaskHandler for EchoHandler {
        async fn run(
            &self,
            _execution_id: i64,
            config: serde_json::Value,
            progress: Arc<ProgressReporter>,
        ) -> Result<serde_json::Value, String> {
            progress.start_step("run").await;
            self.started.notify_one();
            progress.finish_step(true, None, 1).await;
            Ok(config)
        }
    }

    #[tokio::test]
    async fn dispatch_runs_registered_handler_to_success() {
        let repo = Arc::new(FakeExecutionRepo::default());
        let mut pool = WorkerPool::new(repo.clone(), 2, "worker-1");
        let started = Arc::new(Notify::new());
        pool.register_handler(
            "opsconductor.job.run",
            Arc::new(EchoHandler { started: started.clone() }),
        );
        let pool = Arc::new(pool);

        let execution_id = pool
            .dispatch("discovery", "opsconductor.job.run", serde_json::json!({"k": 1}), None)
            .await
            .unwrap();

        started.notified().await;
        // give the spawned task a moment to finish writing the terminal status
        for _ in 0..50 {
            if repo.get(execution_id).await.unwrap().unwrap().status == Status::Success {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let row = repo.get(execution_id).await.unwrap().unwrap();
        assert_eq!(row.status, Status::Success);
        assert_eq!(row.result, Some(serde_json::json!({"k": 1})));
    }

    #[tokio::test]
    async fn dispatch_unknown_task_name_fails_fast() {
        let repo = Arc::new(FakeExecutionRepo::default());
        let pool = Arc::new(WorkerPool::new(repo, 2, "worker-1"));
        let err = pool
            .dispatch("discovery", "opsconductor.unknown", serde_json::json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownTask(_)));
    }
}
