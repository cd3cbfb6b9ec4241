use async_trait::async_trait;

/// Decouples the rule evaluator's `worker_count` condition from the
/// concrete worker-pool implementation it runs alongside.
#[async_trait]
pub trait WorkerCountProbe: Send + Sync {
    /// Number of workers currently observed alive. An inspection error is
    /// treated as zero workers by the caller.
    async fn observed_worker_count(&self) -> Option<usize>;
}
