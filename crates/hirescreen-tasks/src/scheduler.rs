use futures::future::BoxFuture;

/// "Run once, soon" fire-and-forget dispatch.
pub trait Scheduler: Send + Sync {
    fn run_soon(&self, name: &'static str, job: BoxFuture<'static, ()>);
}

/// Runs jobs on the ambient tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn run_soon(&self, name: &'static str, job: BoxFuture<'static, ()>) {
        tracing::debug!(job = name, "scheduling background job");
        tokio::spawn(job);
    }
}
