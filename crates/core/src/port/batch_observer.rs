// Batch observer port (post-call side effects)

use crate::application::context::ExecutionContext;
use async_trait::async_trait;
use std::time::Duration;

/// What happened during one supervised batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub methods: Vec<String>,
    pub responses: usize,
    pub errors: usize,
    pub suppressed: bool,
    pub elapsed: Duration,
}

/// Receives the detached context once a call has been answered
#[async_trait]
pub trait BatchObserver: Send + Sync {
    async fn on_batch_complete(&self, ctx: ExecutionContext, summary: BatchSummary);
}
