//! Access Log
//!
//! One structured line per answered call, written after the response has
//! gone out.

use async_trait::async_trait;
use rpcgate_core::application::ExecutionContext;
use rpcgate_core::port::{BatchObserver, BatchSummary};
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct AccessLog;

#[async_trait]
impl BatchObserver for AccessLog {
    async fn on_batch_complete(&self, ctx: ExecutionContext, summary: BatchSummary) {
        info!(
            call_id = %ctx.call_id(),
            client_ip = ctx.client_ip().unwrap_or("-"),
            received_at = %ctx.received_at(),
            methods = ?summary.methods,
            responses = summary.responses,
            errors = summary.errors,
            suppressed = summary.suppressed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Call completed"
        );
    }
}
