// Dispatcher - resolve a method name and invoke its handler

use super::context::ExecutionContext;
use super::registry::MethodRegistry;
use crate::error::{Result, RpcError};
use serde_json::value::RawValue;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Routes one request to the handler registered under its method name
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<MethodRegistry>) -> Self {
        Self { registry }
    }

    /// Unknown methods fail with `MethodNotFound` before params are looked at.
    pub async fn dispatch(
        &self,
        ctx: ExecutionContext,
        method: &str,
        params: Option<&RawValue>,
    ) -> Result<Value> {
        let descriptor = self
            .registry
            .get(method)
            .ok_or_else(|| RpcError::MethodNotFound(method.to_string()))?;

        debug!(call_id = %ctx.call_id(), method = %descriptor.name(), "Dispatching");
        descriptor.handler().decode_and_invoke(ctx, params).await
    }
}
