// Success Use Case - liveness probe answered through the full pipeline

use crate::application::context::ExecutionContext;
use crate::error::Result;
use async_trait::async_trait;
use tracing::debug;

pub const SUCCESS: &str = "ok";

#[async_trait]
pub trait SuccessUsecase: Send + Sync {
    async fn get_success(&self, ctx: &ExecutionContext) -> Result<String>;
}

/// Always answers [`SUCCESS`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SuccessService;

impl SuccessService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SuccessUsecase for SuccessService {
    async fn get_success(&self, ctx: &ExecutionContext) -> Result<String> {
        debug!(call_id = %ctx.call_id(), received_at = %ctx.received_at(), "getSuccess");
        Ok(SUCCESS.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_success() {
        let result = SuccessService::new()
            .get_success(&ExecutionContext::background())
            .await
            .unwrap();
        assert_eq!(result, "ok");
    }
}
