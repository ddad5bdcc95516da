//! Method Table
//!
//! Binds the exposed RPC method names to their use cases.

use rpcgate_core::application::{MethodRegistry, SuccessUsecase};
use std::sync::Arc;

pub const GET_SUCCESS: &str = "getSuccess";

/// Build the frozen registry served by the HTTP endpoint
pub fn build_registry(success: Arc<dyn SuccessUsecase>) -> MethodRegistry {
    let mut builder = MethodRegistry::builder();
    builder.register_fn(GET_SUCCESS, move |ctx| {
        let success = success.clone();
        async move { success.get_success(&ctx).await }
    });
    builder.build()
}
