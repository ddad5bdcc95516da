// Execution Supervisor - runs a parsed batch under one context

pub mod panic_guard;

use self::panic_guard::{execute_guarded, PanicGuardResult};
use super::classifier::ErrorClassifier;
use super::context::ExecutionContext;
use super::dispatcher::Dispatcher;
use crate::domain::{Request, Response};
use crate::error::RpcError;
use tracing::debug;

/// Responses in request order, plus the context that outlives the call
#[derive(Debug)]
pub struct SupervisedBatch {
    pub responses: Vec<Response>,
    pub detached: ExecutionContext,
}

/// Runs every request of a batch in order, converting failures and panics
/// into per-request error responses
#[derive(Debug, Clone)]
pub struct ExecutionSupervisor {
    dispatcher: Dispatcher,
    classifier: ErrorClassifier,
}

impl ExecutionSupervisor {
    pub fn new(dispatcher: Dispatcher, classifier: ErrorClassifier) -> Self {
        Self {
            dispatcher,
            classifier,
        }
    }

    pub async fn run(&self, ctx: &ExecutionContext, requests: Vec<Request>) -> SupervisedBatch {
        let mut responses = Vec::with_capacity(requests.len());

        for request in requests {
            let outcome = execute_guarded(self.dispatcher.dispatch(
                ctx.clone(),
                &request.method,
                request.raw_params(),
            ))
            .await;

            let response = match outcome {
                PanicGuardResult::Success(Ok(result)) => Response::success(request.id, result),
                PanicGuardResult::Success(Err(err)) => {
                    Response::failure(request.id, self.classifier.classify(&err))
                }
                PanicGuardResult::Panicked(msg) => {
                    let err = RpcError::Internal(format!("panic in '{}': {}", request.method, msg));
                    Response::failure(request.id, self.classifier.classify(&err))
                }
            };

            // Nobody is waiting for this response any more
            if ctx.is_cancelled() {
                debug!(call_id = %ctx.call_id(), method = %request.method, "Response suppressed after cancellation");
                continue;
            }
            responses.push(response);
        }

        SupervisedBatch {
            responses,
            detached: ctx.detached(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cancel::cancel_channel;
    use crate::application::registry::MethodRegistry;
    use crate::domain::{Headers, Language, MessageCatalog};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    fn supervisor() -> ExecutionSupervisor {
        let mut builder = MethodRegistry::builder();
        builder
            .register_fn("getSuccess", |_ctx| async { Ok("ok") })
            .register_fn("explode", |_ctx| async {
                if true {
                    panic!("kaboom");
                }
                Ok(())
            });
        ExecutionSupervisor::new(
            Dispatcher::new(Arc::new(builder.build())),
            ErrorClassifier::new(MessageCatalog::new(Language::En)),
        )
    }

    fn request(method: &str, id: serde_json::Value) -> Request {
        serde_json::from_value(json!({"jsonrpc": "2.0", "method": method, "id": id})).unwrap()
    }

    #[tokio::test]
    async fn test_responses_follow_request_order() {
        let batch = supervisor()
            .run(
                &ExecutionContext::background(),
                vec![
                    request("nope", json!(1)),
                    request("getSuccess", json!(2)),
                ],
            )
            .await;

        assert_eq!(batch.responses.len(), 2);
        assert_eq!(batch.responses[0].id, json!(1));
        assert_eq!(batch.responses[0].error.as_ref().unwrap().code, -32601);
        assert_eq!(batch.responses[1].id, json!(2));
        assert_eq!(batch.responses[1].result, Some(json!("ok")));
    }

    #[tokio::test]
    async fn test_panic_is_isolated_to_its_request() {
        let batch = supervisor()
            .run(
                &ExecutionContext::background(),
                vec![request("explode", json!("a")), request("getSuccess", json!("b"))],
            )
            .await;

        let err = batch.responses[0].error.as_ref().unwrap();
        assert_eq!(err.code, -32603);
        assert!(err.data.is_none());
        assert_eq!(batch.responses[1].result, Some(json!("ok")));
    }

    #[tokio::test]
    async fn test_cancelled_context_suppresses_responses() {
        let (source, signal) = cancel_channel();
        let ctx = ExecutionContext::new("c", Arc::new(Headers::new()), signal, Utc::now().into());
        source.cancel();

        let batch = supervisor()
            .run(&ctx, vec![request("getSuccess", json!(1))])
            .await;

        assert!(batch.responses.is_empty());
        assert!(!batch.detached.is_cancelled());
        assert_eq!(batch.detached.call_id(), "c");
    }
}
