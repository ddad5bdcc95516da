//! RPC Pipeline
//!
//! Parse → header check → supervise → assemble, for one HTTP body.
//! The HTTP layer owns transport concerns (preflight, deadlines, headers);
//! everything here is transport-agnostic.

use super::assembler::ResponseAssembler;
use super::classifier::ErrorClassifier;
use super::context::ExecutionContext;
use super::dispatcher::Dispatcher;
use super::parser::{forwarded_client, RequestParser};
use super::registry::MethodRegistry;
use super::supervisor::ExecutionSupervisor;
use crate::domain::MessageCatalog;
use crate::error::{Result, RpcError};
use crate::port::{BatchObserver, BatchSummary};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Header every call must carry unless configured otherwise
pub const DEFAULT_REQUIRED_HEADER: &str = "authorization";

/// Shared, read-only request pipeline; one instance serves every call
#[derive(Clone)]
pub struct RpcPipeline {
    supervisor: ExecutionSupervisor,
    assembler: ResponseAssembler,
    required_header: Option<String>,
    observer: Option<Arc<dyn BatchObserver>>,
}

impl RpcPipeline {
    pub fn builder(registry: Arc<MethodRegistry>) -> RpcPipelineBuilder {
        RpcPipelineBuilder {
            registry,
            catalog: MessageCatalog::default(),
            required_header: Some(DEFAULT_REQUIRED_HEADER.to_string()),
            observer: None,
        }
    }

    /// Run one HTTP body through the pipeline.
    ///
    /// Returns `Ok(None)` when the call was cancelled before its responses
    /// could be assembled; the caller writes no body in that case.
    pub async fn process(&self, ctx: ExecutionContext, body: &[u8]) -> Result<Option<Vec<u8>>> {
        let started = Instant::now();

        let requests = match RequestParser::parse(body, ctx.headers().clone()) {
            Ok(requests) => requests,
            Err(err) => return self.render_error(&err).map(Some),
        };

        if let Some(name) = &self.required_header {
            if !ctx.headers().has_value(name) {
                let err = RpcError::InvalidRequest(format!("missing required header '{}'", name));
                return self.render_error(&err).map(Some);
            }
        }

        let ctx = match forwarded_client(ctx.headers()) {
            Some(ip) => ctx.with_client_ip(Some(ip)),
            None => ctx,
        };

        let methods: Vec<String> = requests.iter().map(|r| r.method.clone()).collect();
        debug!(call_id = %ctx.call_id(), batch_size = methods.len(), "Supervising batch");

        let batch = self.supervisor.run(&ctx, requests).await;
        let suppressed = ctx.is_cancelled();
        let body = if suppressed {
            debug!(call_id = %ctx.call_id(), "Call cancelled, no body written");
            None
        } else {
            Some(self.assembler.assemble(&batch.responses)?)
        };

        if let Some(observer) = &self.observer {
            let summary = BatchSummary {
                methods,
                responses: batch.responses.len(),
                errors: batch.responses.iter().filter(|r| r.is_error()).count(),
                suppressed,
                elapsed: started.elapsed(),
            };
            let observer = observer.clone();
            let detached = batch.detached;
            tokio::spawn(async move {
                observer.on_batch_complete(detached, summary).await;
            });
        }

        Ok(body)
    }

    /// Single classified error body with `id: null`, for failures that
    /// happen before or outside the pipeline.
    pub fn render_error(&self, err: &RpcError) -> Result<Vec<u8>> {
        self.assembler.render_error(err)
    }
}

impl std::fmt::Debug for RpcPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcPipeline")
            .field("supervisor", &self.supervisor)
            .field("required_header", &self.required_header)
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

/// Startup-time configuration for [`RpcPipeline`]
pub struct RpcPipelineBuilder {
    registry: Arc<MethodRegistry>,
    catalog: MessageCatalog,
    required_header: Option<String>,
    observer: Option<Arc<dyn BatchObserver>>,
}

impl RpcPipelineBuilder {
    pub fn catalog(mut self, catalog: MessageCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// `None` disables the header check.
    pub fn required_header(mut self, name: Option<String>) -> Self {
        self.required_header = name;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> RpcPipeline {
        let classifier = ErrorClassifier::new(self.catalog);
        RpcPipeline {
            supervisor: ExecutionSupervisor::new(Dispatcher::new(self.registry), classifier),
            assembler: ResponseAssembler::new(classifier),
            required_header: self.required_header,
            observer: self.observer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cancel::cancel_channel;
    use crate::domain::Headers;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    fn registry() -> Arc<MethodRegistry> {
        let mut builder = MethodRegistry::builder();
        builder.register_fn("getSuccess", |_ctx| async { Ok("ok") });
        Arc::new(builder.build())
    }

    fn ctx_with(headers: Headers) -> ExecutionContext {
        ExecutionContext::new(
            "call-1",
            Arc::new(headers),
            crate::application::cancel::CancelSignal::never(),
            Utc::now().into(),
        )
    }

    fn authorized() -> Headers {
        [("Authorization", "Bearer t")].into_iter().collect()
    }

    fn decode(body: Option<Vec<u8>>) -> Value {
        serde_json::from_slice(&body.expect("body")).unwrap()
    }

    #[tokio::test]
    async fn test_single_call() {
        let pipeline = RpcPipeline::builder(registry()).build();
        let body = pipeline
            .process(
                ctx_with(authorized()),
                br#"{"jsonrpc":"2.0","method":"getSuccess","params":{},"id":1}"#,
            )
            .await
            .unwrap();
        assert_eq!(decode(body), json!({"jsonrpc":"2.0","id":1,"result":"ok"}));
    }

    #[tokio::test]
    async fn test_missing_required_header() {
        let pipeline = RpcPipeline::builder(registry()).build();
        let body = pipeline
            .process(
                ctx_with(Headers::new()),
                br#"{"jsonrpc":"2.0","method":"getSuccess","id":1}"#,
            )
            .await
            .unwrap();
        let body = decode(body);
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["code"], json!(-32600));
    }

    #[tokio::test]
    async fn test_header_check_can_be_disabled() {
        let pipeline = RpcPipeline::builder(registry())
            .required_header(None)
            .build();
        let body = pipeline
            .process(
                ctx_with(Headers::new()),
                br#"{"jsonrpc":"2.0","method":"getSuccess","id":1}"#,
            )
            .await
            .unwrap();
        assert_eq!(decode(body)["result"], json!("ok"));
    }

    #[tokio::test]
    async fn test_parse_failure_is_single_error() {
        let pipeline = RpcPipeline::builder(registry()).build();
        let body = decode(pipeline.process(ctx_with(authorized()), b"[]").await.unwrap());
        assert_eq!(body["error"]["code"], json!(-32700));
        assert_eq!(body["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_cancelled_call_writes_nothing() {
        let (source, signal) = cancel_channel();
        let ctx = ctx_with(authorized()).with_cancel(signal);
        source.cancel();

        let pipeline = RpcPipeline::builder(registry()).build();
        let body = pipeline
            .process(ctx, br#"{"jsonrpc":"2.0","method":"getSuccess","id":1}"#)
            .await
            .unwrap();
        assert!(body.is_none());
    }

    struct Recorder(mpsc::UnboundedSender<(ExecutionContext, BatchSummary)>);

    #[async_trait]
    impl BatchObserver for Recorder {
        async fn on_batch_complete(&self, ctx: ExecutionContext, summary: BatchSummary) {
            let _ = self.0.send((ctx, summary));
        }
    }

    #[tokio::test]
    async fn test_observer_receives_detached_context() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pipeline = RpcPipeline::builder(registry())
            .observer(Arc::new(Recorder(tx)))
            .build();

        let mut headers = authorized();
        headers.append("X-Forwarded-For", "198.51.100.4, 192.0.2.1");
        let (source, signal) = cancel_channel();
        let ctx = ctx_with(headers).with_cancel(signal);

        pipeline
            .process(
                ctx,
                br#"[{"jsonrpc":"2.0","method":"getSuccess","id":1},{"jsonrpc":"2.0","method":"nope","id":2}]"#,
            )
            .await
            .unwrap();
        drop(source);

        let (detached, summary) = rx.recv().await.unwrap();
        assert!(!detached.is_cancelled());
        assert_eq!(detached.client_ip(), Some("192.0.2.1"));
        assert_eq!(summary.methods, ["getSuccess", "nope"]);
        assert_eq!(summary.responses, 2);
        assert_eq!(summary.errors, 1);
        assert!(!summary.suppressed);
    }
}
