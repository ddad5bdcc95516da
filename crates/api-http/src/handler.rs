//! HTTP Request Handler
//!
//! One call per HTTP request: preflight and method checks, body collection,
//! then the pipeline on its own task raced against the call deadline.

use crate::headers::{preflight_allowed, CorsPolicy};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use rpcgate_core::application::parser::forwarded_client;
use rpcgate_core::application::{cancel_channel, ExecutionContext, RpcPipeline};
use rpcgate_core::domain::Headers;
use rpcgate_core::port::{IdProvider, TimeProvider};
use rpcgate_core::RpcError;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info_span, warn, Instrument};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared per-server state; cloned into every connection
pub struct RpcHttpHandler {
    pipeline: Arc<RpcPipeline>,
    cors: CorsPolicy,
    timeout: Duration,
    max_body_bytes: usize,
    clock: Arc<dyn TimeProvider>,
    ids: Arc<dyn IdProvider>,
}

impl RpcHttpHandler {
    pub fn new(
        pipeline: Arc<RpcPipeline>,
        cors: CorsPolicy,
        clock: Arc<dyn TimeProvider>,
        ids: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            pipeline,
            cors,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            clock,
            ids,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bodies larger than this are answered with `InvalidRequest` unread.
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    pub async fn handle<B>(&self, req: Request<B>, peer: Option<SocketAddr>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        match *req.method() {
            Method::POST => {}
            Method::OPTIONS => {
                let status = if preflight_allowed(req.headers()) {
                    StatusCode::NO_CONTENT
                } else {
                    StatusCode::BAD_REQUEST
                };
                return self.respond(status, Bytes::new());
            }
            _ => return self.respond(StatusCode::METHOD_NOT_ALLOWED, Bytes::new()),
        }

        let headers = Arc::new(to_headers(req.headers()));
        let client_ip = forwarded_client(&headers).or_else(|| peer.map(|p| p.ip().to_string()));
        let call_id = self.ids.generate_id();
        let span = info_span!(
            "rpc_call",
            call_id = %call_id,
            client_ip = client_ip.as_deref().unwrap_or("-")
        );

        let body = match Limited::new(req.into_body(), self.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let err = if e.downcast_ref::<LengthLimitError>().is_some() {
                    RpcError::InvalidRequest(format!(
                        "request body exceeds {} bytes",
                        self.max_body_bytes
                    ))
                } else {
                    RpcError::Internal(format!("failed to read request body: {}", e))
                };
                return span.in_scope(|| self.error_response(&err));
            }
        };

        let (cancel, signal) = cancel_channel();
        let ctx = ExecutionContext::new(call_id, headers, signal, self.clock.now())
            .with_client_ip(client_ip);

        let pipeline = self.pipeline.clone();
        let task = tokio::spawn(
            async move { pipeline.process(ctx, &body).await }.instrument(span.clone()),
        );

        // Dropping the handle on timeout detaches the task; it sees the
        // cancellation and its output is discarded.
        async {
            tokio::select! {
                joined = task => match joined {
                    Ok(Ok(Some(body))) => self.respond(StatusCode::OK, Bytes::from(body)),
                    Ok(Ok(None)) => self.respond(StatusCode::OK, Bytes::new()),
                    Ok(Err(err)) => self.error_response(&err),
                    Err(join_err) => {
                        let err = RpcError::Internal(format!("call task failed: {}", join_err));
                        self.error_response(&err)
                    }
                },
                _ = tokio::time::sleep(self.timeout) => {
                    cancel.cancel();
                    warn!(timeout_ms = self.timeout.as_millis() as u64, "Call exceeded its deadline");
                    let err = RpcError::Internal(format!("deadline of {:?} exceeded", self.timeout));
                    self.error_response(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn error_response(&self, err: &RpcError) -> Response<Full<Bytes>> {
        match self.pipeline.render_error(err) {
            Ok(body) => self.respond(StatusCode::OK, Bytes::from(body)),
            Err(render_err) => {
                error!(error = %render_err, "Failed to render error response");
                self.respond(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new())
            }
        }
    }

    fn respond(&self, status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        self.cors.apply(response.headers_mut());
        response
    }
}

/// Copy request headers into the pipeline's header map; values that are not
/// visible ASCII are dropped.
fn to_headers(map: &HeaderMap) -> Headers {
    map.iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header;
    use rpcgate_core::application::MethodRegistry;
    use rpcgate_core::port::LocalClock;
    use serde_json::{json, Value};

    struct FixedId;

    impl IdProvider for FixedId {
        fn generate_id(&self) -> String {
            "call-test".to_string()
        }
    }

    fn handler_with(registry: MethodRegistry) -> RpcHttpHandler {
        let pipeline = RpcPipeline::builder(Arc::new(registry)).build();
        RpcHttpHandler::new(
            Arc::new(pipeline),
            CorsPolicy::new("http://localhost:3000").unwrap(),
            Arc::new(LocalClock::from_hours(9).unwrap()),
            Arc::new(FixedId),
        )
    }

    fn handler() -> RpcHttpHandler {
        let mut builder = MethodRegistry::builder();
        builder
            .register_fn("getSuccess", |_ctx| async { Ok("ok") })
            .register_fn("slow", |ctx: ExecutionContext| async move {
                ctx.cancelled().await;
                Ok("late")
            });
        handler_with(builder.build())
    }

    fn post(body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .header(header::AUTHORIZATION, "Bearer t")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn json_body(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_post_dispatches() {
        let response = handler()
            .handle(
                post(r#"{"jsonrpc":"2.0","method":"getSuccess","params":{},"id":1}"#),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        assert_eq!(
            json_body(response).await,
            json!({"jsonrpc":"2.0","id":1,"result":"ok"})
        );
    }

    #[tokio::test]
    async fn test_preflight() {
        let allowed = Request::builder()
            .method(Method::OPTIONS)
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handler().handle(allowed, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );

        let rejected = Request::builder()
            .method(Method::OPTIONS)
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handler().handle(rejected, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_other_methods_not_allowed() {
        let req = Request::builder()
            .method(Method::PUT)
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handler().handle(req, None).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_answers_with_internal_error() {
        let handler = handler().with_timeout(Duration::from_millis(50));
        let response = handler
            .handle(post(r#"{"jsonrpc":"2.0","method":"slow","id":9}"#), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["code"], json!(-32603));
    }

    #[tokio::test]
    async fn test_oversized_body_is_invalid_request() {
        let handler = handler().with_max_body_bytes(16);
        let response = handler
            .handle(
                post(r#"{"jsonrpc":"2.0","method":"getSuccess","params":{},"id":1}"#),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["code"], json!(-32600));
        assert_eq!(body["error"]["data"], json!("request body exceeds 16 bytes"));
    }

    #[test]
    fn test_to_headers_lowercases_names() {
        let mut map = HeaderMap::new();
        map.insert(header::AUTHORIZATION, "Bearer t".parse().unwrap());
        map.append("x-forwarded-for", "10.0.0.1".parse().unwrap());
        let headers = to_headers(&map);
        assert_eq!(headers.get("Authorization"), Some("Bearer t"));
        assert_eq!(headers.get("X-Forwarded-For"), Some("10.0.0.1"));
    }
}
