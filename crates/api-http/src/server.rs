//! HTTP Server
//!
//! Accept loop over a TCP listener; every connection is served by hyper's
//! HTTP/1.1 builder and tracked for graceful shutdown.

use crate::error::{Result, ServerError};
use crate::handler::RpcHttpHandler;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use rpcgate_core::application::CancelSignal;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Pause after an accept failure that is not tied to a single peer
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// JSON-RPC HTTP server
pub struct HttpServer {
    handler: Arc<RpcHttpHandler>,
    shutdown_grace: Duration,
}

impl HttpServer {
    pub fn new(handler: RpcHttpHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// How long open connections may run once shutdown starts
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Serve connections from `listener` until `shutdown` fires, then give
    /// in-flight connections the grace period to finish.
    pub async fn serve(self, listener: TcpListener, shutdown: CancelSignal) -> Result<()> {
        let local = local_addr(&listener)?;
        info!(addr = %local, "JSON-RPC HTTP server listening");

        let graceful = GracefulShutdown::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) if is_connection_error(&e) => {
                            debug!(error = %e, "Connection dropped before accept");
                            continue;
                        }
                        Err(e) => {
                            // e.g. EMFILE
                            warn!(error = %e, backoff_ms = ACCEPT_BACKOFF.as_millis() as u64, "Failed to accept connection");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };
                    debug!(peer = %peer, "Connection accepted");

                    let handler = self.handler.clone();
                    let service = service_fn(move |req: Request<Incoming>| {
                        let handler = handler.clone();
                        async move { Ok::<_, Infallible>(handler.handle(req, Some(peer)).await) }
                    });

                    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                    let conn = graceful.watch(conn);
                    tokio::spawn(async move {
                        if let Err(e) = conn.await {
                            error!(peer = %peer, error = %e, "Error serving connection");
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        drop(listener);
        tokio::select! {
            _ = graceful.shutdown() => info!("All connections closed"),
            _ = tokio::time::sleep(self.shutdown_grace) => {
                warn!(grace_secs = self.shutdown_grace.as_secs(), "Grace period elapsed with connections still open");
            }
        }
        Ok(())
    }
}

/// Errors that only concern the peer being accepted
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// Bind a TCP listener, mapping failures to [`ServerError::Bind`].
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::bind(addr, e))
}

/// Address a bound listener ended up on (useful with port 0)
pub fn local_addr(listener: &TcpListener) -> Result<SocketAddr> {
    listener.local_addr().map_err(ServerError::LocalAddr)
}
