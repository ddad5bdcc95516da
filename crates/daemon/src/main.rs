//! rpcgate - Main Entry Point
//! JSON-RPC 2.0 over a single HTTP endpoint

mod config;
mod logging;

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::AppConfig;
use rpcgate_api_http::server::bind;
use rpcgate_api_http::{build_registry, AccessLog, CorsPolicy, HttpServer, RpcHttpHandler};
use rpcgate_core::application::{cancel_channel, RpcPipeline, SuccessService};
use rpcgate_core::domain::MessageCatalog;
use rpcgate_core::port::{LocalClock, UuidProvider};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration (logging depends on it)
    let config = AppConfig::load()?;

    // 2. Initialize logging
    logging::init(&config.logger)?;
    info!(
        version = VERSION,
        environment = %config.environment,
        "rpcgate starting..."
    );

    // 3. Locale, fixed for the life of the process
    let clock = LocalClock::from_hours(config.locale.utc_offset_hours)
        .ok_or_else(|| anyhow!("unsupported UTC offset {}", config.locale.utc_offset_hours))?;
    let catalog = MessageCatalog::new(config.locale.language);

    // 4. Method table and pipeline (DI wiring)
    let registry = Arc::new(build_registry(Arc::new(SuccessService::new())));
    info!(methods = ?registry.names(), "Methods registered");

    let pipeline = RpcPipeline::builder(registry)
        .catalog(catalog)
        .required_header(config.auth.required_header())
        .observer(Arc::new(AccessLog))
        .build();

    let cors = CorsPolicy::new(&config.http.cors).context("invalid http.cors")?;
    let handler = RpcHttpHandler::new(
        Arc::new(pipeline),
        cors,
        Arc::new(clock),
        Arc::new(UuidProvider),
    )
    .with_timeout(Duration::from_secs(config.http.request_timeout_secs))
    .with_max_body_bytes(config.http.max_body_bytes);

    // 5. Start HTTP server
    let listener = bind(&config.bind_addr()).await?;
    let (shutdown_tx, shutdown_rx) = cancel_channel();
    let server = HttpServer::new(handler)
        .with_shutdown_grace(Duration::from_secs(config.http.shutdown_grace_secs));
    let server_handle = tokio::spawn(server.serve(listener, shutdown_rx));

    info!("System ready. Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    wait_for_shutdown().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    shutdown_tx.cancel();
    server_handle.await.context("server task failed")??;

    info!("Shutdown complete.");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
