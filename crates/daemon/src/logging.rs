// Logging setup (tracing-subscriber)

use crate::config::LoggerConfig;
use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins over these when set
pub fn default_directive(logger: &LoggerConfig) -> &'static str {
    if logger.debug {
        "rpcgate=debug"
    } else {
        "rpcgate=info"
    }
}

pub fn init(logger: &LoggerConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(logger)))
        .context("invalid log filter")?;

    if logger.log_json {
        // Production: JSON structured logging
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init()
            .context("failed to install JSON subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .try_init()
            .context("failed to install subscriber")?;
    }
    Ok(())
}
