//! Structured logging setup.
//!
//! The library only emits `tracing` events; installing a subscriber is
//! the embedding application's call. [`init_logging`] is the stock setup
//! driven by [`LoggingConfig`]. `RUST_LOG` overrides the configured level.

use crate::config::LoggingConfig;
use crate::error::{Result, WireError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter from `RUST_LOG`, falling back to the configured level
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.as_str().to_lowercase()))
        .map_err(|e| WireError::ConfigError(format!("Invalid log filter: {e}")))
}

/// Install a global fmt subscriber, plain or JSON.
///
/// # Errors
/// `ConfigError` if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json_format {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.show_target),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(config.show_target))
            .try_init()
    };
    installed.map_err(|e| WireError::ConfigError(format!("Failed to install subscriber: {e}")))?;

    tracing::info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
