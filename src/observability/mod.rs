//! # Observability Infrastructure
//!
//! Structured logging for the rotation handler: a `tracing-subscriber`
//! registry with an `EnvFilter` and either human-readable or JSON output.

pub mod logging;

pub use logging::log_config_info;

use crate::config::ObservabilityConfig;
use crate::errors::{Result, RotationError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| {
            RotationError::configuration(format!("Invalid log level '{}': {}", config.log_level, e))
        })?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json_logging {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(false),
            )
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(false)).try_init()
    };

    result.map_err(|e| RotationError::configuration(format!("Failed to install subscriber: {}", e)))
}
