//! Logging setup
//!
//! The broker logs through `tracing`. A broker owns a root span carrying its
//! name; its own events and each controller's events are emitted inside
//! child spans tagged with a `caller` field.

use tracing::{info_span, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogConfig, LogFormat};
use crate::error::{Error, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::ConfigError(format!("invalid log level {}: {}", config.level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .try_init(),
    };

    installed.map_err(|e| Error::ConfigError(format!("failed to install subscriber: {}", e)))
}

/// Root span for a broker
pub fn broker_span(name: &str) -> Span {
    info_span!("operator", name = %name)
}

/// Child span carrying a `caller` tag
pub fn child_span(parent: &Span, caller: &str) -> Span {
    info_span!(parent: parent, "component", caller = %caller)
}

