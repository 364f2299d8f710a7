//! Logging setup for the `serial-transport` binary.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the application. `RUST_LOG`, when set, takes precedence over the
//! configured level.

use crate::config::{LogFormat, LoggingConfig};
use std::io;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Failed to install logger: {0}")]
    Init(String),
}

/// Filter from `RUST_LOG`, or from `level` when that is unset or unusable.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|source| LoggingError::Filter {
        filter: level.to_string(),
        source,
    })
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for command output.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(&config.level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| LoggingError::Init(e.to_string()))
}
