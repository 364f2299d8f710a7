//! Top-level error type for the `serial-transport` binary.

use crate::config::ConfigError;
use crate::port::PortError;
use thiserror::Error;

/// A specialized `Result` type for command handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error type.
///
/// Library callers normally deal with `PortError` or `ConfigError` directly;
/// this wraps both for the command-line front end.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A required argument was neither given nor configured.
    #[error("{0}")]
    Usage(String),

    #[error("An I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("A serialization error occurred: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AppError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }
}
