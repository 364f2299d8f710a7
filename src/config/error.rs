//! Errors raised while loading, validating or saving configuration.

use crate::port::ValidationError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file named explicitly does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse configuration file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write configuration file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `[serial]` holds a line setting the port would reject.
    #[error("Invalid line setting '{key}': {source}")]
    Line {
        key: String,
        #[source]
        source: ValidationError,
    },

    /// A `SERIAL_TRANSPORT_*` override could not be parsed.
    #[error("Invalid value {value:?} in {var}: {message}")]
    EnvOverride {
        var: String,
        value: String,
        message: String,
    },

    /// `save` on a loader that was not loaded from a file.
    #[error("No configuration file to save to; use save_to")]
    NoSavePath,
}

impl ConfigError {
    /// Wrap a rejected line setting under its `serial.*` key.
    pub fn line(source: ValidationError) -> Self {
        Self::Line {
            key: format!("serial.{}", source.field()),
            source,
        }
    }

    pub(crate) fn env_override(
        var: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::EnvOverride {
            var: var.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// The setting or variable this error is about, when there is one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Line { key, .. } => Some(key),
            Self::EnvOverride { var, .. } => Some(var),
            _ => None,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_line_error_keeps_the_rejected_value() {
        let err = ConfigError::line(ValidationError::StopBits(3));

        assert_eq!(err.key(), Some("serial.stop_bits"));
        assert_eq!(
            err.to_string(),
            "Invalid line setting 'serial.stop_bits': Invalid stop bits: 3"
        );
        let source = err
            .source()
            .and_then(|s| s.downcast_ref::<ValidationError>())
            .unwrap();
        assert_eq!(*source, ValidationError::StopBits(3));
    }

    #[test]
    fn test_env_override_names_variable_and_value() {
        let err = ConfigError::env_override(
            "SERIAL_TRANSPORT_SERIAL_BAUD_RATE",
            "fast",
            "not a number",
        );
        assert_eq!(err.key(), Some("SERIAL_TRANSPORT_SERIAL_BAUD_RATE"));
        assert_eq!(
            err.to_string(),
            "Invalid value \"fast\" in SERIAL_TRANSPORT_SERIAL_BAUD_RATE: not a number"
        );
        assert_eq!(ConfigError::NoSavePath.key(), None);
    }
}
