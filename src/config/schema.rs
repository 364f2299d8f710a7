//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::port::{BackendPreference, Configuration, Parity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line configuration
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Serial port configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device to use when none is given on the command line
    pub device: Option<String>,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    /// Default `read_line` timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Windows backend preference: "auto", "native" or "shell"
    pub backend: BackendPreference,
    /// Port aliases for convenience
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: None,
            baud_rate: 115200,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            read_timeout_ms: 1000,
            backend: BackendPreference::Auto,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// Validated line settings from this section.
    pub fn configuration(&self) -> ConfigResult<Configuration> {
        Configuration::new(self.baud_rate, self.data_bits, self.parity, self.stop_bits)
            .map_err(ConfigError::line)
    }

    /// Get the read timeout as Duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// The configured device, alias-resolved.
    pub fn resolve_device(&self) -> Option<String> {
        self.device.as_deref().map(|d| self.resolve_port(d))
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive, e.g. "info" or "serial_transport=debug"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            _ => Err(format!(
                "Invalid log format: {s}. Use 'pretty', 'compact' or 'json'"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ValidationError;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.read_timeout(), Duration::from_millis(1000));
        assert_eq!(config.serial.backend, BackendPreference::Auto);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_port_alias_resolution() {
        let mut config = SerialConfig::default();
        config
            .port_aliases
            .insert("arduino".to_string(), "COM3".to_string());

        assert_eq!(config.resolve_port("arduino"), "COM3");
        assert_eq!(config.resolve_port("COM5"), "COM5");

        config.device = Some("arduino".to_string());
        assert_eq!(config.resolve_device().as_deref(), Some("COM3"));
    }

    #[test]
    fn test_configuration_is_validated() {
        let mut serial = SerialConfig::default();
        assert_eq!(
            serial.configuration().unwrap(),
            Configuration::new(115200, 8, Parity::None, 1).unwrap()
        );

        serial.data_bits = 9;
        match serial.configuration().unwrap_err() {
            ConfigError::Line { key, source } => {
                assert_eq!(key, "serial.data_bits");
                assert_eq!(source, ValidationError::DataBits(9));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[serial]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [serial]
            device = "/dev/ttyACM0"
            baud_rate = 9600
            parity = "even"
            backend = "shell"

            [logging]
            format = "json"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.serial.device.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.serial.backend, BackendPreference::Shell);
        assert_eq!(config.logging.format, LogFormat::Json);
        // Defaults should still work
        assert_eq!(config.serial.data_bits, 8);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
