//! Port-specific error types.
//!
//! `ValidationError` covers everything rejected before the OS is touched
//! (line parameters and device names). `PortError` is what every backend and
//! the `SerialPort` orchestrator return.

use super::device::DeviceFamily;
use thiserror::Error;

/// A line parameter or device name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Baud rate is not one of the standard rates.
    #[error("Invalid baud rate: {0}")]
    BaudRate(u32),

    /// Data bits outside 5..=8.
    #[error("Invalid data bits: {0}")]
    DataBits(u8),

    /// Parity name not recognised.
    #[error("Invalid parity: {0}")]
    Parity(String),

    /// Stop bits other than 1 or 2.
    #[error("Invalid stop bits: {0}")]
    StopBits(u8),

    /// Device name does not match the platform allow-list.
    #[error("Invalid {family} device name: {device} (expected format: {expected})")]
    Device {
        family: DeviceFamily,
        device: String,
        expected: &'static str,
    },
}

impl ValidationError {
    /// Name of the rejected field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::BaudRate(_) => "baud_rate",
            Self::DataBits(_) => "data_bits",
            Self::Parity(_) => "parity",
            Self::StopBits(_) => "stop_bits",
            Self::Device { .. } => "device",
        }
    }
}

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// Rejected before any OS interaction.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The OS line-setup call failed.
    #[error("Failed to configure serial port {device}: {message}")]
    Configuration { device: String, message: String },

    /// The device could not be opened.
    #[error("Failed to open serial port {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: std::io::Error,
    },

    /// Attempted to open a port that's already open.
    #[error("Serial port is already open")]
    AlreadyOpen,

    /// Attempted to use a port that's not open.
    #[error("Serial port is not open")]
    NotOpen,

    /// An I/O error occurred on an open handle.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The host OS family has no backend.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Listing the system's serial devices failed.
    #[error("Serial port enumeration failed: {0}")]
    Enumeration(#[from] serialport::Error),
}

impl PortError {
    /// Create a Configuration error carrying the OS diagnostic text.
    pub fn configuration(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Create an Open error for a device.
    pub fn open(device: impl Into<String>, source: std::io::Error) -> Self {
        Self::Open {
            device: device.into(),
            source,
        }
    }

    /// Whether this error was raised before touching the OS.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
