//! Serial Transport Library
//!
//! Raw byte transport over serial devices on Unix and Windows: validated line
//! settings, allow-listed device names, per-OS backends and a timeout-bounded
//! line reader.
//!
//! # Modules
//!
//! - `port`: `Configuration`, the platform backends and `SerialPort`
//! - `config`: Configuration management with TOML support
//! - `logging`: `tracing-subscriber` setup for applications
//! - `error`: Unified error handling for the binary
//!
//! # Example
//!
//! ```no_run
//! use serial_transport::{Configuration, Parity, SerialPort};
//! use std::time::Duration;
//!
//! let config = Configuration::new(9600, 8, Parity::None, 1)?;
//! let mut port = SerialPort::new("/dev/ttyACM0", config)?;
//! port.open()?;
//! port.write(b"LED_ON\n")?;
//! let reply = port.read_line(Duration::from_secs(2))?;
//! println!("{}", String::from_utf8_lossy(&reply));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod port;

// Re-export commonly used types for convenience
pub use error::{AppError, AppResult};
pub use port::{
    list_devices, Backend, BackendKind, BackendPreference, Configuration, DeviceInfo,
    FallbackNotice, MockBackend, Parity, PlatformBackend, PortError, SerialPort, ValidationError,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
