//! Configuration for the `serial-transport` binary.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERIAL_TRANSPORT_CONFIG` environment variable (explicit path)
//! 2. `./config.toml` (current directory)
//! 3. `serial-transport/config.toml` under the platform config directory
//!    (`~/.config` on Linux, `Application Support` on macOS, `%APPDATA%` on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `SERIAL_TRANSPORT_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SERIAL_TRANSPORT_SERIAL_DEVICE=/dev/ttyACM0`
//! - `SERIAL_TRANSPORT_SERIAL_BAUD_RATE=9600`
//! - `SERIAL_TRANSPORT_SERIAL_BACKEND=shell`
//! - `SERIAL_TRANSPORT_LOGGING_LEVEL=debug`
//!
//! `SERIAL_PORT` is also read as the device when the prefixed variable is unset.
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_transport::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Device: {:?}", config.serial.resolve_device());
//! println!("Line: {}", config.serial.configuration()?);
//! # Ok::<(), serial_transport::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig};
