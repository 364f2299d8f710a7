//! Core trait for platform backends.
//!
//! Defines the `PlatformBackend` trait that lets the OS-specific backends and
//! the in-memory mock be driven interchangeably by `SerialPort`.

use super::configuration::Configuration;
use super::error::{PortError, ValidationError};

/// OS-specific strategy for configuring and talking to a serial device.
///
/// Implementations own no device state beyond what `configure` must hand to
/// `open`; the open device lives in [`PlatformBackend::Handle`], which the
/// caller owns exclusively until it gives it back through `close`. Handles
/// release their OS resource when dropped, so a handle lost on an error path
/// is still closed.
pub trait PlatformBackend: Send + std::fmt::Debug {
    /// Open device resource returned by `open`.
    type Handle: Send;

    /// Check the device name against this backend's allow-list.
    ///
    /// Must run before the name is embedded in any process argument or API
    /// call.
    fn validate_device(&self, device: &str) -> Result<(), ValidationError>;

    /// Apply line parameters for `device`.
    ///
    /// Fails with [`PortError::Validation`] for a rejected device name and
    /// [`PortError::Configuration`] when the OS reports a failure.
    fn configure(&mut self, device: &str, config: &Configuration) -> Result<(), PortError>;

    /// Open the device for reading and writing.
    fn open(&mut self, device: &str) -> Result<Self::Handle, PortError>;

    /// Release the handle. Never fails observably.
    fn close(&mut self, handle: Self::Handle);

    /// Write bytes, returning how many the OS accepted.
    fn write(&mut self, handle: &mut Self::Handle, data: &[u8]) -> Result<usize, PortError>;

    /// Read whatever is immediately available, up to `max_len` bytes.
    ///
    /// Returns an empty vector when nothing is available. Must not block
    /// beyond the backend's own short OS-level timeout.
    fn read(&mut self, handle: &mut Self::Handle, max_len: usize) -> Result<Vec<u8>, PortError>;
}
