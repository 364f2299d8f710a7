//! Serial port layer.
//!
//! `Configuration` holds validated line settings, `backend` holds the per-OS
//! `PlatformBackend` implementations, and `SerialPort` drives one of them
//! through the open/read/write/close lifecycle.

pub mod backend;
pub mod configuration;
pub mod device;
pub mod discovery;
pub mod error;
pub mod mock;
pub mod serial_port;
pub mod traits;

pub use backend::{
    select_backend, Backend, BackendKind, BackendPreference, BackendSelection, DeviceHandle,
    FallbackNotice, ModeArgs, PlatformFamily, UnixBackend, WindowsShellBackend,
};
#[cfg(all(windows, feature = "native-windows"))]
pub use backend::{NativeHandle, WindowsNativeBackend};
pub use configuration::{Configuration, Parity};
pub use device::DeviceFamily;
pub use discovery::{list_devices, DeviceInfo, DeviceKind};
pub use error::{PortError, ValidationError};
pub use mock::{MockBackend, MockCall, MockHandle};
pub use serial_port::{SerialPort, DEFAULT_READ_LENGTH, DEFAULT_READ_LINE_TIMEOUT};
pub use traits::PlatformBackend;
