//! Platform backends and backend selection.
//!
//! `Backend` is the tagged dispatch over the three OS strategies. It is picked
//! once per `SerialPort` by [`select_backend`], which reports any downgrade to
//! the shell-based Windows path through an explicit [`FallbackNotice`].

mod unix;
mod windows_shell;

#[cfg(all(windows, feature = "native-windows"))]
mod windows_native;

pub use unix::UnixBackend;
pub use windows_shell::{ModeArgs, WindowsShellBackend};

#[cfg(all(windows, feature = "native-windows"))]
pub use windows_native::{NativeHandle, WindowsNativeBackend};

use super::configuration::Configuration;
use super::device::DeviceFamily;
use super::error::{PortError, ValidationError};
use super::traits::PlatformBackend;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::str::FromStr;
use tracing::{debug, warn};

/// OS family the process is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    /// Linux, macOS and the BSDs.
    Unix,
    Windows,
}

impl PlatformFamily {
    /// Detect the host family.
    pub fn detect() -> Result<Self, PortError> {
        if cfg!(windows) {
            Ok(Self::Windows)
        } else if cfg!(unix) {
            Ok(Self::Unix)
        } else {
            Err(PortError::UnsupportedPlatform(std::env::consts::OS.to_string()))
        }
    }

    /// Device naming convention used on this family.
    pub fn device_family(self) -> DeviceFamily {
        match self {
            Self::Unix => DeviceFamily::Unix,
            Self::Windows => DeviceFamily::Windows,
        }
    }
}

/// Which Windows backend the caller would like.
///
/// Ignored on Unix, where there is only one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Native API when available, `mode` command otherwise.
    #[default]
    Auto,
    /// Same as `Auto`, but states the intent explicitly.
    Native,
    /// Always use the `mode` command backend.
    Shell,
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" => Ok(Self::Native),
            "shell" | "mode" => Ok(Self::Shell),
            _ => Err(format!(
                "Unknown backend: {s}. Use 'auto', 'native' or 'shell'"
            )),
        }
    }
}

/// Identifies a `Backend` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Unix,
    WindowsShell,
    WindowsNative,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => write!(f, "unix (stty)"),
            Self::WindowsShell => write!(f, "windows (mode command)"),
            Self::WindowsNative => write!(f, "windows (native API)"),
        }
    }
}

/// Reported when the native Windows backend could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackNotice {
    /// What the caller asked for.
    pub requested: BackendPreference,
    /// What was selected instead.
    pub selected: BackendKind,
    /// Why the native backend was unavailable.
    pub reason: String,
}

impl fmt::Display for FallbackNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "native Windows serial API unavailable ({}); using {} instead. \
             Baud rate changes made through `mode` may not take effect reliably.",
            self.reason, self.selected
        )
    }
}

/// Result of [`select_backend`].
#[derive(Debug)]
pub struct BackendSelection {
    pub backend: Backend,
    /// Present only when the preferred backend had to be downgraded.
    pub notice: Option<FallbackNotice>,
}

/// Pick the backend for `family`.
///
/// A downgrade is logged once here and returned to the caller; nothing is
/// remembered process-wide.
pub fn select_backend(family: PlatformFamily, preference: BackendPreference) -> BackendSelection {
    match family {
        PlatformFamily::Unix => {
            if preference != BackendPreference::Auto {
                debug!(?preference, "backend preference ignored on unix");
            }
            BackendSelection {
                backend: Backend::Unix(UnixBackend::new()),
                notice: None,
            }
        }
        PlatformFamily::Windows => match preference {
            BackendPreference::Shell => BackendSelection {
                backend: Backend::WindowsShell(WindowsShellBackend::new()),
                notice: None,
            },
            BackendPreference::Auto | BackendPreference::Native => match native_backend() {
                Ok(backend) => BackendSelection {
                    backend,
                    notice: None,
                },
                Err(reason) => {
                    let notice = FallbackNotice {
                        requested: preference,
                        selected: BackendKind::WindowsShell,
                        reason,
                    };
                    warn!("{notice}");
                    BackendSelection {
                        backend: Backend::WindowsShell(WindowsShellBackend::new()),
                        notice: Some(notice),
                    }
                }
            },
        },
    }
}

/// Probe for the direct Win32 comm API.
fn native_backend() -> Result<Backend, String> {
    #[cfg(all(windows, feature = "native-windows"))]
    {
        Ok(Backend::WindowsNative(WindowsNativeBackend::new()))
    }

    #[cfg(all(windows, not(feature = "native-windows")))]
    {
        Err("built without the `native-windows` feature".to_string())
    }

    #[cfg(not(windows))]
    {
        Err("the Win32 comm API only exists on Windows hosts".to_string())
    }
}

/// Tagged dispatch over the platform backends.
#[derive(Debug)]
pub enum Backend {
    Unix(UnixBackend),
    WindowsShell(WindowsShellBackend),
    #[cfg(all(windows, feature = "native-windows"))]
    WindowsNative(WindowsNativeBackend),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Unix(_) => BackendKind::Unix,
            Self::WindowsShell(_) => BackendKind::WindowsShell,
            #[cfg(all(windows, feature = "native-windows"))]
            Self::WindowsNative(_) => BackendKind::WindowsNative,
        }
    }
}

/// Open device owned by a `Backend`.
#[derive(Debug)]
pub enum DeviceHandle {
    File(File),
    #[cfg(all(windows, feature = "native-windows"))]
    Native(NativeHandle),
}

#[cfg(all(windows, feature = "native-windows"))]
fn foreign_handle() -> PortError {
    PortError::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        "handle was not opened by this backend",
    ))
}

impl PlatformBackend for Backend {
    type Handle = DeviceHandle;

    fn validate_device(&self, device: &str) -> Result<(), ValidationError> {
        match self {
            Self::Unix(b) => b.validate_device(device),
            Self::WindowsShell(b) => b.validate_device(device),
            #[cfg(all(windows, feature = "native-windows"))]
            Self::WindowsNative(b) => b.validate_device(device),
        }
    }

    fn configure(&mut self, device: &str, config: &Configuration) -> Result<(), PortError> {
        match self {
            Self::Unix(b) => b.configure(device, config),
            Self::WindowsShell(b) => b.configure(device, config),
            #[cfg(all(windows, feature = "native-windows"))]
            Self::WindowsNative(b) => b.configure(device, config),
        }
    }

    fn open(&mut self, device: &str) -> Result<DeviceHandle, PortError> {
        match self {
            Self::Unix(b) => b.open(device).map(DeviceHandle::File),
            Self::WindowsShell(b) => b.open(device).map(DeviceHandle::File),
            #[cfg(all(windows, feature = "native-windows"))]
            Self::WindowsNative(b) => b.open(device).map(DeviceHandle::Native),
        }
    }

    fn close(&mut self, handle: DeviceHandle) {
        match (self, handle) {
            (Self::Unix(b), DeviceHandle::File(file)) => b.close(file),
            (Self::WindowsShell(b), DeviceHandle::File(file)) => b.close(file),
            #[cfg(all(windows, feature = "native-windows"))]
            (Self::WindowsNative(b), DeviceHandle::Native(native)) => b.close(native),
            #[cfg(all(windows, feature = "native-windows"))]
            (_, handle) => drop(handle),
        }
    }

    fn write(&mut self, handle: &mut DeviceHandle, data: &[u8]) -> Result<usize, PortError> {
        match (self, handle) {
            (Self::Unix(b), DeviceHandle::File(file)) => b.write(file, data),
            (Self::WindowsShell(b), DeviceHandle::File(file)) => b.write(file, data),
            #[cfg(all(windows, feature = "native-windows"))]
            (Self::WindowsNative(b), DeviceHandle::Native(native)) => b.write(native, data),
            #[cfg(all(windows, feature = "native-windows"))]
            _ => Err(foreign_handle()),
        }
    }

    fn read(&mut self, handle: &mut DeviceHandle, max_len: usize) -> Result<Vec<u8>, PortError> {
        match (self, handle) {
            (Self::Unix(b), DeviceHandle::File(file)) => b.read(file, max_len),
            (Self::WindowsShell(b), DeviceHandle::File(file)) => b.read(file, max_len),
            #[cfg(all(windows, feature = "native-windows"))]
            (Self::WindowsNative(b), DeviceHandle::Native(native)) => b.read(native, max_len),
            #[cfg(all(windows, feature = "native-windows"))]
            _ => Err(foreign_handle()),
        }
    }
}

// ---- helpers shared by the file-based backends ----

/// Open `path` read/write so that reads return immediately.
#[cfg(unix)]
pub(crate) fn open_nonblocking(path: &str) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(path)
}

/// Open `path` read/write, unshared, with "return immediately" read timeouts.
#[cfg(windows)]
pub(crate) fn open_nonblocking(path: &str) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .share_mode(0)
        .open(path)?;
    set_immediate_timeouts(&file)?;
    Ok(file)
}

#[cfg(not(any(unix, windows)))]
pub(crate) fn open_nonblocking(path: &str) -> io::Result<File> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot open {path}: unsupported platform"),
    ))
}

/// ReadIntervalTimeout = MAXDWORD with zero totals makes ReadFile return
/// whatever is buffered without waiting.
#[cfg(windows)]
fn set_immediate_timeouts(file: &File) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;
    use winapi::um::commapi::SetCommTimeouts;
    use winapi::um::winbase::COMMTIMEOUTS;
    use winapi::um::winnt::{HANDLE, MAXDWORD};

    let mut timeouts = COMMTIMEOUTS {
        ReadIntervalTimeout: MAXDWORD,
        ReadTotalTimeoutMultiplier: 0,
        ReadTotalTimeoutConstant: 0,
        WriteTotalTimeoutMultiplier: 0,
        WriteTotalTimeoutConstant: 0,
    };

    // SAFETY: the handle is owned by `file` and outlives the call.
    if unsafe { SetCommTimeouts(file.as_raw_handle() as HANDLE, &mut timeouts) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Single non-blocking read; "no data" is an empty vector.
pub(crate) fn read_available(file: &mut File, max_len: usize) -> Result<Vec<u8>, PortError> {
    let mut buffer = vec![0u8; max_len];
    match file.read(&mut buffer) {
        Ok(n) => {
            buffer.truncate(n);
            Ok(buffer)
        }
        Err(e) if is_no_data(&e) => Ok(Vec::new()),
        Err(e) => Err(PortError::Io(e)),
    }
}

/// Single non-blocking write; a full transmit buffer counts as 0 bytes written.
pub(crate) fn write_available(file: &mut File, data: &[u8]) -> Result<usize, PortError> {
    match file.write(data) {
        Ok(n) => Ok(n),
        Err(e) if is_no_data(&e) => Ok(0),
        Err(e) => Err(PortError::Io(e)),
    }
}

fn is_no_data(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}
