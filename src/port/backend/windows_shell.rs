//! Windows backend driven by the `mode` utility.
//!
//! This is the degraded path: `mode` is a separate process, some drivers
//! ignore the baud rate it sets, and reads are polled over a short window.
//! Used when the native backend is not compiled in, or when asked for.

use super::{open_nonblocking, read_available, write_available};
use crate::port::configuration::{Configuration, Parity, VALID_BAUD_RATES};
use crate::port::device::{win32_device_path, DeviceFamily};
use crate::port::error::{PortError, ValidationError};
use crate::port::traits::PlatformBackend;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Pause after `mode` succeeds before the port is opened.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// How long a single `read` waits for the first bytes to arrive.
pub const READ_POLL_WINDOW: Duration = Duration::from_millis(100);

/// `mode` ships as `System32\mode.com`; `Command` only appends `.exe` when
/// searching PATH for a bare name.
pub const MODE_PROGRAM: &str = "mode.com";

const READ_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Arguments for one `mode` invocation.
///
/// Every field is re-checked against an explicit allow-list here rather than
/// trusting the `Configuration` it came from, because the values are spliced
/// into `KEY=value` tokens that `mode` parses itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeArgs {
    device: String,
    baud: u32,
    parity: char,
    data_bits: u8,
    stop_bits: u8,
}

impl ModeArgs {
    pub fn new(device: &str, config: &Configuration) -> Result<Self, ValidationError> {
        DeviceFamily::Windows.validate(device)?;

        let baud = config.baud_rate();
        if baud == 0 || !VALID_BAUD_RATES.contains(&baud) {
            return Err(ValidationError::BaudRate(baud));
        }

        let data_bits = config.data_bits();
        if !(5..=8).contains(&data_bits) {
            return Err(ValidationError::DataBits(data_bits));
        }

        let stop_bits = config.stop_bits();
        if !matches!(stop_bits, 1 | 2) {
            return Err(ValidationError::StopBits(stop_bits));
        }

        let parity = match config.parity() {
            Parity::None => 'n',
            Parity::Odd => 'o',
            Parity::Even => 'e',
        };

        Ok(Self {
            device: device.to_string(),
            baud,
            parity,
            data_bits,
            stop_bits,
        })
    }

    /// argv for `mode`, e.g. `["COM3:", "BAUD=9600", "PARITY=n", "DATA=8", "STOP=1"]`.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            format!("{}:", self.device),
            format!("BAUD={}", self.baud),
            format!("PARITY={}", self.parity),
            format!("DATA={}", self.data_bits),
            format!("STOP={}", self.stop_bits),
        ]
    }
}

impl fmt::Display for ModeArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode {}", self.to_args().join(" "))
    }
}

/// Windows `PlatformBackend` using `mode` and a polled file handle.
#[derive(Debug, Clone)]
pub struct WindowsShellBackend {
    program: PathBuf,
    settle_delay: Duration,
    poll_window: Duration,
}

impl Default for WindowsShellBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowsShellBackend {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(MODE_PROGRAM),
            settle_delay: SETTLE_DELAY,
            poll_window: READ_POLL_WINDOW,
        }
    }

    /// Use a different `mode` binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Change how long `read` waits for data.
    pub fn with_poll_window(mut self, window: Duration) -> Self {
        self.poll_window = window;
        self
    }
}

impl PlatformBackend for WindowsShellBackend {
    type Handle = File;

    fn validate_device(&self, device: &str) -> Result<(), ValidationError> {
        DeviceFamily::Windows.validate(device)
    }

    fn configure(&mut self, device: &str, config: &Configuration) -> Result<(), PortError> {
        let mode = ModeArgs::new(device, config)?;
        debug!(command = %mode, "configuring line");

        let output = Command::new(&self.program)
            .args(mode.to_args())
            .output()
            .map_err(|e| {
                PortError::configuration(
                    device,
                    format!("failed to run {}: {e}", self.program.display()),
                )
            })?;

        if !output.status.success() {
            // `mode` reports its errors on stdout.
            let mut message = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                if !message.is_empty() {
                    message.push('\n');
                }
                message.push_str(stderr.trim());
            }
            if message.is_empty() {
                message = format!("mode exited with {}", output.status);
            }
            return Err(PortError::configuration(device, message));
        }

        thread::sleep(self.settle_delay);
        Ok(())
    }

    fn open(&mut self, device: &str) -> Result<File, PortError> {
        self.validate_device(device)?;

        let file =
            open_nonblocking(&win32_device_path(device)).map_err(|e| PortError::open(device, e))?;

        debug!(device, "opened");
        Ok(file)
    }

    fn close(&mut self, handle: File) {
        drop(handle);
        debug!("closed");
    }

    fn write(&mut self, handle: &mut File, data: &[u8]) -> Result<usize, PortError> {
        let written = write_available(handle, data)?;
        trace!(requested = data.len(), written, "write");
        Ok(written)
    }

    /// Poll until the first bytes arrive or the window closes.
    fn read(&mut self, handle: &mut File, max_len: usize) -> Result<Vec<u8>, PortError> {
        let deadline = Instant::now() + self.poll_window;
        loop {
            let data = read_available(handle, max_len)?;
            if !data.is_empty() {
                trace!(bytes = data.len(), "read");
                return Ok(data);
            }
            if max_len == 0 || Instant::now() >= deadline {
                return Ok(data);
            }
            thread::sleep(READ_POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_program_is_mode_com() {
        assert_eq!(WindowsShellBackend::new().program(), Path::new("mode.com"));
    }

    #[cfg(windows)]
    #[test]
    fn test_default_program_can_be_spawned() {
        let backend = WindowsShellBackend::new();
        let result = Command::new(backend.program()).arg("/?").output();
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[test]
    fn test_mode_args_default() {
        let mode = ModeArgs::new("COM3", &Configuration::default()).unwrap();
        assert_eq!(
            mode.to_args(),
            vec!["COM3:", "BAUD=9600", "PARITY=n", "DATA=8", "STOP=1"]
        );
        assert_eq!(mode.to_string(), "mode COM3: BAUD=9600 PARITY=n DATA=8 STOP=1");
    }

    #[test]
    fn test_mode_args_7e2() {
        let config = Configuration::new(115200, 7, Parity::Even, 2).unwrap();
        let mode = ModeArgs::new("com12", &config).unwrap();
        assert_eq!(
            mode.to_args(),
            vec!["com12:", "BAUD=115200", "PARITY=e", "DATA=7", "STOP=2"]
        );
    }

    #[test]
    fn test_mode_args_odd_parity_letter() {
        let config = Configuration::new(2400, 8, Parity::Odd, 1).unwrap();
        let mode = ModeArgs::new("COM1", &config).unwrap();
        assert!(mode.to_args().contains(&"PARITY=o".to_string()));
    }

    #[test]
    fn test_mode_args_reject_injected_device() {
        for device in ["COM3 & del x", "COM3$(whoami)", "COM3 | echo hacked", "/dev/ttyUSB0"] {
            let err = ModeArgs::new(device, &Configuration::default()).unwrap_err();
            assert_eq!(err.field(), "device", "{device}");
        }
    }

    #[test]
    fn test_configure_rejects_bad_device_before_spawning() {
        let mut backend = WindowsShellBackend::new().with_program("/nonexistent/mode");
        let err = backend
            .configure("COM3 & del x", &Configuration::default())
            .unwrap_err();
        assert!(err.is_validation(), "got {err:?}");
    }

    #[test]
    fn test_configure_reports_spawn_failure() {
        let mut backend = WindowsShellBackend::new().with_program("/nonexistent/mode");
        let err = backend.configure("COM3", &Configuration::default()).unwrap_err();
        assert!(matches!(err, PortError::Configuration { .. }), "got {err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_read_gives_up_after_poll_window() {
        let mut backend = WindowsShellBackend::new().with_poll_window(Duration::from_millis(30));
        let mut file = tempfile::tempfile().unwrap();

        let started = Instant::now();
        let data = backend.read(&mut file, 16).unwrap();

        assert!(data.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_returns_available_bytes_immediately() {
        use std::io::{Seek, SeekFrom, Write};

        let mut backend = WindowsShellBackend::new();
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"OK\r\n").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        assert_eq!(backend.read(&mut file, 16).unwrap(), b"OK\r\n");
    }
}
