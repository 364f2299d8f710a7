//! Unix backend: `stty` for line setup, a non-blocking tty file for I/O.

use super::{open_nonblocking, read_available, write_available};
use crate::port::configuration::{Configuration, Parity};
use crate::port::device::DeviceFamily;
use crate::port::error::{PortError, ValidationError};
use crate::port::traits::PlatformBackend;
use std::fs::File;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, trace};

/// GNU stty names the device with `-F`, the BSD/macOS one with `-f`.
const DEVICE_FLAG: &str = if cfg!(target_os = "linux") { "-F" } else { "-f" };

/// Unix `PlatformBackend`.
#[derive(Debug, Clone)]
pub struct UnixBackend {
    stty: PathBuf,
}

impl Default for UnixBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl UnixBackend {
    pub fn new() -> Self {
        Self::with_program("stty")
    }

    /// Use a different `stty` binary.
    pub fn with_program(stty: impl Into<PathBuf>) -> Self {
        Self { stty: stty.into() }
    }

    /// Arguments passed to `stty` for `device`.
    ///
    /// `raw` comes first because on some systems it resets the character
    /// size and parity flags.
    pub fn stty_args(device: &str, config: &Configuration) -> Vec<String> {
        let mut args = vec![
            DEVICE_FLAG.to_string(),
            device.to_string(),
            "raw".to_string(),
            "-echo".to_string(),
            config.baud_rate().to_string(),
            format!("cs{}", config.data_bits()),
        ];
        args.extend(parity_flags(config.parity()).iter().map(|f| f.to_string()));
        args.push(stop_bits_flag(config.stop_bits()).to_string());
        args
    }
}

fn parity_flags(parity: Parity) -> &'static [&'static str] {
    match parity {
        Parity::None => &["-parenb"],
        Parity::Odd => &["parenb", "parodd"],
        Parity::Even => &["parenb", "-parodd"],
    }
}

fn stop_bits_flag(stop_bits: u8) -> &'static str {
    if stop_bits == 2 {
        "cstopb"
    } else {
        "-cstopb"
    }
}

/// Keep other processes from opening the line while we hold it.
#[cfg(unix)]
fn claim_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` for the duration of the call.
    if unsafe { libc::ioctl(file.as_raw_fd(), libc::TIOCEXCL) } == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn claim_exclusive(_file: &File) -> std::io::Result<()> {
    Ok(())
}

impl PlatformBackend for UnixBackend {
    type Handle = File;

    fn validate_device(&self, device: &str) -> Result<(), ValidationError> {
        DeviceFamily::Unix.validate(device)
    }

    fn configure(&mut self, device: &str, config: &Configuration) -> Result<(), PortError> {
        self.validate_device(device)?;

        let args = Self::stty_args(device, config);
        debug!(program = %self.stty.display(), ?args, "configuring line");

        let output = Command::new(&self.stty)
            .args(&args)
            .output()
            .map_err(|e| {
                PortError::configuration(
                    device,
                    format!("failed to run {}: {e}", self.stty.display()),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = match (stderr.trim(), stdout.trim()) {
                ("", "") => format!("stty exited with {}", output.status),
                ("", out) => out.to_string(),
                (err, _) => err.to_string(),
            };
            return Err(PortError::configuration(device, message));
        }

        Ok(())
    }

    fn open(&mut self, device: &str) -> Result<File, PortError> {
        self.validate_device(device)?;

        let file = open_nonblocking(device).map_err(|e| PortError::open(device, e))?;
        claim_exclusive(&file).map_err(|e| PortError::open(device, e))?;

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

    fn read(&mut self, handle: &mut File, max_len: usize) -> Result<Vec<u8>, PortError> {
        let data = read_available(handle, max_len)?;
        if !data.is_empty() {
            trace!(bytes = data.len(), "read");
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stty_args_8n1() {
        let args = UnixBackend::stty_args("/dev/ttyUSB0", &Configuration::default());
        assert_eq!(
            args,
            vec![DEVICE_FLAG, "/dev/ttyUSB0", "raw", "-echo", "9600", "cs8", "-parenb", "-cstopb"]
        );
    }

    #[test]
    fn test_stty_args_7e2() {
        let config = Configuration::new(115200, 7, Parity::Even, 2).unwrap();
        let args = UnixBackend::stty_args("/dev/ttyACM0", &config);
        assert_eq!(
            args,
            vec![
                DEVICE_FLAG,
                "/dev/ttyACM0",
                "raw",
                "-echo",
                "115200",
                "cs7",
                "parenb",
                "-parodd",
                "cstopb"
            ]
        );
    }

    #[test]
    fn test_stty_args_odd_parity() {
        let config = Configuration::new(4800, 5, Parity::Odd, 1).unwrap();
        let args = UnixBackend::stty_args("/dev/ttyS0", &config);
        assert!(args.ends_with(&[
            "parenb".to_string(),
            "parodd".to_string(),
            "-cstopb".to_string()
        ]));
    }

    #[test]
    fn test_configure_rejects_bad_device_before_running_stty() {
        // A program that cannot exist proves stty was never spawned.
        let mut backend = UnixBackend::with_program("/nonexistent/stty");
        let err = backend
            .configure("/dev/ttyUSB0; rm -rf /", &Configuration::default())
            .unwrap_err();
        assert!(err.is_validation(), "got {err:?}");
    }

    #[test]
    fn test_configure_reports_spawn_failure() {
        let mut backend = UnixBackend::with_program("/nonexistent/stty");
        let err = backend
            .configure("/dev/ttyUSB0", &Configuration::default())
            .unwrap_err();
        match err {
            PortError::Configuration { device, message } => {
                assert_eq!(device, "/dev/ttyUSB0");
                assert!(message.contains("/nonexistent/stty"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_configure_reports_nonzero_exit() {
        let mut backend = UnixBackend::with_program("false");
        let err = backend
            .configure("/dev/ttyUSB0", &Configuration::default())
            .unwrap_err();
        assert!(matches!(err, PortError::Configuration { .. }), "got {err:?}");
    }

    #[test]
    fn test_open_missing_device_is_open_error() {
        let mut backend = UnixBackend::new();
        let err = backend.open("/dev/ttyUSB987654").unwrap_err();
        assert!(matches!(err, PortError::Open { .. }), "got {err:?}");
    }
}
