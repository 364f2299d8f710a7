//! Device-name allow-lists.
//!
//! Device names end up in a process argv (`stty`, `mode`) or a Win32 path, so
//! they are checked against a strict per-family pattern before any backend
//! does anything else with them.

use super::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// `\d` and `\w` are Unicode-aware in `regex`, so the classes are spelled out.
static UNIX_DEVICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/dev/(tty(USB|ACM|S|AMA)?[0-9]+|tty\.[A-Za-z0-9_-]+)$")
        .expect("Invalid unix device regex")
});

static WINDOWS_DEVICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^COM[0-9]+$").expect("Invalid windows device regex"));

/// Naming convention a device name is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
    /// `/dev/ttyUSB0`, `/dev/ttyACM1`, `/dev/tty.usbserial`, ...
    Unix,
    /// `COM1`, `com12`, ...
    Windows,
}

impl DeviceFamily {
    /// Human-readable example of accepted names.
    pub fn expected_format(self) -> &'static str {
        match self {
            Self::Unix => "/dev/ttyUSB0, /dev/tty.usbserial, etc.",
            Self::Windows => "COM1, COM2, etc.",
        }
    }

    /// Check `device` against this family's pattern.
    pub fn validate(self, device: &str) -> Result<(), ValidationError> {
        let pattern = match self {
            Self::Unix => &*UNIX_DEVICE,
            Self::Windows => &*WINDOWS_DEVICE,
        };

        if pattern.is_match(device) {
            Ok(())
        } else {
            Err(ValidationError::Device {
                family: self,
                device: device.to_string(),
                expected: self.expected_format(),
            })
        }
    }

    /// Whether `device` is acceptable for this family.
    pub fn accepts(self, device: &str) -> bool {
        self.validate(device).is_ok()
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => write!(f, "Unix"),
            Self::Windows => write!(f, "Windows"),
        }
    }
}

/// Win32 device namespace path for a validated COM name.
///
/// `COM10` and above are only reachable through `\\.\`, so it is used for
/// every port.
pub(crate) fn win32_device_path(device: &str) -> String {
    format!(r"\\.\{device}")
}
