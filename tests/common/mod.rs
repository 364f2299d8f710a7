//! Shared test utilities for serial_transport integration tests.
//!
//! This module provides common test infrastructure including:
//! - Mock-backed port creation with pre-programmed read chunks
//! - Device name fixtures for validation tests

#![allow(dead_code)]

use serial_transport::port::{Configuration, MockBackend, SerialPort};

pub const MOCK_DEVICE: &str = "/dev/ttyUSB0";

/// Command-injection attempts that every backend must reject.
pub const MALICIOUS_DEVICES: [&str; 9] = [
    "COM3 & del test.txt",
    "COM3; rm -rf /",
    "COM3 | echo hacked",
    "/dev/ttyUSB0; echo hacked",
    "/dev/ttyUSB0 && cat /etc/passwd",
    "../../../etc/passwd",
    "COM3$(whoami)",
    "/dev/ttyUSB0\n",
    "",
];

/// Names every platform's allow-list accepts for its own family.
pub const VALID_UNIX_DEVICES: [&str; 5] = [
    "/dev/ttyUSB0",
    "/dev/ttyACM0",
    "/dev/ttyS1",
    "/dev/ttyAMA0",
    "/dev/tty.usbserial",
];

pub const VALID_WINDOWS_DEVICES: [&str; 3] = ["COM1", "COM3", "com12"];

/// Create a mock backend with pre-programmed read chunks.
///
/// Each chunk is what one backend read returns.
///
/// # Example
/// ```ignore
/// let mock = mock_with_chunks(&[b"O", b"K\r\n"]);
/// ```
pub fn mock_with_chunks(chunks: &[&[u8]]) -> MockBackend {
    let mock = MockBackend::new();
    for chunk in chunks {
        mock.enqueue_chunk(chunk);
    }
    mock
}

/// A closed port over `mock` using the default 9600 8N1 settings.
pub fn mock_port(mock: &MockBackend) -> SerialPort<MockBackend> {
    SerialPort::with_backend(MOCK_DEVICE, Configuration::default(), mock.clone())
}

/// An open port over `mock`.
pub fn open_mock_port(mock: &MockBackend) -> SerialPort<MockBackend> {
    let mut port = mock_port(mock);
    port.open().expect("mock port should open");
    port
}
