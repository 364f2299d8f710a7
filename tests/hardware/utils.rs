//! Utility functions for hardware testing.
//!
//! Provides helpers for reading the test environment and opening the port
//! under test.

use serial_transport::port::{Configuration, Parity, SerialPort};
use std::env;
use std::time::Duration;

/// Test port configuration from environment.
pub struct TestPortConfig {
    pub port_name: String,
    pub baud_rate: u32,
    /// TX and RX are bridged, so everything written is read back.
    pub loopback_enabled: bool,
    /// Time the device needs after open before it answers (Arduino reset).
    pub startup_delay: Duration,
}

impl TestPortConfig {
    /// Get test configuration from environment variables.
    ///
    /// - `TEST_PORT`: device name (required)
    /// - `TEST_BAUD`: baud rate, default 9600
    /// - `TEST_LOOPBACK=1`: TX-RX loopback fitted
    /// - `TEST_STARTUP_MS`: delay after open, default 2000
    pub fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok()?;
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(9600);
        let loopback_enabled = env::var("TEST_LOOPBACK").ok().as_deref() == Some("1");
        let startup_delay = env::var("TEST_STARTUP_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(2));

        Some(TestPortConfig {
            port_name,
            baud_rate,
            loopback_enabled,
            startup_delay,
        })
    }

    pub fn configuration(&self) -> Configuration {
        Configuration::new(self.baud_rate, 8, Parity::None, 1)
            .expect("TEST_BAUD must be a standard rate")
    }

    /// Open the port under test and wait for the device to settle.
    pub fn open(&self) -> SerialPort {
        let mut port =
            SerialPort::new(&self.port_name, self.configuration()).expect("supported platform");
        port.open()
            .unwrap_or_else(|e| panic!("Port open failed for {}: {e}", self.port_name));
        std::thread::sleep(self.startup_delay);
        port
    }
}

/// Skip test if hardware is not available.
pub fn skip_without_hardware() -> Option<TestPortConfig> {
    let config = TestPortConfig::from_env();
    if config.is_none() {
        println!("Skipping hardware test: TEST_PORT not set");
    }
    config
}

/// Write all bytes, retrying short writes.
pub fn write_all(port: &mut SerialPort, data: &[u8]) {
    let mut offset = 0;
    let mut attempts = 0;
    while offset < data.len() {
        let n = port.write(&data[offset..]).expect("write failed");
        offset += n;
        if n == 0 {
            attempts += 1;
            assert!(attempts < 200, "device stopped accepting data");
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}
