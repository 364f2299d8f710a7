//! Tests requiring actual serial hardware.
//!
//! These tests are skipped if no hardware is available.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! # Set environment variables
//! export TEST_PORT=/dev/ttyACM0          # or COM3 on Windows
//! export TEST_BAUD=9600                  # optional, default: 9600
//! export TEST_LOOPBACK=1                 # if port has TX-RX loopback
//!
//! # Run tests
//! cargo test --features hardware-tests -- --ignored
//! ```

use serial_transport::port::{PortError, DEFAULT_READ_LINE_TIMEOUT};
use std::time::Duration;

use crate::hardware::utils::{skip_without_hardware, write_all};

#[test]
#[ignore] // Run with --ignored flag
fn test_real_port_open_close() {
    let test = match skip_without_hardware() {
        Some(t) => t,
        None => return,
    };

    let mut port = test.open();
    assert!(port.is_open());
    assert_eq!(port.device(), test.port_name);
    assert!(port.backend_notice().is_none() || cfg!(windows));

    assert!(matches!(port.open(), Err(PortError::AlreadyOpen)));

    port.close();
    assert!(!port.is_open());
    port.close();
}

#[test]
#[ignore]
fn test_real_port_reopen() {
    let test = match skip_without_hardware() {
        Some(t) => t,
        None => return,
    };

    let mut port = test.open();
    port.close();
    port.open().expect("reopen after close");
}

#[test]
#[ignore]
fn test_real_port_read_line_times_out_quietly() {
    let test = match skip_without_hardware() {
        Some(t) => t,
        None => return,
    };

    let mut port = test.open();
    // Drain any startup banner, then a quiet line must not error.
    let _ = port.read_line(DEFAULT_READ_LINE_TIMEOUT).unwrap();
    port.read_line(Duration::from_millis(200))
        .expect("silence is not an error");
}

#[test]
#[ignore]
fn test_real_port_loopback_line() {
    let test = match skip_without_hardware() {
        Some(t) => t,
        None => return,
    };
    if !test.loopback_enabled {
        println!("Skipping: TEST_LOOPBACK not set");
        return;
    }

    let mut port = test.open();
    write_all(&mut port, b"LOOPBACK_TEST\r\n");
    let line = port.read_line(Duration::from_secs(2)).unwrap();
    assert_eq!(line, b"LOOPBACK_TEST");
}
