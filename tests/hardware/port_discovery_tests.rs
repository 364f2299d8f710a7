//! Port discovery and enumeration tests.
//!
//! These tests don't require specific hardware but will use any available
//! ports on the system. They are still marked as ignored because they require
//! at least some serial hardware to be meaningful.

use serial_transport::port::{list_devices, DeviceKind};
use std::collections::HashSet;

use crate::hardware::utils::skip_without_hardware;

#[test]
#[ignore] // Requires hardware
fn test_port_discovery() {
    let devices = list_devices().expect("enumeration should succeed");

    if devices.is_empty() {
        println!("No ports found - skipping test");
        return;
    }

    for device in &devices {
        println!("  - {}", device.describe());
    }

    let names: HashSet<_> = devices.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names.len(), devices.len(), "duplicate device names");
}

#[test]
#[ignore] // Requires hardware
fn test_test_port_is_listed_and_accepted() {
    let test = match skip_without_hardware() {
        Some(t) => t,
        None => return,
    };

    let devices = list_devices().expect("enumeration should succeed");
    let Some(device) = devices.iter().find(|d| d.name == test.port_name) else {
        // macOS lists /dev/cu.* and /dev/tty.* separately; not every driver
        // is enumerable, so only report.
        println!("{} not reported by the OS enumerator", test.port_name);
        return;
    };

    assert!(device.accepted, "{} should pass the allow-list", device.name);
    if device.kind == DeviceKind::Usb {
        assert!(device.vid.is_some());
    }
}
