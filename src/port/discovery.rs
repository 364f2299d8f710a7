//! Enumerate serial devices present on the system.

use super::backend::PlatformFamily;
use super::error::PortError;
use serde::Serialize;
use serialport::SerialPortType;

/// How a device is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Usb,
    Pci,
    Bluetooth,
    Unknown,
}

impl DeviceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Usb => "usb",
            Self::Pci => "pci",
            Self::Bluetooth => "bluetooth",
            Self::Unknown => "unknown",
        }
    }
}

/// A device found by [`list_devices`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub kind: DeviceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Whether `SerialPort` on this host would accept the name.
    pub accepted: bool,
}

impl DeviceInfo {
    fn from_port(port: serialport::SerialPortInfo, family: PlatformFamily) -> Self {
        let accepted = family.device_family().accepts(&port.port_name);
        let mut info = Self {
            name: port.port_name,
            kind: DeviceKind::Unknown,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial_number: None,
            accepted,
        };

        match port.port_type {
            SerialPortType::UsbPort(usb) => {
                info.kind = DeviceKind::Usb;
                info.vid = Some(usb.vid);
                info.pid = Some(usb.pid);
                info.manufacturer = usb.manufacturer;
                info.product = usb.product;
                info.serial_number = usb.serial_number;
            }
            SerialPortType::PciPort => info.kind = DeviceKind::Pci,
            SerialPortType::BluetoothPort => info.kind = DeviceKind::Bluetooth,
            SerialPortType::Unknown => {}
        }
        info
    }

    /// One-line summary for terminal output.
    pub fn describe(&self) -> String {
        let mut line = format!("{} ({})", self.name, self.kind.as_str());
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            line.push_str(&format!(" {vid:04x}:{pid:04x}"));
        }
        match (&self.manufacturer, &self.product) {
            (Some(m), Some(p)) => line.push_str(&format!(" {m} {p}")),
            (Some(m), None) => line.push_str(&format!(" {m}")),
            (None, Some(p)) => line.push_str(&format!(" {p}")),
            (None, None) => {}
        }
        if !self.accepted {
            line.push_str(" [name not supported]");
        }
        line
    }
}

/// List the serial devices the OS reports, sorted by name.
pub fn list_devices() -> Result<Vec<DeviceInfo>, PortError> {
    let family = PlatformFamily::detect()?;
    let mut devices: Vec<DeviceInfo> = serialport::available_ports()?
        .into_iter()
        .map(|port| DeviceInfo::from_port(port, family))
        .collect();
    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}
