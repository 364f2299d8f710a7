//! Windows backend calling the Win32 comm API directly.
//!
//! Unlike the `mode` path, the DCB is applied to the very handle that is then
//! used for I/O, so the requested baud rate is what the driver runs at.

use crate::port::configuration::{Configuration, Parity};
use crate::port::device::{win32_device_path, DeviceFamily};
use crate::port::error::{PortError, ValidationError};
use crate::port::traits::PlatformBackend;
use std::ffi::OsStr;
use std::io;
use std::iter;
use std::mem;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use tracing::{debug, trace, warn};
use winapi::shared::minwindef::{DWORD, LPVOID};
use winapi::um::commapi::{GetCommState, SetCommState, SetCommTimeouts};
use winapi::um::fileapi::{CreateFileW, ReadFile, WriteFile, OPEN_EXISTING};
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::winbase::{
    COMMTIMEOUTS, DCB, EVENPARITY, NOPARITY, ODDPARITY, ONESTOPBIT, TWOSTOPBITS,
};
use winapi::um::winnt::{FILE_ATTRIBUTE_NORMAL, GENERIC_READ, GENERIC_WRITE, HANDLE};

// Short enough that `read` behaves as "whatever is buffered right now".
const READ_INTERVAL_TIMEOUT_MS: DWORD = 1;
const READ_TOTAL_TIMEOUT_CONSTANT_MS: DWORD = 1;

/// Owned Win32 comm handle. Closed on drop.
pub struct NativeHandle {
    raw: HANDLE,
}

// The handle is only ever used by the one SerialPort that owns it.
unsafe impl Send for NativeHandle {}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        // SAFETY: `raw` came from CreateFileW and is closed exactly once, here.
        if unsafe { CloseHandle(self.raw) } == 0 {
            warn!(error = %io::Error::last_os_error(), "CloseHandle failed");
        }
    }
}

impl std::fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHandle")
            .field("raw", &self.raw)
            .finish()
    }
}

/// Windows `PlatformBackend` on top of CreateFileW / SetCommState.
#[derive(Debug, Default)]
pub struct WindowsNativeBackend {
    /// Line settings from the last `configure`, applied by `open`.
    pending: Option<Configuration>,
}

impl WindowsNativeBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(iter::once(0)).collect()
}

fn apply_comm_state(handle: &NativeHandle, config: &Configuration) -> io::Result<()> {
    // SAFETY: DCB is plain data; zeroed is a valid starting point for GetCommState.
    let mut dcb: DCB = unsafe { mem::zeroed() };
    dcb.DCBlength = mem::size_of::<DCB>() as DWORD;

    // SAFETY: `dcb` is a properly sized DCB and the handle is open.
    if unsafe { GetCommState(handle.raw, &mut dcb) } == 0 {
        return Err(io::Error::last_os_error());
    }

    dcb.BaudRate = config.baud_rate();
    dcb.ByteSize = config.data_bits();
    dcb.Parity = match config.parity() {
        Parity::None => NOPARITY,
        Parity::Odd => ODDPARITY,
        Parity::Even => EVENPARITY,
    };
    dcb.set_fParity((config.parity() != Parity::None) as DWORD);
    dcb.set_fBinary(1);
    dcb.StopBits = if config.stop_bits() == 2 {
        TWOSTOPBITS
    } else {
        ONESTOPBIT
    };

    // SAFETY: as above.
    if unsafe { SetCommState(handle.raw, &mut dcb) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn apply_comm_timeouts(handle: &NativeHandle) -> io::Result<()> {
    let mut timeouts = COMMTIMEOUTS {
        ReadIntervalTimeout: READ_INTERVAL_TIMEOUT_MS,
        ReadTotalTimeoutMultiplier: 0,
        ReadTotalTimeoutConstant: READ_TOTAL_TIMEOUT_CONSTANT_MS,
        WriteTotalTimeoutMultiplier: 0,
        WriteTotalTimeoutConstant: 0,
    };

    // SAFETY: the handle is open and `timeouts` lives across the call.
    if unsafe { SetCommTimeouts(handle.raw, &mut timeouts) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl PlatformBackend for WindowsNativeBackend {
    type Handle = NativeHandle;

    fn validate_device(&self, device: &str) -> Result<(), ValidationError> {
        DeviceFamily::Windows.validate(device)
    }

    fn configure(&mut self, device: &str, config: &Configuration) -> Result<(), PortError> {
        self.validate_device(device)?;
        self.pending = Some(*config);
        Ok(())
    }

    fn open(&mut self, device: &str) -> Result<NativeHandle, PortError> {
        self.validate_device(device)?;

        let path = to_wide(&win32_device_path(device));
        // SAFETY: `path` is NUL-terminated and outlives the call; no sharing,
        // no security attributes, no template.
        let raw = unsafe {
            CreateFileW(
                path.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                0,
                ptr::null_mut(),
                OPEN_EXISTING,
                FILE_ATTRIBUTE_NORMAL,
                ptr::null_mut(),
            )
        };
        if raw == INVALID_HANDLE_VALUE {
            return Err(PortError::open(device, io::Error::last_os_error()));
        }

        // From here on an early return drops (and closes) the handle.
        let handle = NativeHandle { raw };
        let config = self.pending.unwrap_or_default();

        apply_comm_state(&handle, &config)
            .map_err(|e| PortError::configuration(device, format!("SetCommState failed: {e}")))?;
        apply_comm_timeouts(&handle).map_err(|e| {
            PortError::configuration(device, format!("SetCommTimeouts failed: {e}"))
        })?;

        debug!(device, %config, "opened");
        Ok(handle)
    }

    fn close(&mut self, handle: NativeHandle) {
        drop(handle);
        debug!("closed");
    }

    fn write(&mut self, handle: &mut NativeHandle, data: &[u8]) -> Result<usize, PortError> {
        let len = DWORD::try_from(data.len()).unwrap_or(DWORD::MAX);
        let mut written: DWORD = 0;

        // SAFETY: `data` is valid for `len` bytes; synchronous (no OVERLAPPED).
        let ok = unsafe {
            WriteFile(
                handle.raw,
                data.as_ptr() as LPVOID,
                len,
                &mut written,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(PortError::Io(io::Error::last_os_error()));
        }

        trace!(requested = data.len(), written, "write");
        Ok(written as usize)
    }

    fn read(&mut self, handle: &mut NativeHandle, max_len: usize) -> Result<Vec<u8>, PortError> {
        let mut buffer = vec![0u8; max_len];
        let len = DWORD::try_from(max_len).unwrap_or(DWORD::MAX);
        let mut read: DWORD = 0;

        // SAFETY: `buffer` is writable for `len` bytes; synchronous read.
        let ok = unsafe {
            ReadFile(
                handle.raw,
                buffer.as_mut_ptr() as LPVOID,
                len,
                &mut read,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(PortError::Io(io::Error::last_os_error()));
        }

        buffer.truncate(read as usize);
        if !buffer.is_empty() {
            trace!(bytes = buffer.len(), "read");
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_caches_configuration() {
        let mut backend = WindowsNativeBackend::new();
        let config = Configuration::new(115200, 7, Parity::Even, 2).unwrap();
        backend.configure("COM3", &config).unwrap();
        assert_eq!(backend.pending, Some(config));
    }

    #[test]
    fn test_configure_rejects_bad_device() {
        let mut backend = WindowsNativeBackend::new();
        let err = backend
            .configure("COM3 & del x", &Configuration::default())
            .unwrap_err();
        assert!(err.is_validation());
        assert!(backend.pending.is_none());
    }

    #[test]
    fn test_open_missing_port_is_open_error() {
        let mut backend = WindowsNativeBackend::new();
        let err = backend.open("COM987").unwrap_err();
        assert!(matches!(err, PortError::Open { .. }), "got {err:?}");
    }

    #[test]
    fn test_wide_path_is_nul_terminated() {
        let wide = to_wide(r"\\.\COM3");
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(wide.len(), r"\\.\COM3".len() + 1);
    }
}
