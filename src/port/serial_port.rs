//! `SerialPort`: the open/closed state machine and the line reader.

use super::backend::{
    select_backend, Backend, BackendKind, BackendPreference, FallbackNotice, PlatformFamily,
};
use super::configuration::Configuration;
use super::error::PortError;
use super::traits::PlatformBackend;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Default `max_len` for [`SerialPort::read`].
pub const DEFAULT_READ_LENGTH: usize = 1024;

/// Default timeout for [`SerialPort::read_line`].
pub const DEFAULT_READ_LINE_TIMEOUT: Duration = Duration::from_millis(1000);

const LINE_CHUNK: usize = 128;
const LINE_IDLE_SLEEP: Duration = Duration::from_millis(10);

/// A serial device plus the backend used to drive it.
///
/// The port is open exactly while it holds a backend handle. Dropping an open
/// port closes it.
///
/// # Example
/// ```no_run
/// use serial_transport::port::{Configuration, Parity, SerialPort};
///
/// let config = Configuration::new(115200, 8, Parity::None, 1)?;
/// let mut port = SerialPort::new("/dev/ttyUSB0", config)?;
/// port.open()?;
/// port.write(b"PING\n")?;
/// let reply = port.read_line(std::time::Duration::from_millis(500))?;
/// println!("{}", String::from_utf8_lossy(&reply));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SerialPort<B: PlatformBackend = Backend> {
    device: String,
    config: Configuration,
    backend: B,
    handle: Option<B::Handle>,
    /// Bytes received after the last line returned by `read_line`.
    pending: Vec<u8>,
    notice: Option<FallbackNotice>,
}

impl SerialPort<Backend> {
    /// Port using the automatically selected backend for this host.
    pub fn new(device: impl Into<String>, config: Configuration) -> Result<Self, PortError> {
        Self::with_preference(device, config, BackendPreference::Auto)
    }

    /// Port using the backend selected for this host and `preference`.
    pub fn with_preference(
        device: impl Into<String>,
        config: Configuration,
        preference: BackendPreference,
    ) -> Result<Self, PortError> {
        let selection = select_backend(PlatformFamily::detect()?, preference);
        let mut port = Self::with_backend(device, config, selection.backend);
        port.notice = selection.notice;
        Ok(port)
    }

    /// Which backend variant was selected.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }
}

impl<B: PlatformBackend> SerialPort<B> {
    /// Port driven by an explicit backend.
    pub fn with_backend(device: impl Into<String>, config: Configuration, backend: B) -> Self {
        Self {
            device: device.into(),
            config,
            backend,
            handle: None,
            pending: Vec::new(),
            notice: None,
        }
    }

    /// Configure the line and open the device.
    ///
    /// Backend errors are returned unchanged and leave the port closed.
    pub fn open(&mut self) -> Result<(), PortError> {
        if self.handle.is_some() {
            return Err(PortError::AlreadyOpen);
        }

        self.backend.configure(&self.device, &self.config)?;
        let handle = self.backend.open(&self.device)?;
        self.handle = Some(handle);

        debug!(device = %self.device, config = %self.config, "serial port open");
        Ok(())
    }

    /// Close the device. Does nothing when already closed.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.close(handle);
            debug!(device = %self.device, "serial port closed");
        }
        self.pending.clear();
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Write bytes; returns how many were accepted, which may be fewer than
    /// `data.len()`.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let handle = self.handle.as_mut().ok_or(PortError::NotOpen)?;
        self.backend.write(handle, data)
    }

    /// Read up to `max_len` bytes that are available now. Empty means no data.
    pub fn read(&mut self, max_len: usize) -> Result<Vec<u8>, PortError> {
        let handle = self.handle.as_mut().ok_or(PortError::NotOpen)?;

        if !self.pending.is_empty() {
            let n = max_len.min(self.pending.len());
            return Ok(self.pending.drain(..n).collect());
        }

        self.backend.read(handle, max_len)
    }

    /// Read one line, waiting at most `timeout`.
    ///
    /// Returns the bytes before the first `\n` with trailing `\r`s removed.
    /// If no newline arrives in time, returns what was received with trailing
    /// CR/LF trimmed, possibly nothing. Bytes after the newline are kept for
    /// the next read.
    pub fn read_line(&mut self, timeout: Duration) -> Result<Vec<u8>, PortError> {
        let handle = self.handle.as_mut().ok_or(PortError::NotOpen)?;

        let mut buffer = std::mem::take(&mut self.pending);
        let started = Instant::now();

        while memchr::memchr(b'\n', &buffer).is_none() {
            let chunk = match self.backend.read(handle, LINE_CHUNK) {
                Ok(chunk) => chunk,
                Err(e) => {
                    // Keep what was already received for the next read.
                    self.pending = buffer;
                    return Err(e);
                }
            };
            let idle = chunk.is_empty();
            buffer.extend_from_slice(&chunk);

            if memchr::memchr(b'\n', &buffer).is_some() || started.elapsed() > timeout {
                break;
            }
            if idle {
                thread::sleep(LINE_IDLE_SLEEP);
            }
        }

        match memchr::memchr(b'\n', &buffer) {
            Some(pos) => {
                self.pending = buffer.split_off(pos + 1);
                buffer.truncate(pos);
                while buffer.last() == Some(&b'\r') {
                    buffer.pop();
                }
                trace!(bytes = buffer.len(), leftover = self.pending.len(), "line");
            }
            None => {
                while matches!(buffer.last(), Some(b'\r' | b'\n')) {
                    buffer.pop();
                }
                trace!(bytes = buffer.len(), "partial line after timeout");
            }
        }

        Ok(buffer)
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Mutable access to the line settings; refused while open since they
    /// only take effect on the next `open`.
    pub fn configuration_mut(&mut self) -> Result<&mut Configuration, PortError> {
        if self.handle.is_some() {
            return Err(PortError::AlreadyOpen);
        }
        Ok(&mut self.config)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Set when the preferred backend was unavailable at construction.
    pub fn backend_notice(&self) -> Option<&FallbackNotice> {
        self.notice.as_ref()
    }
}

impl<B: PlatformBackend> fmt::Debug for SerialPort<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPort")
            .field("device", &self.device)
            .field("config", &self.config)
            .field("backend", &self.backend)
            .field("open", &self.is_open())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<B: PlatformBackend> Drop for SerialPort<B> {
    fn drop(&mut self) {
        self.close();
    }
}
