//! In-memory backend for testing.
//!
//! `MockBackend` stands in for an OS backend so `SerialPort` can be exercised
//! without hardware. Clones share state, so a test keeps one clone to feed
//! data and inspect calls while the port owns the other.

use super::configuration::Configuration;
use super::device::DeviceFamily;
use super::error::{PortError, ValidationError};
use super::traits::PlatformBackend;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

/// One call made on a [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Configure(String, Configuration),
    Open(String),
    Close(u64),
    Write(Vec<u8>),
    Read(usize),
}

/// Handle returned by [`MockBackend::open`].
#[derive(Debug, PartialEq, Eq)]
pub struct MockHandle {
    id: u64,
}

impl MockHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Default)]
struct MockState {
    /// Each entry is what one read returns, split if longer than `max_len`.
    chunks: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    calls: Vec<MockCall>,
    configure_error: Option<String>,
    fail_open: bool,
    fail_write: bool,
    fail_read: bool,
    /// Cap on bytes accepted per write.
    write_limit: Option<usize>,
    next_id: u64,
    open_handles: usize,
}

/// Mock `PlatformBackend`.
///
/// # Example
/// ```
/// use serial_transport::port::{Configuration, MockBackend, SerialPort};
/// use std::time::Duration;
///
/// let mock = MockBackend::new();
/// mock.enqueue_chunk(b"O");
/// mock.enqueue_chunk(b"K\r\n");
///
/// let mut port = SerialPort::with_backend("/dev/ttyUSB0", Configuration::default(), mock.clone());
/// port.open().unwrap();
/// port.write(b"AT\n").unwrap();
///
/// assert_eq!(port.read_line(Duration::from_millis(100)).unwrap(), b"OK");
/// assert_eq!(mock.written(), vec![b"AT\n".to_vec()]);
/// ```
#[derive(Debug, Clone)]
pub struct MockBackend {
    family: DeviceFamily,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Mock validating device names as Unix paths.
    pub fn new() -> Self {
        Self::for_family(DeviceFamily::Unix)
    }

    /// Mock validating device names for `family`.
    pub fn for_family(family: DeviceFamily) -> Self {
        Self {
            family,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Queue bytes for one future read.
    pub fn enqueue_chunk(&self, data: &[u8]) {
        self.state.lock().chunks.push_back(data.to_vec());
    }

    /// Make the next `configure` fail with `message`.
    pub fn fail_configure(&self, message: impl Into<String>) {
        self.state.lock().configure_error = Some(message.into());
    }

    /// Make `open` fail until reset.
    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Make `write` fail until reset.
    pub fn set_fail_write(&self, fail: bool) {
        self.state.lock().fail_write = fail;
    }

    /// Make `read` fail until reset.
    pub fn set_fail_read(&self, fail: bool) {
        self.state.lock().fail_read = fail;
    }

    /// Accept at most `limit` bytes per write.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.state.lock().write_limit = limit;
    }

    /// Everything written so far, one entry per write.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Handles opened and not yet closed or dropped through `close`.
    pub fn open_handles(&self) -> usize {
        self.state.lock().open_handles
    }

    /// Bytes still queued for reading.
    pub fn queued_bytes(&self) -> usize {
        self.state.lock().chunks.iter().map(Vec::len).sum()
    }
}

impl PlatformBackend for MockBackend {
    type Handle = MockHandle;

    fn validate_device(&self, device: &str) -> Result<(), ValidationError> {
        self.family.validate(device)
    }

    fn configure(&mut self, device: &str, config: &Configuration) -> Result<(), PortError> {
        self.validate_device(device)?;

        let mut state = self.state.lock();
        state
            .calls
            .push(MockCall::Configure(device.to_string(), *config));
        match state.configure_error.take() {
            Some(message) => Err(PortError::configuration(device, message)),
            None => Ok(()),
        }
    }

    fn open(&mut self, device: &str) -> Result<MockHandle, PortError> {
        self.validate_device(device)?;

        let mut state = self.state.lock();
        state.calls.push(MockCall::Open(device.to_string()));
        if state.fail_open {
            return Err(PortError::open(
                device,
                io::Error::new(io::ErrorKind::PermissionDenied, "mock device busy"),
            ));
        }

        state.next_id += 1;
        state.open_handles += 1;
        Ok(MockHandle { id: state.next_id })
    }

    fn close(&mut self, handle: MockHandle) {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Close(handle.id));
        state.open_handles = state.open_handles.saturating_sub(1);
    }

    fn write(&mut self, _handle: &mut MockHandle, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Write(data.to_vec()));
        if state.fail_write {
            return Err(PortError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }

        let n = state.write_limit.map_or(data.len(), |limit| limit.min(data.len()));
        state.written.push(data[..n].to_vec());
        Ok(n)
    }

    fn read(&mut self, _handle: &mut MockHandle, max_len: usize) -> Result<Vec<u8>, PortError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Read(max_len));
        if state.fail_read {
            return Err(PortError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock read failure",
            )));
        }

        let Some(mut chunk) = state.chunks.pop_front() else {
            return Ok(Vec::new());
        };
        if chunk.len() > max_len {
            let rest = chunk.split_off(max_len);
            state.chunks.push_front(rest);
        }
        Ok(chunk)
    }
}
