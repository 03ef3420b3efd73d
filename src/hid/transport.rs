//! HID transport.
//!
//! [`HidTransport`] enumerates and opens HID interfaces; [`HidHandle`] is one
//! open interface. Reads and writes are asynchronous: a handle accepts a
//! request and reports the result later as a [`Completion`] on the shared
//! [`CompletionQueue`], tagged with the token it was submitted under.
//!
//! Two transports ship with the crate:
//! - [`HidapiTransport`] (feature `hid`), backed by `hidapi` in non-blocking
//!   mode. Pending reads progress in [`HidHandle::poll_pending`], which
//!   `HidInput::poll` calls on every sweep.
//! - [`MemoryTransport`], fully in-process. Hosts and tests script reports and
//!   unplug events through [`MemoryDevice`].
//!
//! A read completion with an empty buffer means the device went away.

use crate::error::{Error, Result};
use crate::metadata::DeviceMeta;
use crate::poll::{Completion, CompletionQueue, Token};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

/// One open HID interface.
pub trait HidHandle {
    fn meta(&self) -> &DeviceMeta;

    /// Synchronous output report, for command sequences sent while opening.
    fn write_now(&mut self, data: &[u8]) -> Result<usize>;

    fn send_feature_report(&mut self, data: &[u8]) -> Result<()>;

    /// Starts a read whose result is delivered under `token`.
    fn submit_read(&mut self, token: Token) -> Result<()>;

    /// Makes progress on a pending read for transports without OS-level
    /// completion.
    fn poll_pending(&mut self) -> Result<()> {
        Ok(())
    }

    /// Starts a write whose result is delivered under `token`.
    fn submit_write(&mut self, token: Token, data: Vec<u8>) -> Result<()>;

    /// Cancels pending work and releases the OS handle.
    fn close(&mut self);
}

/// Enumerates and opens HID interfaces.
pub trait HidTransport {
    fn enumerate(&mut self) -> Result<Vec<DeviceMeta>>;

    fn open(&mut self, meta: &DeviceMeta) -> Result<Box<dyn HidHandle>>;
}

#[cfg(feature = "hid")]
pub use self::hidapi_backend::HidapiTransport;

#[cfg(feature = "hid")]
mod hidapi_backend {
    use super::*;
    use hidapi::{DeviceInfo, HidApi, HidDevice};
    use std::ffi::CString;
    use tracing::{debug, trace};

    /// Largest input report the adapter reads in one go.
    const READ_BUFFER_LEN: usize = 64;

    fn meta_from_info(info: &DeviceInfo) -> DeviceMeta {
        DeviceMeta {
            vid: info.vendor_id(),
            pid: info.product_id(),
            release: info.release_number(),
            interface_number: info.interface_number(),
            path: info.path().to_string_lossy().into_owned(),
            product_string: info.product_string().map(str::to_owned),
            serial_number: info.serial_number().map(str::to_owned),
            usage_page: Some(info.usage_page()),
            usage: Some(info.usage()),
        }
    }

    fn to_io(e: hidapi::HidError) -> io::Error {
        io::Error::other(e.to_string())
    }

    /// `hidapi`-backed transport.
    pub struct HidapiTransport {
        api: HidApi,
        completions: CompletionQueue,
    }

    impl HidapiTransport {
        pub fn new(completions: CompletionQueue) -> Result<Self> {
            Ok(Self {
                api: HidApi::new()?,
                completions,
            })
        }
    }

    impl HidTransport for HidapiTransport {
        fn enumerate(&mut self) -> Result<Vec<DeviceMeta>> {
            self.api.refresh_devices()?;
            let found: Vec<DeviceMeta> = self.api.device_list().map(meta_from_info).collect();
            debug!(count = found.len(), "enumerated HID interfaces");
            Ok(found)
        }

        fn open(&mut self, meta: &DeviceMeta) -> Result<Box<dyn HidHandle>> {
            let path = CString::new(meta.path.as_bytes()).map_err(|e| Error::Hid(e.to_string()))?;
            let device = self.api.open_path(&path)?;
            // Reads are driven from `poll_pending`, never block the host loop.
            device.set_blocking_mode(false)?;
            Ok(Box::new(HidapiHandle {
                device: Some(device),
                meta: meta.clone(),
                completions: self.completions.clone(),
                pending_read: None,
                buf: vec![0u8; READ_BUFFER_LEN],
            }))
        }
    }

    struct HidapiHandle {
        device: Option<HidDevice>,
        meta: DeviceMeta,
        completions: CompletionQueue,
        pending_read: Option<Token>,
        buf: Vec<u8>,
    }

    impl HidapiHandle {
        fn device(&self) -> Result<&HidDevice> {
            self.device.as_ref().ok_or(Error::DeviceClosed)
        }
    }

    impl HidHandle for HidapiHandle {
        fn meta(&self) -> &DeviceMeta {
            &self.meta
        }

        fn write_now(&mut self, data: &[u8]) -> Result<usize> {
            Ok(self.device()?.write(data)?)
        }

        fn send_feature_report(&mut self, data: &[u8]) -> Result<()> {
            Ok(self.device()?.send_feature_report(data)?)
        }

        fn submit_read(&mut self, token: Token) -> Result<()> {
            self.device()?;
            self.pending_read = Some(token);
            self.poll_pending()
        }

        fn poll_pending(&mut self) -> Result<()> {
            let Some(token) = self.pending_read else {
                return Ok(());
            };
            let Some(device) = self.device.as_ref() else {
                return Err(Error::DeviceClosed);
            };
            let result = match device.read(&mut self.buf) {
                // Non-blocking read with nothing available yet.
                Ok(0) => return Ok(()),
                Ok(n) => Ok(self.buf[..n].to_vec()),
                Err(e) => Err(to_io(e)),
            };
            trace!(path = %self.meta.path, "HID read completed");
            self.pending_read = None;
            self.completions.push(Completion::Read { token, result });
            Ok(())
        }

        fn submit_write(&mut self, token: Token, data: Vec<u8>) -> Result<()> {
            let result = self.device()?.write(&data).map_err(to_io);
            self.completions.push(Completion::Write { token, result });
            Ok(())
        }

        fn close(&mut self) {
            self.pending_read = None;
            self.device = None;
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    meta: DeviceMeta,
    reports: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    features: Vec<Vec<u8>>,
    switch_to: Option<u16>,
    unplugged: bool,
    open: bool,
}

/// Control side of a [`MemoryTransport`] device.
#[derive(Clone, Debug)]
pub struct MemoryDevice(Rc<RefCell<MemoryState>>);

impl MemoryDevice {
    /// Queues an input report for the next read.
    pub fn push_report(&self, report: &[u8]) {
        self.0.borrow_mut().reports.push_back(report.to_vec());
    }

    /// Makes the pending (or next) read complete with end of stream.
    pub fn unplug(&self) {
        self.0.borrow_mut().unplugged = true;
    }

    /// Re-enumerates under `product_id` after the first synchronous write,
    /// the way wheels leave compatibility mode.
    pub fn switch_on_write(&self, product_id: u16) {
        self.0.borrow_mut().switch_to = Some(product_id);
    }

    /// Output reports received, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.0.borrow().written.clone()
    }

    pub fn features(&self) -> Vec<Vec<u8>> {
        self.0.borrow().features.clone()
    }

    pub fn is_open(&self) -> bool {
        self.0.borrow().open
    }

    pub fn meta(&self) -> DeviceMeta {
        self.0.borrow().meta.clone()
    }
}

/// In-process transport with scripted devices.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    devices: Vec<MemoryDevice>,
    completions: CompletionQueue,
}

impl MemoryTransport {
    pub fn new(completions: CompletionQueue) -> Self {
        Self {
            devices: Vec::new(),
            completions,
        }
    }

    pub fn add_device(&mut self, meta: DeviceMeta) -> MemoryDevice {
        let device = MemoryDevice(Rc::new(RefCell::new(MemoryState {
            meta,
            ..MemoryState::default()
        })));
        self.devices.push(device.clone());
        device
    }
}

impl HidTransport for MemoryTransport {
    fn enumerate(&mut self) -> Result<Vec<DeviceMeta>> {
        Ok(self
            .devices
            .iter()
            .filter(|d| !d.0.borrow().unplugged)
            .map(MemoryDevice::meta)
            .collect())
    }

    fn open(&mut self, meta: &DeviceMeta) -> Result<Box<dyn HidHandle>> {
        let device = self
            .devices
            .iter()
            .find(|d| d.0.borrow().meta.path == meta.path)
            .ok_or(Error::NoSuchDevice)?;
        device.0.borrow_mut().open = true;
        Ok(Box::new(MemoryHandle {
            device: device.clone(),
            meta: meta.clone(),
            completions: self.completions.clone(),
            pending_read: None,
        }))
    }
}

struct MemoryHandle {
    device: MemoryDevice,
    meta: DeviceMeta,
    completions: CompletionQueue,
    pending_read: Option<Token>,
}

impl HidHandle for MemoryHandle {
    fn meta(&self) -> &DeviceMeta {
        &self.meta
    }

    fn write_now(&mut self, data: &[u8]) -> Result<usize> {
        let mut state = self.device.0.borrow_mut();
        if !state.open {
            return Err(Error::DeviceClosed);
        }
        state.written.push(data.to_vec());
        if let Some(pid) = state.switch_to.take() {
            state.meta.pid = pid;
        }
        Ok(data.len())
    }

    fn send_feature_report(&mut self, data: &[u8]) -> Result<()> {
        self.device.0.borrow_mut().features.push(data.to_vec());
        Ok(())
    }

    fn submit_read(&mut self, token: Token) -> Result<()> {
        self.pending_read = Some(token);
        self.poll_pending()
    }

    fn poll_pending(&mut self) -> Result<()> {
        let Some(token) = self.pending_read else {
            return Ok(());
        };
        let mut state = self.device.0.borrow_mut();
        let data = match state.reports.pop_front() {
            Some(report) => report,
            None if state.unplugged => Vec::new(),
            None => return Ok(()),
        };
        self.pending_read = None;
        self.completions.push(Completion::Read {
            token,
            result: Ok(data),
        });
        Ok(())
    }

    fn submit_write(&mut self, token: Token, data: Vec<u8>) -> Result<()> {
        let result = if self.device.0.borrow().unplugged {
            Err(io::Error::new(io::ErrorKind::NotConnected, "device unplugged"))
        } else {
            let len = data.len();
            self.device.0.borrow_mut().written.push(data);
            Ok(len)
        };
        self.completions.push(Completion::Write { token, result });
        Ok(())
    }

    fn close(&mut self) {
        self.pending_read = None;
        self.device.0.borrow_mut().open = false;
    }
}
