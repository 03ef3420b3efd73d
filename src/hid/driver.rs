//! Driver-facing HID types.
//!
//! A [`HidDriver`] claims devices through its match table and turns each open
//! device into a [`HidDriverDevice`] that decodes input reports. Drivers talk
//! back to the hardware through the per-device [`OutputQueue`], which
//! `HidInput::poll` flushes one report at a time.

use crate::config::NativeModeConfig;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::hid::transport::{HidHandle, HidTransport};
use crate::metadata::{DeviceMeta, HidMatch};
use crate::source::JoystickRegistrar;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

/// Reports waiting in an [`OutputQueue`] beyond this are refused.
pub const MAX_PENDING_OUTPUT: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputReport {
    /// Sent on the interrupt OUT pipe.
    Output(Vec<u8>),
    Feature(Vec<u8>),
}

#[derive(Debug, Default)]
struct OutputState {
    pending: VecDeque<OutputReport>,
    closed: bool,
}

/// Per-device outgoing report queue. Clones share the queue.
#[derive(Clone, Debug, Default)]
pub struct OutputQueue(Rc<RefCell<OutputState>>);

impl OutputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, report: OutputReport) -> Result<()> {
        let mut state = self.0.borrow_mut();
        if state.closed {
            return Err(Error::DeviceClosed);
        }
        if state.pending.len() >= MAX_PENDING_OUTPUT {
            return Err(Error::QueueFull);
        }
        state.pending.push_back(report);
        Ok(())
    }

    pub fn pop(&self) -> Option<OutputReport> {
        self.0.borrow_mut().pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().pending.is_empty()
    }

    /// Drops pending reports and refuses new ones.
    pub fn close(&self) {
        let mut state = self.0.borrow_mut();
        state.closed = true;
        state.pending.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.0.borrow().closed
    }
}

/// Kernel-side virtual HID device (uhid on Linux).
pub trait VirtualHid {
    /// Creates a device. `descriptor`, when given, replaces the hardware
    /// report descriptor.
    fn create(
        &mut self,
        name: &str,
        meta: &DeviceMeta,
        descriptor: Option<&[u8]>,
    ) -> Result<usize>;

    fn input(&mut self, id: usize, report: &[u8]) -> Result<()>;

    fn destroy(&mut self, id: usize);
}

pub type SharedVirtualHid = Rc<RefCell<dyn VirtualHid>>;

/// What a driver hands back to `HidInput` while a device is opened.
pub struct OpenCtx<'a> {
    pub registrar: &'a mut dyn JoystickRegistrar,
    /// For drivers that need to watch re-enumeration.
    pub transport: &'a mut dyn HidTransport,
    pub output: OutputQueue,
    pub native_mode: NativeModeConfig,
}

pub enum OpenOutcome {
    Opened(Box<dyn HidDriverDevice>),
    /// The device left for another product id; it has to be enumerated again.
    Reenumerated,
}

pub trait HidDriver {
    fn name(&self) -> &'static str;

    fn ids(&self) -> &[HidMatch];

    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn accepts(&self, meta: &DeviceMeta) -> bool {
        self.ids().iter().any(|m| m.matches(meta))
    }

    fn open(&mut self, handle: &mut dyn HidHandle, ctx: &mut OpenCtx<'_>) -> Result<OpenOutcome>;
}

/// One device claimed by a driver.
pub trait HidDriverDevice {
    /// Decodes one input report. An error closes the device.
    fn process(&mut self, report: &[u8], out: &mut Vec<Event>) -> Result<()>;

    fn close(&mut self) {}
}

/// Application hooks for one open HID device.
pub trait HidUserCallbacks {
    fn on_write(&mut self, result: &io::Result<usize>) {
        let _ = result;
    }

    fn on_close(&mut self) {}
}
