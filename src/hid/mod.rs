//! HID driver registry and dispatch.
//!
//! [`HidInput`] owns the registered vendor drivers and every HID device they
//! claimed. At `init` it enumerates the transport and offers each interface to
//! the drivers in registration order; the first driver whose match table
//! accepts the device *and* opens it successfully owns it.
//!
//! Each open device is registered with the host poller under a
//! `Token { kind: Hid, slot }`. Reads and writes are asynchronous: `poll`
//! issues a read for every device that has none pending and flushes one queued
//! output report per device; results come back through `handle_completion`.
//! A read failure, an empty read or a driver error closes the device. Closing
//! removes the token from the poller before anything else is released, then
//! tells the application callbacks, then tears the device down. Joysticks the
//! driver registered for a closed device are reported once through
//! [`HidInput::take_closed_joysticks`].

pub mod driver;
pub mod logitech;
pub mod report;
pub mod steam;
pub mod transport;

pub use driver::{
    HidDriver, HidDriverDevice, HidUserCallbacks, OpenCtx, OpenOutcome, OutputQueue,
    OutputReport, SharedVirtualHid, VirtualHid,
};
pub use transport::{HidHandle, HidTransport, MemoryDevice, MemoryTransport};

use crate::config::NativeModeConfig;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::metadata::DeviceMeta;
use crate::poll::{Completion, Interest, Poller, Token, TokenKind};
use crate::slots::SlotTable;
use crate::event::HapticCaps;
use crate::source::{HapticSink, JoystickRegistrar};
use std::fmt;
use tracing::{debug, info, warn};

/// Open HID devices, all drivers together.
pub const MAX_HID_DEVICES: usize = 64;

/// Enumeration passes at `init`; devices that switch product id need a second.
const MAX_ENUMERATION_PASSES: usize = 3;

struct OpenDevice {
    driver: usize,
    handle: Box<dyn HidHandle>,
    device: Box<dyn HidDriverDevice>,
    output: OutputQueue,
    read_pending: bool,
    write_pending: bool,
    callbacks: Option<Box<dyn HidUserCallbacks>>,
    joysticks: Vec<usize>,
}

impl OpenDevice {
    fn meta(&self) -> &DeviceMeta {
        self.handle.meta()
    }
}

/// Remembers which joysticks a driver registers while opening a device.
struct TrackingRegistrar<'a> {
    inner: &'a mut dyn JoystickRegistrar,
    registered: Vec<usize>,
}

impl JoystickRegistrar for TrackingRegistrar<'_> {
    fn register_joystick(
        &mut self,
        name: &str,
        caps: HapticCaps,
        sink: Option<Box<dyn HapticSink>>,
    ) -> Result<usize> {
        let index = self.inner.register_joystick(name, caps, sink)?;
        self.registered.push(index);
        Ok(index)
    }
}

struct DriverEntry {
    driver: Box<dyn HidDriver>,
    enabled: bool,
}

/// HID subsystem.
pub struct HidInput {
    drivers: Vec<DriverEntry>,
    transport: Option<Box<dyn HidTransport>>,
    devices: SlotTable<OpenDevice>,
    closed_joysticks: Vec<usize>,
    native_mode: NativeModeConfig,
    initialized: bool,
}

impl Default for HidInput {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidInput")
            .field(
                "drivers",
                &self.drivers.iter().map(|d| d.driver.name()).collect::<Vec<_>>(),
            )
            .field("devices", &self.devices.indices())
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl HidInput {
    pub fn new() -> Self {
        Self {
            drivers: Vec::new(),
            transport: None,
            devices: SlotTable::with_capacity(MAX_HID_DEVICES),
            closed_joysticks: Vec::new(),
            native_mode: NativeModeConfig::default(),
            initialized: false,
        }
    }

    pub fn with_transport(mut self, transport: impl HidTransport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn with_driver(mut self, driver: impl HidDriver + 'static) -> Self {
        self.drivers.push(DriverEntry {
            driver: Box::new(driver),
            enabled: true,
        });
        self
    }

    /// Adds a driver; only possible before `init`.
    pub fn register(&mut self, driver: Box<dyn HidDriver>) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }
        debug!(driver = driver.name(), "HID driver registered");
        self.drivers.push(DriverEntry {
            driver,
            enabled: true,
        });
        Ok(())
    }

    pub fn set_native_mode(&mut self, config: NativeModeConfig) {
        self.native_mode = config;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    pub fn open_count(&self) -> usize {
        self.devices.len()
    }

    /// `(path, driver name)` of every open device.
    pub fn open_devices(&self) -> Vec<(String, &'static str)> {
        self.devices
            .iter()
            .map(|(_, d)| (d.meta().path.clone(), self.drivers[d.driver].driver.name()))
            .collect()
    }

    fn slot_of(&self, path: &str) -> Option<usize> {
        self.devices
            .iter()
            .find(|(_, d)| d.meta().path == path)
            .map(|(slot, _)| slot)
    }

    fn slot_of_joystick(&self, joystick: usize) -> Option<usize> {
        self.devices
            .iter()
            .find(|(_, d)| d.joysticks.contains(&joystick))
            .map(|(slot, _)| slot)
    }

    /// Metadata of the HID device a driver registered `joystick` for.
    pub fn joystick_meta(&self, joystick: usize) -> Option<&DeviceMeta> {
        let slot = self.slot_of_joystick(joystick)?;
        self.devices.get(slot).map(|d| d.meta())
    }

    /// Joysticks whose HID device was closed since the last call.
    pub fn take_closed_joysticks(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.closed_joysticks)
    }

    /// Enumerates the transport and lets the drivers claim devices.
    pub fn init(
        &mut self,
        poller: &mut dyn Poller,
        registrar: &mut dyn JoystickRegistrar,
    ) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }
        if self.drivers.is_empty() {
            self.initialized = true;
            return Ok(());
        }
        let Some(transport) = self.transport.as_deref_mut() else {
            return Err(Error::MissingHook("hid transport"));
        };

        for entry in &mut self.drivers {
            if let Err(e) = entry.driver.init() {
                warn!(driver = entry.driver.name(), error = %e, "HID driver disabled");
                entry.enabled = false;
            }
        }

        for pass in 0..MAX_ENUMERATION_PASSES {
            let mut reenumerated = false;
            for meta in transport.enumerate()? {
                if self
                    .devices
                    .iter()
                    .any(|(_, d)| d.meta().path == meta.path)
                {
                    continue;
                }
                reenumerated |= Self::claim(
                    &mut self.drivers,
                    &mut self.devices,
                    transport,
                    self.native_mode,
                    &meta,
                    poller,
                    registrar,
                );
            }
            if !reenumerated {
                break;
            }
            debug!(pass, "devices changed product id, enumerating again");
        }

        self.initialized = true;
        info!(open = self.devices.len(), "HID input ready");
        Ok(())
    }

    /// Offers one interface to the drivers. Returns `true` when a driver made
    /// it re-enumerate.
    fn claim(
        drivers: &mut [DriverEntry],
        devices: &mut SlotTable<OpenDevice>,
        transport: &mut dyn HidTransport,
        native_mode: NativeModeConfig,
        meta: &DeviceMeta,
        poller: &mut dyn Poller,
        registrar: &mut dyn JoystickRegistrar,
    ) -> bool {
        for (index, entry) in drivers.iter_mut().enumerate() {
            if !entry.enabled || !entry.driver.accepts(meta) {
                continue;
            }
            let name = entry.driver.name();
            let mut handle = match transport.open(meta) {
                Ok(h) => h,
                Err(e) => {
                    warn!(driver = name, path = %meta.path, error = %e, "cannot open HID device");
                    continue;
                }
            };
            let output = OutputQueue::new();
            let mut tracking = TrackingRegistrar {
                inner: &mut *registrar,
                registered: Vec::new(),
            };
            let mut ctx = OpenCtx {
                registrar: &mut tracking,
                transport: &mut *transport,
                output: output.clone(),
                native_mode,
            };
            let opened = entry.driver.open(handle.as_mut(), &mut ctx);
            let joysticks = tracking.registered;
            let device = match opened {
                Ok(OpenOutcome::Opened(device)) => device,
                Ok(OpenOutcome::Reenumerated) => {
                    handle.close();
                    return true;
                }
                Err(e) => {
                    debug!(driver = name, path = %meta.path, error = %e, "driver declined device");
                    handle.close();
                    continue;
                }
            };

            let open = OpenDevice {
                driver: index,
                handle,
                device,
                output,
                read_pending: false,
                write_pending: false,
                callbacks: None,
                joysticks,
            };
            let slot = match devices.insert(open) {
                Ok(slot) => slot,
                Err(mut open) => {
                    warn!(path = %meta.path, capacity = devices.capacity(), "too many HID devices");
                    open.device.close();
                    open.output.close();
                    open.handle.close();
                    return false;
                }
            };
            let token = Token::new(TokenKind::Hid, slot);
            if let Err(e) = poller.register(token, Interest::READ | Interest::WRITE | Interest::CLOSE) {
                warn!(path = %meta.path, error = %e, "cannot register HID device with poller");
                if let Some(mut open) = devices.remove(slot) {
                    open.device.close();
                    open.output.close();
                    open.handle.close();
                }
                return false;
            }
            info!(
                driver = name,
                slot,
                "HID device 0x{:04x}:0x{:04x} opened",
                meta.vid,
                meta.pid
            );
            return false;
        }
        false
    }

    /// Installs application callbacks on an open device.
    pub fn set_callbacks(&mut self, path: &str, callbacks: Box<dyn HidUserCallbacks>) -> Result<()> {
        let slot = self.slot_of(path).ok_or(Error::NoSuchDevice)?;
        self.install_callbacks(slot, callbacks)
    }

    /// Installs application callbacks on the device behind a joystick.
    pub fn set_joystick_callbacks(
        &mut self,
        joystick: usize,
        callbacks: Box<dyn HidUserCallbacks>,
    ) -> Result<()> {
        let slot = self.slot_of_joystick(joystick).ok_or(Error::NoSuchDevice)?;
        self.install_callbacks(slot, callbacks)
    }

    fn install_callbacks(&mut self, slot: usize, callbacks: Box<dyn HidUserCallbacks>) -> Result<()> {
        let dev = self.devices.get_mut(slot).ok_or(Error::NoSuchDevice)?;
        dev.callbacks = Some(callbacks);
        Ok(())
    }

    /// Output queue of an open device, for application-initiated writes.
    pub fn output(&self, path: &str) -> Option<OutputQueue> {
        let slot = self.slot_of(path)?;
        self.devices.get(slot).map(|d| d.output.clone())
    }

    /// Issues reads and flushes queued writes. Keeps going over every device
    /// and returns the first error seen.
    pub fn poll(&mut self) -> Result<()> {
        let mut first_err = None;
        for (slot, dev) in self.devices.iter_mut() {
            let token = Token::new(TokenKind::Hid, slot);
            let read = if dev.read_pending {
                dev.handle.poll_pending()
            } else {
                dev.read_pending = true;
                dev.handle.submit_read(token)
            };
            if let Err(e) = read {
                warn!(path = %dev.meta().path, error = %e, "HID read failed");
                dev.read_pending = false;
                first_err.get_or_insert(e);
            }

            if dev.write_pending {
                continue;
            }
            let written = match dev.output.pop() {
                Some(OutputReport::Output(data)) => {
                    dev.write_pending = true;
                    dev.handle.submit_write(token, data)
                }
                Some(OutputReport::Feature(data)) => dev.handle.send_feature_report(&data),
                None => Ok(()),
            };
            if let Err(e) = written {
                warn!(path = %dev.meta().path, error = %e, "HID write failed");
                dev.write_pending = false;
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn handle_completion(
        &mut self,
        completion: Completion,
        poller: &mut dyn Poller,
        out: &mut Vec<Event>,
    ) -> Result<()> {
        let token = completion.token();
        let slot = token.slot;
        let Some(dev) = self.devices.get_mut(slot) else {
            return Err(Error::UnknownToken(token));
        };

        match completion {
            Completion::Read { result: Ok(data), .. } if data.is_empty() => {
                debug!(path = %dev.meta().path, "HID device reported end of stream");
                self.close_device(slot, poller);
                Ok(())
            }
            Completion::Read { result: Ok(data), .. } => {
                dev.read_pending = false;
                if let Err(e) = dev.device.process(&data, out) {
                    warn!(path = %dev.meta().path, error = %e, "HID driver failed, closing device");
                    self.close_device(slot, poller);
                    return Err(e);
                }
                Ok(())
            }
            Completion::Read { result: Err(e), .. } => {
                warn!(path = %dev.meta().path, error = %e, "HID read error, closing device");
                self.close_device(slot, poller);
                Err(Error::Io(e))
            }
            Completion::Write { result, .. } => {
                dev.write_pending = false;
                if let Err(e) = &result {
                    warn!(path = %dev.meta().path, error = %e, "HID write error");
                }
                if let Some(cb) = dev.callbacks.as_mut() {
                    cb.on_write(&result);
                }
                Ok(())
            }
            Completion::Closed { .. } => {
                self.close_device(slot, poller);
                Ok(())
            }
        }
    }

    fn close_device(&mut self, slot: usize, poller: &mut dyn Poller) {
        let token = Token::new(TokenKind::Hid, slot);
        if let Err(e) = poller.remove(token) {
            debug!(slot, error = %e, "HID token was not registered");
        }
        let Some(mut dev) = self.devices.remove(slot) else {
            return;
        };
        if let Some(cb) = dev.callbacks.as_mut() {
            cb.on_close();
        }
        dev.device.close();
        dev.output.close();
        dev.handle.close();
        info!(path = %dev.meta().path, "HID device closed");
        self.closed_joysticks.append(&mut dev.joysticks);
    }

    /// Closes every device. Drivers stay registered; `init` may run again.
    pub fn quit(&mut self, poller: &mut dyn Poller) {
        for slot in self.devices.indices() {
            self.close_device(slot, poller);
        }
        self.closed_joysticks.clear();
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, HapticCaps};
    use crate::metadata::{HidMatch, ANY_INTERFACE};
    use crate::poll::LocalReactor;
    use crate::source::HapticSink;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct NoJoysticks;

    impl JoystickRegistrar for NoJoysticks {
        fn register_joystick(
            &mut self,
            _: &str,
            _: HapticCaps,
            _: Option<Box<dyn HapticSink>>,
        ) -> Result<usize> {
            Err(Error::NoJoystickSource)
        }
    }

    /// Emits one button event per report, tagged with `id`.
    struct Tagging {
        id: u16,
        ids: Vec<HidMatch>,
        fail_open: bool,
    }

    struct TaggingDevice {
        id: u16,
    }

    impl HidDriverDevice for TaggingDevice {
        fn process(&mut self, report: &[u8], out: &mut Vec<Event>) -> Result<()> {
            if report[0] == 0xff {
                return Err(Error::UnsupportedDevice);
            }
            out.push(Event::new(
                0,
                EventKind::JoystickButtonDown { button: self.id },
            ));
            Ok(())
        }
    }

    impl HidDriver for Tagging {
        fn name(&self) -> &'static str {
            "tagging"
        }

        fn ids(&self) -> &[HidMatch] {
            &self.ids
        }

        fn open(&mut self, _: &mut dyn HidHandle, _: &mut OpenCtx<'_>) -> Result<OpenOutcome> {
            if self.fail_open {
                return Err(Error::UnsupportedDevice);
            }
            Ok(OpenOutcome::Opened(Box::new(TaggingDevice { id: self.id })))
        }
    }

    fn setup(drivers: Vec<Tagging>) -> (HidInput, MemoryDevice, LocalReactor) {
        let reactor = LocalReactor::new();
        let mut transport = MemoryTransport::new(reactor.completions());
        let dev = transport.add_device(DeviceMeta::new(0x1234, 0x5678, "mem:0"));
        let mut hid = HidInput::new().with_transport(transport);
        for d in drivers {
            hid.register(Box::new(d)).unwrap();
        }
        (hid, dev, reactor)
    }

    fn pump(hid: &mut HidInput, reactor: &mut LocalReactor) -> Vec<Event> {
        let mut out = Vec::new();
        hid.poll().unwrap();
        for c in reactor.take_completions() {
            let _ = hid.handle_completion(c, reactor, &mut out);
        }
        out
    }

    #[test]
    fn only_matching_driver_receives_reports() {
        let (mut hid, dev, mut reactor) = setup(vec![
            Tagging {
                id: 1,
                ids: vec![HidMatch::new(0x1234, 0x9999, ANY_INTERFACE)],
                fail_open: false,
            },
            Tagging {
                id: 2,
                ids: vec![HidMatch::new(0x1234, 0x5678, ANY_INTERFACE)],
                fail_open: false,
            },
        ]);
        hid.init(&mut reactor, &mut NoJoysticks).unwrap();
        assert_eq!(hid.open_count(), 1);

        dev.push_report(&[0x01]);
        let out = pump(&mut hid, &mut reactor);
        assert_eq!(
            out,
            vec![Event::new(0, EventKind::JoystickButtonDown { button: 2 })]
        );
    }

    #[test]
    fn failed_open_falls_through_to_next_driver() {
        let ids = vec![HidMatch::new(0x1234, 0x5678, ANY_INTERFACE)];
        let (mut hid, dev, mut reactor) = setup(vec![
            Tagging {
                id: 1,
                ids: ids.clone(),
                fail_open: true,
            },
            Tagging {
                id: 2,
                ids,
                fail_open: false,
            },
        ]);
        hid.init(&mut reactor, &mut NoJoysticks).unwrap();
        assert_eq!(hid.open_devices(), vec![("mem:0".to_owned(), "tagging")]);
        assert!(dev.is_open());
    }

    #[test]
    fn driver_error_closes_the_device() {
        let ids = vec![HidMatch::new(0x1234, 0x5678, ANY_INTERFACE)];
        let (mut hid, dev, mut reactor) = setup(vec![Tagging {
            id: 7,
            ids,
            fail_open: false,
        }]);
        hid.init(&mut reactor, &mut NoJoysticks).unwrap();
        assert_eq!(reactor.registered_count(), 1);

        dev.push_report(&[0xff]);
        let out = pump(&mut hid, &mut reactor);
        assert!(out.is_empty());
        assert_eq!(hid.open_count(), 0);
        assert_eq!(reactor.registered_count(), 0);
        assert!(!dev.is_open());
    }

    #[test]
    fn unplug_closes_and_notifies_callbacks() {
        struct Flag(Rc<RefCell<bool>>);
        impl HidUserCallbacks for Flag {
            fn on_close(&mut self) {
                *self.0.borrow_mut() = true;
            }
        }

        let ids = vec![HidMatch::new(0x1234, 0x5678, ANY_INTERFACE)];
        let (mut hid, dev, mut reactor) = setup(vec![Tagging {
            id: 7,
            ids,
            fail_open: false,
        }]);
        hid.init(&mut reactor, &mut NoJoysticks).unwrap();
        let closed = Rc::new(RefCell::new(false));
        hid.set_callbacks("mem:0", Box::new(Flag(closed.clone())))
            .unwrap();
        assert!(matches!(
            hid.set_callbacks("mem:1", Box::new(Flag(closed.clone()))),
            Err(Error::NoSuchDevice)
        ));

        dev.unplug();
        pump(&mut hid, &mut reactor);
        assert!(*closed.borrow());
        assert_eq!(hid.open_count(), 0);
    }

    type Log = Rc<RefCell<Vec<&'static str>>>;

    /// Registers one joystick per device and logs teardown.
    struct Logging {
        ids: Vec<HidMatch>,
        log: Log,
    }

    struct LoggingDevice(Log);

    impl HidDriverDevice for LoggingDevice {
        fn process(&mut self, _: &[u8], _: &mut Vec<Event>) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) {
            self.0.borrow_mut().push("driver close");
        }
    }

    impl HidDriver for Logging {
        fn name(&self) -> &'static str {
            "logging"
        }

        fn ids(&self) -> &[HidMatch] {
            &self.ids
        }

        fn open(&mut self, _: &mut dyn HidHandle, ctx: &mut OpenCtx<'_>) -> Result<OpenOutcome> {
            ctx.registrar
                .register_joystick("Logged Pad", HapticCaps::empty(), None)?;
            Ok(OpenOutcome::Opened(Box::new(LoggingDevice(self.log.clone()))))
        }
    }

    struct LoggingCallbacks(Log);

    impl HidUserCallbacks for LoggingCallbacks {
        fn on_close(&mut self) {
            self.0.borrow_mut().push("user close");
        }
    }

    /// Hands out joystick indices from 3 upwards.
    struct FromThree(usize);

    impl JoystickRegistrar for FromThree {
        fn register_joystick(
            &mut self,
            _: &str,
            _: HapticCaps,
            _: Option<Box<dyn HapticSink>>,
        ) -> Result<usize> {
            self.0 += 1;
            Ok(self.0 + 2)
        }
    }

    fn logging_setup() -> (HidInput, MemoryDevice, LocalReactor, Log) {
        let reactor = LocalReactor::new();
        let mut transport = MemoryTransport::new(reactor.completions());
        let mut meta = DeviceMeta::new(0x1234, 0x5678, "mem:0");
        meta.release = 0x0102;
        let dev = transport.add_device(meta);
        let log = Log::default();
        let hid = HidInput::new().with_transport(transport).with_driver(Logging {
            ids: vec![HidMatch::new(0x1234, 0x5678, ANY_INTERFACE)],
            log: log.clone(),
        });
        (hid, dev, reactor, log)
    }

    #[test]
    fn user_close_callback_runs_before_teardown() {
        let (mut hid, dev, mut reactor, log) = logging_setup();
        hid.init(&mut reactor, &mut FromThree(0)).unwrap();
        hid.set_joystick_callbacks(3, Box::new(LoggingCallbacks(log.clone())))
            .unwrap();
        assert!(matches!(
            hid.set_joystick_callbacks(4, Box::new(LoggingCallbacks(log.clone()))),
            Err(Error::NoSuchDevice)
        ));

        dev.unplug();
        pump(&mut hid, &mut reactor);
        assert_eq!(*log.borrow(), vec!["user close", "driver close"]);
        assert_eq!(reactor.registered_count(), 0);
    }

    #[test]
    fn closed_devices_report_their_joysticks_once() {
        let (mut hid, dev, mut reactor, _) = logging_setup();
        hid.init(&mut reactor, &mut FromThree(0)).unwrap();
        let meta = hid.joystick_meta(3).unwrap();
        assert_eq!((meta.vid, meta.pid, meta.release), (0x1234, 0x5678, 0x0102));
        assert!(hid.joystick_meta(0).is_none());

        dev.unplug();
        pump(&mut hid, &mut reactor);
        assert_eq!(hid.take_closed_joysticks(), vec![3]);
        assert!(hid.take_closed_joysticks().is_empty());
        assert!(hid.joystick_meta(3).is_none());
    }

    #[test]
    fn quit_does_not_report_closed_joysticks() {
        let (mut hid, _dev, mut reactor, log) = logging_setup();
        hid.init(&mut reactor, &mut FromThree(0)).unwrap();
        hid.quit(&mut reactor);
        assert!(hid.take_closed_joysticks().is_empty());
        assert_eq!(*log.borrow(), vec!["driver close"]);
    }

    #[test]
    fn queued_output_is_written_one_per_poll() {
        let ids = vec![HidMatch::new(0x1234, 0x5678, ANY_INTERFACE)];
        let (mut hid, dev, mut reactor) = setup(vec![Tagging {
            id: 7,
            ids,
            fail_open: false,
        }]);
        hid.init(&mut reactor, &mut NoJoysticks).unwrap();
        let out = hid.output("mem:0").unwrap();
        out.push(OutputReport::Output(vec![1])).unwrap();
        out.push(OutputReport::Output(vec![2])).unwrap();

        hid.poll().unwrap();
        assert_eq!(dev.written(), vec![vec![1]]);
        // The write completion is still in the reactor, nothing more goes out.
        hid.poll().unwrap();
        assert_eq!(dev.written().len(), 1);

        pump(&mut hid, &mut reactor);
        hid.poll().unwrap();
        assert_eq!(dev.written(), vec![vec![1], vec![2]]);
    }

    #[test]
    fn init_without_transport_fails() {
        let mut hid = HidInput::new().with_driver(Tagging {
            id: 0,
            ids: Vec::new(),
            fail_open: false,
        });
        let mut reactor = LocalReactor::new();
        assert!(matches!(
            hid.init(&mut reactor, &mut NoJoysticks),
            Err(Error::MissingHook("hid transport"))
        ));
    }
}
