//! The input manager.
//!
//! [`Manager`] ties the pieces together: it owns the dispatch core, the HID
//! subsystem, the device registry and the event queue, and it is the only
//! thing that calls the application callback.
//!
//! Lifecycle:
//! 1. [`Manager::new`] with a config, the registered sources and HID drivers.
//! 2. Optionally [`Manager::register_joystick`] for software joysticks.
//! 3. [`Manager::init`] (or [`Manager::init_configured`]) brings up HID, then
//!    the dispatch core, then builds the device tables.
//! 4. The host calls [`Manager::periodic_task`] on every loop iteration, and
//!    [`Manager::complete`] for completions its reactor delivers directly.
//! 5. [`Manager::quit`] tears everything down; `init` may run again.
//!
//! A joystick whose device goes away while running (HID unplug, evdev read
//! error) is closed once and dropped from the tables on the same pass.

use crate::config::{GinputConfig, MkMode};
use crate::dispatch::EventDispatch;
use crate::error::{Error, Result};
use crate::event::{DeviceClass, Event, HapticCaps, HapticEffect, MouseButton};
use crate::eventbus::{deliver_all, EventCallback};
use crate::hats::HatTranslator;
use crate::names;
use crate::hid::{HidInput, HidUserCallbacks};
use crate::poll::{Completion, Poller, TokenKind};
use crate::queue::EventQueue;
use crate::registry::{builtin_aliases, DeviceRegistry, JoystickType};
use crate::snapshot::RegistrySnapshot;
use crate::source::{GrabMode, HapticSink, JoystickRegistrar, SourceKind, SourceRegistry};
use tracing::{debug, info, warn};

pub struct Manager {
    config: GinputConfig,
    dispatch: EventDispatch,
    hid: HidInput,
    registry: DeviceRegistry,
    queue: EventQueue,
    hats: Option<HatTranslator>,
    poller: Option<Box<dyn Poller>>,
    callback: Option<Box<dyn EventCallback>>,
    grabbed: bool,
    mk_mode: MkMode,
}

impl Manager {
    pub fn new(config: GinputConfig, sources: SourceRegistry, mut hid: HidInput) -> Result<Self> {
        config.validate()?;
        let mut aliases = builtin_aliases();
        aliases.extend(config.aliases.iter().cloned());
        hid.set_native_mode(config.native_mode);

        Ok(Self {
            dispatch: EventDispatch::new(sources),
            hid,
            registry: DeviceRegistry::new(config.max_devices, aliases),
            queue: EventQueue::with_capacity(config.queue_capacity),
            hats: config.hats_as_buttons.then(HatTranslator::new),
            poller: None,
            callback: None,
            grabbed: false,
            mk_mode: MkMode::from_single_input(config.single_input),
            config,
        })
    }

    pub fn config(&self) -> &GinputConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.poller.is_some()
    }

    /// Adds a software joystick to the joystick source. Only legal before
    /// `init`.
    pub fn register_joystick(
        &mut self,
        name: &str,
        caps: HapticCaps,
        sink: Option<Box<dyn HapticSink>>,
    ) -> Result<usize> {
        if self.is_initialized() {
            return Err(Error::AlreadyInitialized);
        }
        self.dispatch.register_joystick(name, caps, sink)
    }

    /// [`Manager::init`] with the source kind named in the config.
    pub fn init_configured(
        &mut self,
        poller: Box<dyn Poller>,
        callback: Box<dyn EventCallback>,
    ) -> Result<()> {
        let kind = self.config.mkb_source;
        self.init(poller, kind, callback)
    }

    pub fn init(
        &mut self,
        mut poller: Box<dyn Poller>,
        kind: SourceKind,
        callback: Box<dyn EventCallback>,
    ) -> Result<()> {
        if self.is_initialized() {
            return Err(Error::AlreadyInitialized);
        }

        self.hid.init(poller.as_mut(), &mut self.dispatch)?;
        if let Err(e) = self.dispatch.init(kind, poller.as_mut()) {
            self.hid.quit(poller.as_mut());
            return Err(e);
        }

        let dispatch = &self.dispatch;
        self.registry
            .populate(DeviceClass::Mouse, |i| dispatch.mouse_name(i));
        self.registry
            .populate(DeviceClass::Keyboard, |i| dispatch.keyboard_name(i));
        self.registry
            .populate(DeviceClass::Joystick, |i| dispatch.joystick_name(i));

        info!(
            ?kind,
            keyboards = self.registry.count(DeviceClass::Keyboard),
            mice = self.registry.count(DeviceClass::Mouse),
            joysticks = self.registry.count(DeviceClass::Joystick),
            hid_devices = self.hid.open_count(),
            "input manager initialized"
        );
        self.poller = Some(poller);
        self.callback = Some(callback);
        Ok(())
    }

    /// Closes every device and drops the tables. Does nothing when not
    /// initialized.
    pub fn quit(&mut self) {
        let Some(mut poller) = self.poller.take() else {
            return;
        };
        let joysticks: Vec<usize> = self
            .registry
            .records(DeviceClass::Joystick)
            .map(|(i, _)| i)
            .collect();
        for index in joysticks {
            self.dispatch.joystick_close(index, poller.as_mut());
        }
        self.registry.clear();
        if let Some(hats) = self.hats.as_mut() {
            *hats = HatTranslator::new();
        }
        self.dispatch.quit(poller.as_mut());
        self.hid.quit(poller.as_mut());
        self.queue.clear();
        self.callback = None;
        self.grabbed = false;
        info!("input manager shut down");
    }

    pub fn grab(&mut self, on: bool) -> Result<()> {
        self.dispatch.grab(GrabMode::from(on))?;
        self.grabbed = on;
        debug!(grabbed = on, "grab state changed");
        Ok(())
    }

    pub fn grab_toggle(&mut self) -> Result<()> {
        self.grab(!self.grabbed)
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    /// Closes every joystick that was never marked used. Returns the closed
    /// indices; a second call closes nothing.
    pub fn release_unused(&mut self) -> Vec<usize> {
        let released = self.registry.release_unused();
        if let Some(poller) = self.poller.as_deref_mut() {
            for &index in &released {
                self.dispatch.joystick_close(index, poller);
            }
        }
        if let Some(hats) = self.hats.as_mut() {
            for &index in &released {
                hats.forget(index);
            }
        }
        if !released.is_empty() {
            debug!(?released, "unused joysticks released");
        }
        released
    }

    pub fn keyboard_name(&self, index: usize) -> Option<&str> {
        self.registry.name(DeviceClass::Keyboard, index)
    }

    pub fn mouse_name(&self, index: usize) -> Option<&str> {
        self.registry.name(DeviceClass::Mouse, index)
    }

    pub fn joystick_name(&self, index: usize) -> Option<&str> {
        self.registry.name(DeviceClass::Joystick, index)
    }

    pub fn keyboard_virtual_id(&self, index: usize) -> usize {
        self.registry.virtual_index(DeviceClass::Keyboard, index)
    }

    pub fn mouse_virtual_id(&self, index: usize) -> usize {
        self.registry.virtual_index(DeviceClass::Mouse, index)
    }

    pub fn joystick_virtual_id(&self, index: usize) -> usize {
        self.registry.virtual_index(DeviceClass::Joystick, index)
    }

    pub fn joystick_used(&self, index: usize) -> bool {
        self.registry.joystick_used(index)
    }

    pub fn set_joystick_used(&mut self, index: usize) -> bool {
        self.registry.set_joystick_used(index)
    }

    pub fn joystick_type(&self, index: usize) -> JoystickType {
        self.registry.joystick_type(index)
    }

    pub fn device_count(&self, class: DeviceClass) -> usize {
        self.registry.count(class)
    }

    /// Haptic capabilities of a joystick. Known families fall back to their
    /// default set when the backend reports none.
    pub fn joystick_haptic(&self, index: usize) -> HapticCaps {
        if self.registry.record(DeviceClass::Joystick, index).is_none() {
            return HapticCaps::empty();
        }
        let caps = self.dispatch.joystick_haptic(index);
        if caps.is_empty() {
            self.registry.joystick_type(index).default_haptic()
        } else {
            caps
        }
    }

    pub fn set_haptic(&mut self, index: usize, effect: &HapticEffect) -> Result<()> {
        if self.registry.record(DeviceClass::Joystick, index).is_none() {
            return Err(Error::NoSuchDevice);
        }
        if !self.joystick_haptic(index).contains(effect.kind().cap()) {
            return Err(Error::NotHaptic);
        }
        self.dispatch.set_haptic(index, effect)
    }

    /// Path of the HID device behind a joystick, if any.
    pub fn joystick_hid(&self, index: usize) -> Option<&str> {
        self.dispatch.joystick_hid(index)
    }

    /// `(vendor id, product id)` of the HID device a driver opened for a
    /// joystick.
    pub fn joystick_usb_ids(&self, index: usize) -> Option<(u16, u16)> {
        self.registry.record(DeviceClass::Joystick, index)?;
        self.hid.joystick_meta(index).map(|m| (m.vid, m.pid))
    }

    /// Installs write/close callbacks on the HID device behind a joystick.
    pub fn set_joystick_hid_callbacks(
        &mut self,
        index: usize,
        callbacks: Box<dyn HidUserCallbacks>,
    ) -> Result<()> {
        self.hid.set_joystick_callbacks(index, callbacks)
    }

    pub fn mk_mode(&self) -> MkMode {
        self.mk_mode
    }

    pub fn set_mk_mode(&mut self, mode: MkMode) {
        if mode != self.mk_mode {
            debug!(?mode, "mouse/keyboard mode changed");
        }
        self.mk_mode = mode;
    }

    /// Device index to report for `event`. In single-input mode every keyboard
    /// and mouse is device 0; joysticks keep their index.
    pub fn get_device_id(&self, event: &Event) -> usize {
        match event.class() {
            DeviceClass::Keyboard | DeviceClass::Mouse if self.mk_mode == MkMode::SingleInput => 0,
            _ => event.device,
        }
    }

    pub fn key_name(&self, keysym: u16) -> Option<&'static str> {
        names::key_name(keysym)
    }

    pub fn key_id(&self, name: &str) -> Option<u16> {
        names::key_id(name)
    }

    pub fn mouse_button_name(&self, button: MouseButton) -> &'static str {
        names::mouse_button_name(button)
    }

    pub fn mouse_button_id(&self, name: &str) -> Option<MouseButton> {
        names::mouse_button_id(name)
    }

    pub fn queue_push(&self, event: Event) -> Result<()> {
        self.queue.push(event)
    }

    pub fn queue_pop(&self, max: usize) -> Vec<Event> {
        self.queue.pop(max)
    }

    /// Shared handle to the event queue, e.g. for [`EventQueue::sink`].
    pub fn queue(&self) -> EventQueue {
        self.queue.clone()
    }

    pub fn hid(&self) -> &HidInput {
        &self.hid
    }

    pub fn hid_mut(&mut self) -> &mut HidInput {
        &mut self.hid
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot::capture(&self.registry, self.grabbed)
    }

    /// One pass of the synchronous work: HID reads and writes, window-system
    /// pumps, and completions buffered by the poller. Every stage runs even
    /// if an earlier one failed; the first error is returned.
    pub fn periodic_task(&mut self) -> Result<()> {
        let poller = self.poller.as_deref_mut().ok_or(Error::NotInitialized)?;
        let mut out = Vec::new();
        let mut first_err = None;

        if let Err(e) = self.hid.poll() {
            first_err.get_or_insert(e);
        }
        if let Err(e) = self.dispatch.sync_process(&mut out) {
            first_err.get_or_insert(e);
        }
        for completion in poller.take_completions() {
            let routed = route(
                &mut self.dispatch,
                &mut self.hid,
                completion,
                poller,
                &mut out,
            );
            match routed {
                // Closed earlier in this batch.
                Err(Error::UnknownToken(token)) => {
                    debug!(?token, "completion for a closed device skipped");
                }
                Err(e) => {
                    first_err.get_or_insert(e);
                }
                Ok(()) => {}
            }
        }
        reap_closed(
            &mut self.dispatch,
            &mut self.hid,
            &mut self.registry,
            self.hats.as_mut(),
            poller,
        );

        if let Err(e) = self.deliver(&out) {
            first_err.get_or_insert(e);
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Handles one completion delivered by the host's reactor.
    pub fn complete(&mut self, completion: Completion) -> Result<()> {
        let poller = self.poller.as_deref_mut().ok_or(Error::NotInitialized)?;
        let mut out = Vec::new();
        let routed = route(
            &mut self.dispatch,
            &mut self.hid,
            completion,
            poller,
            &mut out,
        );
        reap_closed(
            &mut self.dispatch,
            &mut self.hid,
            &mut self.registry,
            self.hats.as_mut(),
            poller,
        );
        let delivered = self.deliver(&out);
        routed.and(delivered)
    }

    fn deliver(&mut self, events: &[Event]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let Some(callback) = self.callback.as_deref_mut() else {
            warn!(count = events.len(), "events dropped, no callback installed");
            return Ok(());
        };
        match self.hats.as_mut() {
            Some(hats) => {
                let dispatch = &self.dispatch;
                let translated =
                    hats.translate_all(events, |device| dispatch.joystick_button_count(device));
                deliver_all(callback, &translated)
            }
            None => deliver_all(callback, events),
        }
    }
}

fn route(
    dispatch: &mut EventDispatch,
    hid: &mut HidInput,
    completion: Completion,
    poller: &mut dyn Poller,
    out: &mut Vec<Event>,
) -> Result<()> {
    match completion.token().kind {
        TokenKind::Hid => hid.handle_completion(completion, poller, out),
        TokenKind::Mkb | TokenKind::Joystick => dispatch.handle_completion(completion, poller, out),
    }
}

/// Drops joysticks whose device went away from the tables. Joysticks a HID
/// driver registered are closed in the joystick source first.
fn reap_closed(
    dispatch: &mut EventDispatch,
    hid: &mut HidInput,
    registry: &mut DeviceRegistry,
    mut hats: Option<&mut HatTranslator>,
    poller: &mut dyn Poller,
) {
    let from_hid = hid.take_closed_joysticks();
    for &index in &from_hid {
        dispatch.joystick_close(index, poller);
    }
    let lost = dispatch.take_closed_joysticks();
    for index in from_hid.into_iter().chain(lost) {
        if registry.remove(DeviceClass::Joystick, index).is_some() {
            info!(index, "joystick removed");
        }
        if let Some(hats) = hats.as_deref_mut() {
            hats.forget(index);
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.quit();
    }
}
