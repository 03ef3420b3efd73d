//! Source abstraction.
//!
//! Platform backends implement [`MkbSource`] (mouse + keyboard) and/or
//! [`JsSource`] (joysticks) and are registered in a [`SourceRegistry`] when the
//! host builds the manager. At `init` the dispatch core activates the mkb source
//! registered for the requested [`SourceKind`] together with the (single)
//! joystick source.
//!
//! Backends never call the application directly: whatever they decode is
//! appended to the `out` buffer they are handed, and the manager delivers it.

use crate::error::{Error, Result};
use crate::event::{Event, HapticCaps, HapticEffect};
use crate::poll::{Completion, Poller};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Which layer a mouse/keyboard backend reads from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Kernel input devices (evdev).
    #[default]
    Physical,
    /// Window-system input (X11 / SDL style event pump).
    Window,
    /// OS input hooks (e.g. Windows raw input).
    Platform,
    /// Software-fed devices.
    Virtual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrabMode {
    Off,
    On,
}

impl From<bool> for GrabMode {
    fn from(on: bool) -> Self {
        if on {
            GrabMode::On
        } else {
            GrabMode::Off
        }
    }
}

/// Identifies the event pump behind a backend's `sync_process`.
///
/// When the mkb and joystick sources report the same key, the pump is run only
/// once per sync pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SyncKey(pub &'static str);

/// Receives force-feedback commands for a software-registered joystick.
pub trait HapticSink {
    fn play(&mut self, effect: &HapticEffect) -> Result<()>;
}

impl<F> HapticSink for F
where
    F: FnMut(&HapticEffect) -> Result<()>,
{
    fn play(&mut self, effect: &HapticEffect) -> Result<()> {
        self(effect)
    }
}

/// Registers software-emulated joysticks (no physical backend device).
pub trait JoystickRegistrar {
    fn register_joystick(
        &mut self,
        name: &str,
        caps: HapticCaps,
        sink: Option<Box<dyn HapticSink>>,
    ) -> Result<usize>;
}

/// Mouse + keyboard backend.
pub trait MkbSource {
    fn kind(&self) -> SourceKind;

    fn init(&mut self, poller: &mut dyn Poller) -> Result<()>;

    fn grab(&mut self, mode: GrabMode) -> Result<()>;

    /// Name of mouse `index`, `None` once past the last device.
    fn mouse_name(&self, index: usize) -> Option<&[u8]>;

    fn keyboard_name(&self, index: usize) -> Option<&[u8]>;

    /// Handles a reactor notification for one of this source's tokens.
    fn handle_completion(
        &mut self,
        completion: Completion,
        poller: &mut dyn Poller,
        out: &mut Vec<Event>,
    ) -> Result<()> {
        let _ = (poller, out);
        Err(Error::UnknownToken(completion.token()))
    }

    fn sync_key(&self) -> Option<SyncKey> {
        None
    }

    fn sync_process(&mut self, out: &mut Vec<Event>) -> Result<()> {
        let _ = out;
        Ok(())
    }

    fn quit(&mut self, poller: &mut dyn Poller);
}

/// Joystick backend.
pub trait JsSource {
    fn init(&mut self, poller: &mut dyn Poller) -> Result<()>;

    /// Name of joystick `index`, `None` once past the last device.
    fn name(&self, index: usize) -> Option<&[u8]>;

    /// Adds a software joystick; legal before `init`.
    fn add(
        &mut self,
        name: &str,
        caps: HapticCaps,
        sink: Option<Box<dyn HapticSink>>,
    ) -> Result<usize>;

    /// Physical button count, the base for hat-folded buttons.
    fn button_count(&self, index: usize) -> usize {
        let _ = index;
        0
    }

    fn haptic_caps(&self, index: usize) -> HapticCaps;

    fn set_haptic(&mut self, index: usize, effect: &HapticEffect) -> Result<()>;

    /// Path of the HID device behind a joystick, if the backend knows it.
    fn hid_path(&self, index: usize) -> Option<&str> {
        let _ = index;
        None
    }

    fn close(&mut self, index: usize, poller: &mut dyn Poller);

    /// Joysticks the backend dropped on its own (device lost) since the last call.
    fn take_closed(&mut self) -> Vec<usize> {
        Vec::new()
    }

    fn handle_completion(
        &mut self,
        completion: Completion,
        poller: &mut dyn Poller,
        out: &mut Vec<Event>,
    ) -> Result<()> {
        let _ = (poller, out);
        Err(Error::UnknownToken(completion.token()))
    }

    fn sync_key(&self) -> Option<SyncKey> {
        None
    }

    fn sync_process(&mut self, out: &mut Vec<Event>) -> Result<()> {
        let _ = out;
        Ok(())
    }

    fn quit(&mut self, poller: &mut dyn Poller);
}

/// A joystick that exists only in software; events for it are synthesized by
/// whoever registered it.
pub struct SoftJoystick {
    pub name: String,
    pub caps: HapticCaps,
    sink: Option<Box<dyn HapticSink>>,
}

impl SoftJoystick {
    pub fn new(name: &str, caps: HapticCaps, sink: Option<Box<dyn HapticSink>>) -> Self {
        Self {
            name: name.to_owned(),
            caps,
            sink,
        }
    }

    pub fn play(&mut self, effect: &HapticEffect) -> Result<()> {
        if !self.caps.contains(effect.kind().cap()) {
            return Err(Error::UnsupportedDevice);
        }
        match self.sink.as_mut() {
            Some(sink) => sink.play(effect),
            None => Err(Error::UnsupportedDevice),
        }
    }
}

impl fmt::Debug for SoftJoystick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftJoystick")
            .field("name", &self.name)
            .field("caps", &self.caps)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

/// Backends available to the dispatch core, keyed by kind.
#[derive(Default)]
pub struct SourceRegistry {
    mkb: HashMap<SourceKind, Box<dyn MkbSource>>,
    js: Option<Box<dyn JsSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an mkb backend in the slot of its kind, replacing any previous one.
    pub fn register_mkb(&mut self, source: Box<dyn MkbSource>) {
        let kind = source.kind();
        if self.mkb.insert(kind, source).is_some() {
            warn!(?kind, "replacing registered mouse/keyboard source");
        }
    }

    /// Sets the joystick backend, replacing any previous one.
    pub fn register_js(&mut self, source: Box<dyn JsSource>) {
        if self.js.replace(source).is_some() {
            warn!("replacing registered joystick source");
        }
    }

    pub fn with_mkb(mut self, source: impl MkbSource + 'static) -> Self {
        self.register_mkb(Box::new(source));
        self
    }

    pub fn with_js(mut self, source: impl JsSource + 'static) -> Self {
        self.register_js(Box::new(source));
        self
    }

    pub fn has_mkb(&self, kind: SourceKind) -> bool {
        self.mkb.contains_key(&kind)
    }

    pub fn mkb_kinds(&self) -> Vec<SourceKind> {
        self.mkb.keys().copied().collect()
    }

    pub(crate) fn take_mkb(&mut self, kind: SourceKind) -> Option<Box<dyn MkbSource>> {
        self.mkb.remove(&kind)
    }

    pub(crate) fn restore_mkb(&mut self, source: Box<dyn MkbSource>) {
        self.mkb.insert(source.kind(), source);
    }

    pub(crate) fn js_mut(&mut self) -> Option<&mut Box<dyn JsSource>> {
        self.js.as_mut()
    }

    pub(crate) fn js(&self) -> Option<&dyn JsSource> {
        self.js.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::HapticEffect;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn soft_joystick_checks_caps() {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let sink = move |_: &HapticEffect| -> Result<()> {
            h.set(h.get() + 1);
            Ok(())
        };
        let mut js = SoftJoystick::new("pad", HapticCaps::RUMBLE, Some(Box::new(sink)));

        js.play(&HapticEffect::Rumble { weak: 1, strong: 2 }).unwrap();
        let constant = HapticEffect::Constant {
            level: 10,
            direction: 0,
        };
        assert!(matches!(js.play(&constant), Err(Error::UnsupportedDevice)));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn grab_mode_from_bool() {
        assert_eq!(GrabMode::from(true), GrabMode::On);
        assert_eq!(GrabMode::from(false), GrabMode::Off);
    }
}
