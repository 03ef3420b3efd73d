//! Software-fed backends.
//!
//! [`VirtualMkb`] and [`VirtualJoysticks`] have no OS devices behind them: events
//! are injected through a [`VirtualFeed`] handle and released on the next sync
//! pass. They serve hosts that synthesize input, and keyboard/mouse-less setups
//! that only need software joysticks.

use crate::error::{Error, Result};
use crate::event::{Event, EventKind, HapticCaps, HapticEffect, MouseButton};
use crate::poll::Poller;
use crate::slots::SlotTable;
use crate::source::{
    GrabMode, HapticSink, JsSource, MkbSource, SoftJoystick, SourceKind, SyncKey,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

const MAX_JOYSTICKS: usize = 256;

#[derive(Debug, Default)]
struct FeedState {
    events: VecDeque<Event>,
    unplugged: Vec<usize>,
}

/// Injection handle shared with a virtual backend.
#[derive(Clone, Debug, Default)]
pub struct VirtualFeed(Rc<RefCell<FeedState>>);

impl VirtualFeed {
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().events.push_back(event);
    }

    /// Simulates losing a joystick; applied on the next sync pass.
    pub fn unplug(&self, joystick: usize) {
        self.0.borrow_mut().unplugged.push(joystick);
    }

    pub fn key(&self, keyboard: usize, keysym: u16, down: bool) {
        let kind = if down {
            EventKind::KeyDown { keysym }
        } else {
            EventKind::KeyUp { keysym }
        };
        self.push(Event::new(keyboard, kind));
    }

    pub fn move_mouse(&self, mouse: usize, dx: i32, dy: i32) {
        self.push(Event::new(mouse, EventKind::MouseMotion { dx, dy }));
    }

    pub fn click(&self, mouse: usize, button: MouseButton) {
        self.push(Event::new(mouse, EventKind::MouseButtonDown { button }));
        self.push(Event::new(mouse, EventKind::MouseButtonUp { button }));
    }

    pub fn set_axis(&self, joystick: usize, axis: u8, value: i16) {
        self.push(Event::new(joystick, EventKind::JoystickAxis { axis, value }));
    }

    pub fn press_button(&self, joystick: usize, button: u16) {
        self.push(Event::new(joystick, EventKind::JoystickButtonDown { button }));
    }

    pub fn release_button(&self, joystick: usize, button: u16) {
        self.push(Event::new(joystick, EventKind::JoystickButtonUp { button }));
    }

    pub fn set_hat(&self, joystick: usize, hat: u8, value: u8) {
        self.push(Event::new(joystick, EventKind::JoystickHat { hat, value }));
    }

    fn drain_into(&self, out: &mut Vec<Event>) {
        out.extend(self.0.borrow_mut().events.drain(..));
    }

    fn take_unplugged(&self) -> Vec<usize> {
        std::mem::take(&mut self.0.borrow_mut().unplugged)
    }
}

/// Software mouse + keyboard source.
#[derive(Debug, Default)]
pub struct VirtualMkb {
    mice: Vec<String>,
    keyboards: Vec<String>,
    feed: VirtualFeed,
    grabbed: bool,
}

impl VirtualMkb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mouse(mut self, name: &str) -> Self {
        self.mice.push(name.to_owned());
        self
    }

    pub fn with_keyboard(mut self, name: &str) -> Self {
        self.keyboards.push(name.to_owned());
        self
    }

    pub fn feed(&self) -> VirtualFeed {
        self.feed.clone()
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }
}

impl MkbSource for VirtualMkb {
    fn kind(&self) -> SourceKind {
        SourceKind::Virtual
    }

    fn init(&mut self, _poller: &mut dyn Poller) -> Result<()> {
        debug!(
            mice = self.mice.len(),
            keyboards = self.keyboards.len(),
            "virtual mkb source initialized"
        );
        Ok(())
    }

    fn grab(&mut self, mode: GrabMode) -> Result<()> {
        self.grabbed = mode == GrabMode::On;
        Ok(())
    }

    fn mouse_name(&self, index: usize) -> Option<&[u8]> {
        self.mice.get(index).map(|s| s.as_bytes())
    }

    fn keyboard_name(&self, index: usize) -> Option<&[u8]> {
        self.keyboards.get(index).map(|s| s.as_bytes())
    }

    fn sync_key(&self) -> Option<SyncKey> {
        Some(SyncKey("virtual-mkb"))
    }

    fn sync_process(&mut self, out: &mut Vec<Event>) -> Result<()> {
        self.feed.drain_into(out);
        Ok(())
    }

    fn quit(&mut self, _poller: &mut dyn Poller) {
        self.grabbed = false;
    }
}

#[derive(Clone, Debug)]
struct FedStick {
    name: String,
    buttons: usize,
    caps: HapticCaps,
}

#[derive(Debug)]
enum VirtualStick {
    Fed(FedStick),
    Soft(SoftJoystick),
}

/// Software joystick source. Hosts declare "fed" joysticks up front; software
/// joysticks arrive through [`JsSource::add`].
///
/// Fed joysticks outlive `quit` and come back on the next session, like
/// devices that are still plugged in. Software joysticks belong to the session
/// that registered them.
#[derive(Debug)]
pub struct VirtualJoysticks {
    declared: Vec<FedStick>,
    sticks: SlotTable<VirtualStick>,
    lost: Vec<usize>,
    feed: VirtualFeed,
    played: Rc<RefCell<Vec<(usize, HapticEffect)>>>,
    closed: Rc<RefCell<Vec<usize>>>,
    sync_key: SyncKey,
}

impl Default for VirtualJoysticks {
    fn default() -> Self {
        Self {
            declared: Vec::new(),
            sticks: SlotTable::with_capacity(MAX_JOYSTICKS),
            lost: Vec::new(),
            feed: VirtualFeed::default(),
            played: Rc::default(),
            closed: Rc::default(),
            sync_key: SyncKey("virtual-js"),
        }
    }
}

impl VirtualJoysticks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a fed joystick with `buttons` physical buttons.
    pub fn with_joystick(mut self, name: &str, buttons: usize, caps: HapticCaps) -> Self {
        let stick = FedStick {
            name: name.to_owned(),
            buttons,
            caps,
        };
        if self.sticks.push(VirtualStick::Fed(stick.clone())).is_ok() {
            self.declared.push(stick);
        }
        self
    }

    pub fn with_sync_key(mut self, key: SyncKey) -> Self {
        self.sync_key = key;
        self
    }

    pub fn feed(&self) -> VirtualFeed {
        self.feed.clone()
    }

    /// Effects received by fed joysticks, in order.
    pub fn played(&self) -> Rc<RefCell<Vec<(usize, HapticEffect)>>> {
        self.played.clone()
    }

    /// Indices passed to `close`, in order.
    pub fn closed(&self) -> Rc<RefCell<Vec<usize>>> {
        self.closed.clone()
    }
}

impl JsSource for VirtualJoysticks {
    fn init(&mut self, _poller: &mut dyn Poller) -> Result<()> {
        debug!(joysticks = self.sticks.len(), "virtual joystick source initialized");
        Ok(())
    }

    fn name(&self, index: usize) -> Option<&[u8]> {
        match self.sticks.get(index)? {
            VirtualStick::Fed(fed) => Some(fed.name.as_bytes()),
            VirtualStick::Soft(soft) => Some(soft.name.as_bytes()),
        }
    }

    fn add(
        &mut self,
        name: &str,
        caps: HapticCaps,
        sink: Option<Box<dyn HapticSink>>,
    ) -> Result<usize> {
        self.sticks
            .push(VirtualStick::Soft(SoftJoystick::new(name, caps, sink)))
            .map_err(|_| Error::TableFull {
                class: crate::event::DeviceClass::Joystick,
                capacity: self.sticks.capacity(),
            })
    }

    fn button_count(&self, index: usize) -> usize {
        match self.sticks.get(index) {
            Some(VirtualStick::Fed(fed)) => fed.buttons,
            _ => 0,
        }
    }

    fn haptic_caps(&self, index: usize) -> HapticCaps {
        match self.sticks.get(index) {
            Some(VirtualStick::Fed(fed)) => fed.caps,
            Some(VirtualStick::Soft(soft)) => soft.caps,
            None => HapticCaps::empty(),
        }
    }

    fn set_haptic(&mut self, index: usize, effect: &HapticEffect) -> Result<()> {
        match self.sticks.get_mut(index).ok_or(Error::NoSuchDevice)? {
            VirtualStick::Fed(fed) => {
                if !fed.caps.contains(effect.kind().cap()) {
                    return Err(Error::UnsupportedDevice);
                }
                self.played.borrow_mut().push((index, *effect));
                Ok(())
            }
            VirtualStick::Soft(soft) => soft.play(effect),
        }
    }

    fn close(&mut self, index: usize, _poller: &mut dyn Poller) {
        if self.sticks.remove(index).is_some() {
            self.closed.borrow_mut().push(index);
        }
    }

    fn take_closed(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.lost)
    }

    fn sync_key(&self) -> Option<SyncKey> {
        Some(self.sync_key)
    }

    fn sync_process(&mut self, out: &mut Vec<Event>) -> Result<()> {
        for index in self.feed.take_unplugged() {
            if self.sticks.remove(index).is_some() {
                debug!(index, "virtual joystick unplugged");
                self.lost.push(index);
            }
        }
        self.feed.drain_into(out);
        Ok(())
    }

    fn quit(&mut self, _poller: &mut dyn Poller) {
        self.sticks.clear();
        self.lost.clear();
        for fed in &self.declared {
            let _ = self.sticks.push(VirtualStick::Fed(fed.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::keysym;
    use crate::poll::LocalReactor;

    #[test]
    fn feed_is_released_on_sync() {
        let mut mkb = VirtualMkb::new().with_keyboard("kbd");
        let feed = mkb.feed();
        feed.key(0, keysym::A, true);
        feed.click(0, MouseButton::Left);

        let mut out = Vec::new();
        mkb.sync_process(&mut out).unwrap();
        assert_eq!(out.len(), 3);
        out.clear();
        mkb.sync_process(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn soft_joysticks_follow_fed_ones() {
        let mut js = VirtualJoysticks::new().with_joystick("stick", 12, HapticCaps::RUMBLE);
        let idx = js.add("soft pad", HapticCaps::empty(), None).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(js.name(1), Some(&b"soft pad"[..]));
        assert_eq!(js.button_count(0), 12);
        assert_eq!(js.name(2), None);
    }

    #[test]
    fn haptics_on_fed_joystick_are_recorded() {
        let mut js = VirtualJoysticks::new().with_joystick("wheel", 0, HapticCaps::CONSTANT);
        let played = js.played();
        let effect = HapticEffect::Constant {
            level: 1000,
            direction: 9000,
        };
        js.set_haptic(0, &effect).unwrap();
        assert!(js.set_haptic(5, &effect).is_err());
        assert_eq!(played.borrow().as_slice(), &[(0, effect)]);
    }

    #[test]
    fn close_is_recorded_once() {
        let mut js = VirtualJoysticks::new().with_joystick("a", 0, HapticCaps::empty());
        let closed = js.closed();
        let mut poller = LocalReactor::new();
        js.close(0, &mut poller);
        js.close(0, &mut poller);
        assert_eq!(closed.borrow().as_slice(), &[0]);
    }

    #[test]
    fn fed_joysticks_survive_quit() {
        let mut js = VirtualJoysticks::new()
            .with_joystick("a", 4, HapticCaps::empty())
            .with_joystick("b", 6, HapticCaps::RUMBLE);
        let mut poller = LocalReactor::new();
        js.init(&mut poller).unwrap();
        js.add("soft", HapticCaps::empty(), None).unwrap();
        js.close(0, &mut poller);

        js.quit(&mut poller);
        js.init(&mut poller).unwrap();
        assert_eq!(js.name(0), Some(&b"a"[..]));
        assert_eq!(js.button_count(1), 6);
        assert_eq!(js.name(2), None);
    }

    #[test]
    fn unplugged_joystick_is_reported_once() {
        let mut js = VirtualJoysticks::new()
            .with_joystick("a", 0, HapticCaps::empty())
            .with_joystick("b", 0, HapticCaps::empty());
        let feed = js.feed();
        let closed = js.closed();
        feed.unplug(1);
        feed.unplug(7);

        let mut out = Vec::new();
        js.sync_process(&mut out).unwrap();
        assert_eq!(js.take_closed(), vec![1]);
        assert!(js.take_closed().is_empty());
        assert_eq!(js.name(1), None);
        assert!(closed.borrow().is_empty());
    }
}
