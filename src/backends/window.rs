//! Window-system source.
//!
//! Input that arrives through a window system (X11 with XInput2, an SDL-style
//! event loop) is read by pumping that system's event queue. The pump is a
//! [`WindowSystem`] supplied by the host; [`WindowMkb`] and [`WindowJoysticks`]
//! are two halves sharing it through a [`WindowPump`] and report the same
//! [`SyncKey`], so the dispatch core runs it once per pass. When both halves
//! are active the mkb half forwards the joystick events too.
//!
//! Key codes are X11 style (evdev code + 8). Pointer buttons 1..=9 are left,
//! middle, right, wheel up, wheel down, wheel left, wheel right, back and
//! forward. Raw motion can be fractional; the remainder is kept per mouse and
//! only whole counts are reported.

use crate::error::{Error, Result};
use crate::event::{DeviceClass, Event, EventKind, HapticCaps, HapticEffect, MouseButton};
use crate::poll::Poller;
use crate::slots::SlotTable;
use crate::source::{
    GrabMode, HapticSink, JsSource, MkbSource, SoftJoystick, SourceKind, SyncKey,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info, trace};

pub const WINDOW_SYNC: SyncKey = SyncKey("window");

const MAX_JOYSTICKS: usize = 64;

/// One event read from the window system. `device` indexes the system's own
/// device lists.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowEvent {
    Key { device: usize, keycode: u32, pressed: bool },
    Button { device: usize, button: u8, pressed: bool },
    RawMotion { device: usize, dx: f64, dy: f64 },
    JoyAxis { device: usize, axis: u8, value: i16 },
    JoyHat { device: usize, hat: u8, value: u8 },
    JoyButton { device: usize, button: u16, pressed: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowJoystick {
    pub name: Vec<u8>,
    pub buttons: usize,
}

/// Host-side window system connection.
pub trait WindowSystem {
    fn keyboards(&self) -> Vec<Vec<u8>>;

    fn mice(&self) -> Vec<Vec<u8>>;

    fn joysticks(&self) -> Vec<WindowJoystick> {
        Vec::new()
    }

    fn set_grab(&mut self, grab: bool) -> Result<()>;

    /// Everything queued since the last call.
    fn pump(&mut self) -> Result<Vec<WindowEvent>>;
}

/// X11 pointer button number to [`MouseButton`].
pub fn pointer_button(button: u8) -> Option<MouseButton> {
    Some(match button {
        1 => MouseButton::Left,
        2 => MouseButton::Middle,
        3 => MouseButton::Right,
        4 => MouseButton::WheelUp,
        5 => MouseButton::WheelDown,
        6 => MouseButton::WheelLeft,
        7 => MouseButton::WheelRight,
        8 => MouseButton::X1,
        9 => MouseButton::X2,
        _ => return None,
    })
}

/// X11 keycode to keysym, `None` below the first valid keycode.
pub fn keycode_to_keysym(keycode: u32) -> Option<u16> {
    keycode.checked_sub(8).and_then(|k| u16::try_from(k).ok())
}

struct PumpState {
    system: Box<dyn WindowSystem>,
    /// Window joystick index -> joystick table index.
    joysticks: Option<Vec<usize>>,
    motion: HashMap<usize, (f64, f64)>,
}

impl PumpState {
    fn pump(&mut self, mkb: bool, out: &mut Vec<Event>) -> Result<()> {
        let events = self.system.pump()?;
        trace!(count = events.len(), "window events pumped");
        for ev in events {
            match ev {
                WindowEvent::Key {
                    device,
                    keycode,
                    pressed,
                } if mkb => {
                    let Some(keysym) = keycode_to_keysym(keycode) else {
                        continue;
                    };
                    let kind = if pressed {
                        EventKind::KeyDown { keysym }
                    } else {
                        EventKind::KeyUp { keysym }
                    };
                    out.push(Event::new(device, kind));
                }
                WindowEvent::Button {
                    device,
                    button,
                    pressed,
                } if mkb => {
                    let Some(button) = pointer_button(button) else {
                        continue;
                    };
                    let kind = if pressed {
                        EventKind::MouseButtonDown { button }
                    } else {
                        EventKind::MouseButtonUp { button }
                    };
                    out.push(Event::new(device, kind));
                }
                WindowEvent::RawMotion { device, dx, dy } if mkb => {
                    let acc = self.motion.entry(device).or_insert((0.0, 0.0));
                    acc.0 += dx;
                    acc.1 += dy;
                    let whole = (acc.0.trunc(), acc.1.trunc());
                    acc.0 -= whole.0;
                    acc.1 -= whole.1;
                    if whole != (0.0, 0.0) {
                        out.push(Event::new(
                            device,
                            EventKind::MouseMotion {
                                dx: whole.0 as i32,
                                dy: whole.1 as i32,
                            },
                        ));
                    }
                }
                WindowEvent::JoyAxis { device, axis, value } => {
                    self.joystick(device, EventKind::JoystickAxis { axis, value }, out);
                }
                WindowEvent::JoyHat { device, hat, value } => {
                    self.joystick(device, EventKind::JoystickHat { hat, value }, out);
                }
                WindowEvent::JoyButton {
                    device,
                    button,
                    pressed,
                } => {
                    let kind = if pressed {
                        EventKind::JoystickButtonDown { button }
                    } else {
                        EventKind::JoystickButtonUp { button }
                    };
                    self.joystick(device, kind, out);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn joystick(&self, device: usize, kind: EventKind, out: &mut Vec<Event>) {
        if let Some(&index) = self.joysticks.as_ref().and_then(|map| map.get(device)) {
            out.push(Event::new(index, kind));
        }
    }
}

/// Shared handle to one window system.
#[derive(Clone)]
pub struct WindowPump(Rc<RefCell<PumpState>>);

impl WindowPump {
    pub fn new(system: impl WindowSystem + 'static) -> Self {
        Self(Rc::new(RefCell::new(PumpState {
            system: Box::new(system),
            joysticks: None,
            motion: HashMap::new(),
        })))
    }

    pub fn mkb(&self) -> WindowMkb {
        WindowMkb {
            pump: self.clone(),
            keyboards: Vec::new(),
            mice: Vec::new(),
        }
    }

    pub fn joysticks(&self) -> WindowJoysticks {
        WindowJoysticks {
            pump: self.clone(),
            sticks: SlotTable::with_capacity(MAX_JOYSTICKS),
        }
    }
}

/// Mouse and keyboard half of a [`WindowPump`].
pub struct WindowMkb {
    pump: WindowPump,
    keyboards: Vec<Vec<u8>>,
    mice: Vec<Vec<u8>>,
}

impl MkbSource for WindowMkb {
    fn kind(&self) -> SourceKind {
        SourceKind::Window
    }

    fn init(&mut self, _poller: &mut dyn Poller) -> Result<()> {
        let state = self.pump.0.borrow();
        self.keyboards = state.system.keyboards();
        self.mice = state.system.mice();
        info!(
            keyboards = self.keyboards.len(),
            mice = self.mice.len(),
            "window mouse/keyboard source ready"
        );
        Ok(())
    }

    fn grab(&mut self, mode: GrabMode) -> Result<()> {
        self.pump
            .0
            .borrow_mut()
            .system
            .set_grab(mode == GrabMode::On)
    }

    fn mouse_name(&self, index: usize) -> Option<&[u8]> {
        self.mice.get(index).map(Vec::as_slice)
    }

    fn keyboard_name(&self, index: usize) -> Option<&[u8]> {
        self.keyboards.get(index).map(Vec::as_slice)
    }

    fn sync_key(&self) -> Option<SyncKey> {
        Some(WINDOW_SYNC)
    }

    fn sync_process(&mut self, out: &mut Vec<Event>) -> Result<()> {
        self.pump.0.borrow_mut().pump(true, out)
    }

    fn quit(&mut self, _poller: &mut dyn Poller) {
        let mut state = self.pump.0.borrow_mut();
        if let Err(e) = state.system.set_grab(false) {
            debug!(error = %e, "releasing window grab failed");
        }
        state.motion.clear();
        self.keyboards.clear();
        self.mice.clear();
    }
}

enum Stick {
    Window { name: Vec<u8>, buttons: usize },
    Soft(SoftJoystick),
}

/// Joystick half of a [`WindowPump`]. Window joysticks follow any software
/// joysticks added before `init`.
pub struct WindowJoysticks {
    pump: WindowPump,
    sticks: SlotTable<Stick>,
}

impl JsSource for WindowJoysticks {
    fn init(&mut self, _poller: &mut dyn Poller) -> Result<()> {
        let mut state = self.pump.0.borrow_mut();
        let mut map = Vec::new();
        for js in state.system.joysticks() {
            let index = self
                .sticks
                .push(Stick::Window {
                    name: js.name,
                    buttons: js.buttons,
                })
                .map_err(|_| Error::TableFull {
                    class: DeviceClass::Joystick,
                    capacity: MAX_JOYSTICKS,
                })?;
            map.push(index);
        }
        info!(joysticks = map.len(), "window joystick source ready");
        state.joysticks = Some(map);
        Ok(())
    }

    fn name(&self, index: usize) -> Option<&[u8]> {
        match self.sticks.get(index)? {
            Stick::Window { name, .. } => Some(name.as_slice()),
            Stick::Soft(s) => Some(s.name.as_bytes()),
        }
    }

    fn add(
        &mut self,
        name: &str,
        caps: HapticCaps,
        sink: Option<Box<dyn HapticSink>>,
    ) -> Result<usize> {
        self.sticks
            .push(Stick::Soft(SoftJoystick::new(name, caps, sink)))
            .map_err(|_| Error::TableFull {
                class: DeviceClass::Joystick,
                capacity: MAX_JOYSTICKS,
            })
    }

    fn button_count(&self, index: usize) -> usize {
        match self.sticks.get(index) {
            Some(Stick::Window { buttons, .. }) => *buttons,
            _ => 0,
        }
    }

    fn haptic_caps(&self, index: usize) -> HapticCaps {
        match self.sticks.get(index) {
            Some(Stick::Soft(s)) => s.caps,
            _ => HapticCaps::empty(),
        }
    }

    fn set_haptic(&mut self, index: usize, effect: &HapticEffect) -> Result<()> {
        match self.sticks.get_mut(index).ok_or(Error::NoSuchDevice)? {
            Stick::Window { .. } => Err(Error::UnsupportedDevice),
            Stick::Soft(s) => s.play(effect),
        }
    }

    fn close(&mut self, index: usize, _poller: &mut dyn Poller) {
        if self.sticks.remove(index).is_none() {
            return;
        }
        let mut state = self.pump.0.borrow_mut();
        if let Some(map) = state.joysticks.as_mut() {
            map.retain(|&i| i != index);
        }
    }

    fn sync_key(&self) -> Option<SyncKey> {
        Some(WINDOW_SYNC)
    }

    fn sync_process(&mut self, out: &mut Vec<Event>) -> Result<()> {
        self.pump.0.borrow_mut().pump(false, out)
    }

    fn quit(&mut self, _poller: &mut dyn Poller) {
        self.sticks.clear();
        self.pump.0.borrow_mut().joysticks = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::EventDispatch;
    use crate::event::keysym;
    use crate::poll::LocalReactor;
    use crate::source::SourceRegistry;
    use std::cell::Cell;

    #[derive(Default)]
    struct Scripted {
        queued: Rc<RefCell<Vec<WindowEvent>>>,
        pumps: Rc<Cell<u32>>,
        grabbed: Rc<Cell<bool>>,
    }

    impl WindowSystem for Scripted {
        fn keyboards(&self) -> Vec<Vec<u8>> {
            vec![b"Virtual core keyboard".to_vec()]
        }

        fn mice(&self) -> Vec<Vec<u8>> {
            vec![b"Virtual core pointer".to_vec()]
        }

        fn joysticks(&self) -> Vec<WindowJoystick> {
            vec![WindowJoystick {
                name: b"Xbox 360 Controller".to_vec(),
                buttons: 11,
            }]
        }

        fn set_grab(&mut self, grab: bool) -> Result<()> {
            self.grabbed.set(grab);
            Ok(())
        }

        fn pump(&mut self) -> Result<Vec<WindowEvent>> {
            self.pumps.set(self.pumps.get() + 1);
            Ok(self.queued.borrow_mut().drain(..).collect())
        }
    }

    #[test]
    fn keycodes_and_buttons() {
        assert_eq!(keycode_to_keysym(38), Some(keysym::A));
        assert_eq!(keycode_to_keysym(3), None);
        assert_eq!(pointer_button(3), Some(MouseButton::Right));
        assert_eq!(pointer_button(7), Some(MouseButton::WheelRight));
        assert_eq!(pointer_button(10), None);
    }

    #[test]
    fn shared_pump_runs_once_and_carries_fractions() {
        let system = Scripted::default();
        let queued = system.queued.clone();
        let pumps = system.pumps.clone();
        let pump = WindowPump::new(system);
        let mut d = EventDispatch::new(
            SourceRegistry::new()
                .with_mkb(pump.mkb())
                .with_js(pump.joysticks()),
        );
        let mut poller = LocalReactor::new();
        d.init(SourceKind::Window, &mut poller).unwrap();
        assert_eq!(d.joystick_button_count(0), 11);

        queued.borrow_mut().extend([
            WindowEvent::RawMotion {
                device: 0,
                dx: 0.6,
                dy: -1.5,
            },
            WindowEvent::RawMotion {
                device: 0,
                dx: 0.6,
                dy: 0.0,
            },
            WindowEvent::Key {
                device: 0,
                keycode: 38,
                pressed: true,
            },
            WindowEvent::JoyButton {
                device: 0,
                button: 2,
                pressed: true,
            },
        ]);
        let mut out = Vec::new();
        d.sync_process(&mut out).unwrap();
        assert_eq!(pumps.get(), 1);

        let kinds: Vec<EventKind> = out.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::MouseMotion { dx: 0, dy: -1 },
                EventKind::MouseMotion { dx: 1, dy: 0 },
                EventKind::KeyDown { keysym: keysym::A },
                EventKind::JoystickButtonDown { button: 2 },
            ]
        );
    }

    #[test]
    fn grab_goes_to_the_window_system() {
        let system = Scripted::default();
        let grabbed = system.grabbed.clone();
        let mut mkb = WindowPump::new(system).mkb();
        let mut poller = LocalReactor::new();
        mkb.init(&mut poller).unwrap();
        mkb.grab(GrabMode::On).unwrap();
        assert!(grabbed.get());
        mkb.quit(&mut poller);
        assert!(!grabbed.get());
    }
}
