//! Physical mouse and keyboard source.
use super::{
    decode_events, RawEvent, BTN_LEFT, BTN_MISC, BTN_TASK, EV_KEY, EV_REL, EV_SYN, REL_HWHEEL,
    REL_WHEEL, REL_X, REL_Y, SYN_REPORT,
};
use crate::device::EvdevNode;
use crate::error::{Error, Result};
use crate::event::{DeviceClass, Event, EventKind, MouseButton};
use crate::poll::{Completion, Interest, Poller, Token, TokenKind};
use crate::slots::SlotTable;
use crate::source::{GrabMode, MkbSource, SourceKind};
use tracing::{debug, info, warn};

const MAX_NODES: usize = 64;

struct MkbNode {
    class: DeviceClass,
    index: usize,
    node: Box<dyn EvdevNode>,
    carry: Vec<u8>,
    dx: i32,
    dy: i32,
}

impl MkbNode {
    fn apply(&mut self, ev: RawEvent, out: &mut Vec<Event>) {
        match self.class {
            DeviceClass::Keyboard => self.apply_key(ev, out),
            DeviceClass::Mouse => self.apply_mouse(ev, out),
            DeviceClass::Joystick => {}
        }
    }

    fn apply_key(&self, ev: RawEvent, out: &mut Vec<Event>) {
        if ev.kind != EV_KEY || ev.code >= BTN_MISC {
            return;
        }
        let kind = match ev.value {
            0 => EventKind::KeyUp { keysym: ev.code },
            1 => EventKind::KeyDown { keysym: ev.code },
            // autorepeat
            _ => return,
        };
        out.push(Event::new(self.index, kind));
    }

    fn apply_mouse(&mut self, ev: RawEvent, out: &mut Vec<Event>) {
        match (ev.kind, ev.code) {
            (EV_REL, REL_X) => self.dx = self.dx.saturating_add(ev.value),
            (EV_REL, REL_Y) => self.dy = self.dy.saturating_add(ev.value),
            (EV_REL, REL_WHEEL) if ev.value != 0 => {
                let button = if ev.value > 0 {
                    MouseButton::WheelUp
                } else {
                    MouseButton::WheelDown
                };
                self.click(button, out);
            }
            (EV_REL, REL_HWHEEL) if ev.value != 0 => {
                let button = if ev.value > 0 {
                    MouseButton::WheelRight
                } else {
                    MouseButton::WheelLeft
                };
                self.click(button, out);
            }
            (EV_KEY, code) => {
                let Some(button) = mouse_button(code) else {
                    return;
                };
                let kind = match ev.value {
                    0 => EventKind::MouseButtonUp { button },
                    1 => EventKind::MouseButtonDown { button },
                    _ => return,
                };
                out.push(Event::new(self.index, kind));
            }
            (EV_SYN, SYN_REPORT) if self.dx != 0 || self.dy != 0 => {
                out.push(Event::new(
                    self.index,
                    EventKind::MouseMotion {
                        dx: self.dx,
                        dy: self.dy,
                    },
                ));
                self.dx = 0;
                self.dy = 0;
            }
            _ => {}
        }
    }

    fn click(&self, button: MouseButton, out: &mut Vec<Event>) {
        out.push(Event::new(self.index, EventKind::MouseButtonDown { button }));
        out.push(Event::new(self.index, EventKind::MouseButtonUp { button }));
    }
}

/// `BTN_LEFT..=BTN_TASK` in evdev order.
pub fn mouse_button(code: u16) -> Option<MouseButton> {
    if !(BTN_LEFT..=BTN_TASK).contains(&code) {
        return None;
    }
    Some(match code - BTN_LEFT {
        0 => MouseButton::Left,
        1 => MouseButton::Right,
        2 => MouseButton::Middle,
        3 => MouseButton::X1,
        4 => MouseButton::X2,
        5 => MouseButton::X3,
        6 => MouseButton::X4,
        _ => MouseButton::X5,
    })
}

/// Keyboards and mice read from evdev nodes the host opened.
pub struct LinuxMkb {
    nodes: SlotTable<MkbNode>,
    keyboards: Vec<usize>,
    mice: Vec<usize>,
    grabbed: bool,
}

impl Default for LinuxMkb {
    fn default() -> Self {
        Self {
            nodes: SlotTable::with_capacity(MAX_NODES),
            keyboards: Vec::new(),
            mice: Vec::new(),
            grabbed: false,
        }
    }
}

impl LinuxMkb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyboard(mut self, node: impl EvdevNode + 'static) -> Self {
        if let Err(e) = self.add(DeviceClass::Keyboard, Box::new(node)) {
            warn!(error = %e, "keyboard node dropped");
        }
        self
    }

    pub fn with_mouse(mut self, node: impl EvdevNode + 'static) -> Self {
        if let Err(e) = self.add(DeviceClass::Mouse, Box::new(node)) {
            warn!(error = %e, "mouse node dropped");
        }
        self
    }

    /// Adds a node as a keyboard or a mouse; returns its index in that class.
    pub fn add(&mut self, class: DeviceClass, node: Box<dyn EvdevNode>) -> Result<usize> {
        let list = match class {
            DeviceClass::Keyboard => &mut self.keyboards,
            DeviceClass::Mouse => &mut self.mice,
            DeviceClass::Joystick => return Err(Error::UnsupportedDevice),
        };
        let index = list.len();
        let slot = self
            .nodes
            .push(MkbNode {
                class,
                index,
                node,
                carry: Vec::new(),
                dx: 0,
                dy: 0,
            })
            .map_err(|_| Error::TableFull {
                class,
                capacity: MAX_NODES,
            })?;
        list.push(slot);
        Ok(index)
    }

    fn name_of(&self, slots: &[usize], index: usize) -> Option<&[u8]> {
        let slot = *slots.get(index)?;
        self.nodes.get(slot).map(|n| n.node.name())
    }

    fn close(&mut self, slot: usize, poller: &mut dyn Poller) {
        if let Err(e) = poller.remove(Token::new(TokenKind::Mkb, slot)) {
            debug!(slot, error = %e, "evdev token was not registered");
        }
        if let Some(node) = self.nodes.remove(slot) {
            info!(class = ?node.class, index = node.index, "evdev node closed");
        }
    }
}

impl MkbSource for LinuxMkb {
    fn kind(&self) -> SourceKind {
        SourceKind::Physical
    }

    fn init(&mut self, poller: &mut dyn Poller) -> Result<()> {
        let slots = self.nodes.indices();
        for (n, &slot) in slots.iter().enumerate() {
            let token = Token::new(TokenKind::Mkb, slot);
            if let Err(e) = poller.register(token, Interest::READ | Interest::CLOSE) {
                for &done in &slots[..n] {
                    let _ = poller.remove(Token::new(TokenKind::Mkb, done));
                }
                return Err(e);
            }
        }
        info!(
            keyboards = self.keyboards.len(),
            mice = self.mice.len(),
            "evdev mouse/keyboard source ready"
        );
        Ok(())
    }

    fn grab(&mut self, mode: GrabMode) -> Result<()> {
        let on = mode == GrabMode::On;
        let mut first_err = None;
        for (slot, n) in self.nodes.iter_mut() {
            if let Err(e) = n.node.set_grab(on) {
                warn!(slot, error = %e, "EVIOCGRAB failed");
                first_err.get_or_insert(Error::Io(e));
            }
        }
        self.grabbed = on;
        first_err.map_or(Ok(()), Err)
    }

    fn mouse_name(&self, index: usize) -> Option<&[u8]> {
        self.name_of(&self.mice, index)
    }

    fn keyboard_name(&self, index: usize) -> Option<&[u8]> {
        self.name_of(&self.keyboards, index)
    }

    fn handle_completion(
        &mut self,
        completion: Completion,
        poller: &mut dyn Poller,
        out: &mut Vec<Event>,
    ) -> Result<()> {
        let token = completion.token();
        let slot = token.slot;
        let Some(node) = self.nodes.get_mut(slot) else {
            return Err(Error::UnknownToken(token));
        };
        match completion {
            Completion::Read { result: Ok(data), .. } if data.is_empty() => {
                self.close(slot, poller);
                Ok(())
            }
            Completion::Read { result: Ok(data), .. } => {
                for ev in decode_events(&mut node.carry, &data) {
                    node.apply(ev, out);
                }
                Ok(())
            }
            Completion::Read { result: Err(e), .. } => {
                warn!(slot, error = %e, "evdev read failed, closing node");
                self.close(slot, poller);
                Err(Error::Io(e))
            }
            Completion::Write { .. } => Ok(()),
            Completion::Closed { .. } => {
                self.close(slot, poller);
                Ok(())
            }
        }
    }

    fn quit(&mut self, poller: &mut dyn Poller) {
        if self.grabbed {
            let _ = self.grab(GrabMode::Off);
        }
        for (slot, node) in self.nodes.iter_mut() {
            let _ = poller.remove(Token::new(TokenKind::Mkb, slot));
            node.carry.clear();
            node.dx = 0;
            node.dy = 0;
        }
    }
}
