//! Raw keyboard/mouse packets and their translation to events.
//!
//! Packets carry what Windows raw input reports (`RAWKEYBOARD`, `RAWMOUSE`)
//! with the OS handle stripped. Set 1 scancodes map onto evdev codes: the
//! plain range is numbered identically, and E0-prefixed keys go through a
//! small table.

use crate::event::{keysym, Event, EventKind, MouseButton};

/// One keyboard make/break.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyPacket {
    pub scancode: u16,
    /// E0 (or E1) prefix.
    pub extended: bool,
    pub released: bool,
}

/// One mouse report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MousePacket {
    pub dx: i32,
    pub dy: i32,
    /// `RI_MOUSE_*` transition bits.
    pub button_flags: u16,
    /// Signed wheel delta, typically ±120 per notch.
    pub wheel: i16,
    pub hwheel: i16,
}

pub const RI_MOUSE_WHEEL: u16 = 0x0400;
pub const RI_MOUSE_HWHEEL: u16 = 0x0800;

/// (down bit, up bit, button)
const BUTTON_FLAGS: [(u16, u16, MouseButton); 5] = [
    (0x0001, 0x0002, MouseButton::Left),
    (0x0004, 0x0008, MouseButton::Right),
    (0x0010, 0x0020, MouseButton::Middle),
    (0x0040, 0x0080, MouseButton::X1),
    (0x0100, 0x0200, MouseButton::X2),
];

const E0_KEYS: [(u16, u16); 18] = [
    (0x1c, keysym::KP_ENTER),
    (0x1d, keysym::RIGHT_CTRL),
    (0x35, keysym::KP_SLASH),
    (0x37, keysym::SYSRQ),
    (0x38, keysym::RIGHT_ALT),
    (0x47, keysym::HOME),
    (0x48, keysym::UP),
    (0x49, keysym::PAGE_UP),
    (0x4b, keysym::LEFT),
    (0x4d, keysym::RIGHT),
    (0x4f, keysym::END),
    (0x50, keysym::DOWN),
    (0x51, keysym::PAGE_DOWN),
    (0x52, keysym::INSERT),
    (0x53, keysym::DELETE),
    (0x5b, keysym::LEFT_META),
    (0x5c, keysym::RIGHT_META),
    (0x5d, keysym::COMPOSE),
];

/// Last scancode numbered the same in set 1 and evdev (F12).
const PLAIN_LIMIT: u16 = 0x58;

pub fn scancode_to_keysym(scancode: u16, extended: bool) -> Option<u16> {
    if extended {
        return E0_KEYS
            .iter()
            .find(|&&(sc, _)| sc == scancode)
            .map(|&(_, sym)| sym);
    }
    match scancode {
        1..=PLAIN_LIMIT => Some(scancode),
        _ => None,
    }
}

pub fn key_events(device: usize, packet: &KeyPacket, out: &mut Vec<Event>) {
    let Some(keysym) = scancode_to_keysym(packet.scancode, packet.extended) else {
        return;
    };
    let kind = if packet.released {
        EventKind::KeyUp { keysym }
    } else {
        EventKind::KeyDown { keysym }
    };
    out.push(Event::new(device, kind));
}

pub fn mouse_events(device: usize, packet: &MousePacket, out: &mut Vec<Event>) {
    if packet.dx != 0 || packet.dy != 0 {
        out.push(Event::new(
            device,
            EventKind::MouseMotion {
                dx: packet.dx,
                dy: packet.dy,
            },
        ));
    }
    for (down, up, button) in BUTTON_FLAGS {
        if packet.button_flags & down != 0 {
            out.push(Event::new(device, EventKind::MouseButtonDown { button }));
        }
        if packet.button_flags & up != 0 {
            out.push(Event::new(device, EventKind::MouseButtonUp { button }));
        }
    }
    let wheel = [
        (RI_MOUSE_WHEEL, packet.wheel, MouseButton::WheelUp, MouseButton::WheelDown),
        (
            RI_MOUSE_HWHEEL,
            packet.hwheel,
            MouseButton::WheelRight,
            MouseButton::WheelLeft,
        ),
    ];
    for (flag, delta, positive, negative) in wheel {
        if packet.button_flags & flag == 0 || delta == 0 {
            continue;
        }
        let button = if delta > 0 { positive } else { negative };
        out.push(Event::new(device, EventKind::MouseButtonDown { button }));
        out.push(Event::new(device, EventKind::MouseButtonUp { button }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_extended_scancodes() {
        assert_eq!(scancode_to_keysym(0x1e, false), Some(keysym::A));
        assert_eq!(scancode_to_keysym(0x1c, false), Some(keysym::ENTER));
        assert_eq!(scancode_to_keysym(0x1c, true), Some(keysym::KP_ENTER));
        assert_eq!(scancode_to_keysym(0x48, true), Some(keysym::UP));
        assert_eq!(scancode_to_keysym(0x1e, true), None);
        assert_eq!(scancode_to_keysym(0, false), None);
    }

    #[test]
    fn key_release_maps_to_key_up() {
        let mut out = Vec::new();
        let packet = KeyPacket {
            scancode: 0x1d,
            extended: true,
            released: true,
        };
        key_events(2, &packet, &mut out);
        assert_eq!(
            out,
            vec![Event::new(
                2,
                EventKind::KeyUp {
                    keysym: keysym::RIGHT_CTRL
                }
            )]
        );
    }

    #[test]
    fn mouse_packet_expands_in_order() {
        let mut out = Vec::new();
        let packet = MousePacket {
            dx: 5,
            dy: 0,
            button_flags: 0x0001 | 0x0008 | RI_MOUSE_WHEEL,
            wheel: -120,
            hwheel: 0,
        };
        mouse_events(0, &packet, &mut out);
        let kinds: Vec<EventKind> = out.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::MouseMotion { dx: 5, dy: 0 },
                EventKind::MouseButtonDown {
                    button: MouseButton::Left
                },
                EventKind::MouseButtonUp {
                    button: MouseButton::Right
                },
                EventKind::MouseButtonDown {
                    button: MouseButton::WheelDown
                },
                EventKind::MouseButtonUp {
                    button: MouseButton::WheelDown
                },
            ]
        );
    }
}
