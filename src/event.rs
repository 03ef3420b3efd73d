//! Events and force-feedback payloads.
//!
//! Every backend converts what it reads into [`Event`]: a device index within its
//! [`DeviceClass`] table plus a kind-specific payload ([`EventKind`]).
//!
//! ## Value conventions
//! - **Keys:** `keysym` uses the Linux evdev key-code space (see [`keysym`]); other
//!   backends translate into it.
//! - **Mouse motion:** relative hardware deltas, never absolute positions.
//! - **Mouse buttons:** [`MouseButton`]; wheel directions are synthesized buttons.
//! - **Joystick axes:** signed 16-bit, `-32768..=32767`.
//! - **Hats:** bitmask, `0` = centered, up `1`, right `2`, down `4`, left `8`;
//!   diagonals set two bits (see [`hat`]).
//! - **Joystick buttons:** device-local index. When hats are folded into buttons, hat
//!   `h` direction bit `b` lands at `button_count + 4 * h + log2(b)`.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Device table a given event (or record) belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Keyboard,
    Mouse,
    Joystick,
}

/// One normalized input event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Event {
    /// Index of the originating device within its class table.
    pub device: usize,
    pub kind: EventKind,
}

impl Event {
    pub fn new(device: usize, kind: EventKind) -> Self {
        Self { device, kind }
    }

    /// Class table that `device` indexes into.
    pub fn class(&self) -> DeviceClass {
        self.kind.class()
    }
}

/// Kind-specific event payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EventKind {
    KeyDown { keysym: u16 },
    KeyUp { keysym: u16 },

    /// Relative pointer delta in device counts.
    MouseMotion { dx: i32, dy: i32 },
    MouseButtonDown { button: MouseButton },
    MouseButtonUp { button: MouseButton },

    JoystickAxis { axis: u8, value: i16 },
    /// `value` is a [`hat`] bitmask.
    JoystickHat { hat: u8, value: u8 },
    JoystickButtonDown { button: u16 },
    JoystickButtonUp { button: u16 },

    /// Force-feedback command addressed to a joystick.
    Haptic(HapticEffect),
}

impl EventKind {
    pub fn class(&self) -> DeviceClass {
        match self {
            EventKind::KeyDown { .. } | EventKind::KeyUp { .. } => DeviceClass::Keyboard,
            EventKind::MouseMotion { .. }
            | EventKind::MouseButtonDown { .. }
            | EventKind::MouseButtonUp { .. } => DeviceClass::Mouse,
            EventKind::JoystickAxis { .. }
            | EventKind::JoystickHat { .. }
            | EventKind::JoystickButtonDown { .. }
            | EventKind::JoystickButtonUp { .. }
            | EventKind::Haptic(_) => DeviceClass::Joystick,
        }
    }
}

/// Hat bitmask values.
pub mod hat {
    pub const CENTERED: u8 = 0x00;
    pub const UP: u8 = 0x01;
    pub const RIGHT: u8 = 0x02;
    pub const DOWN: u8 = 0x04;
    pub const LEFT: u8 = 0x08;
    pub const RIGHT_UP: u8 = RIGHT | UP;
    pub const RIGHT_DOWN: u8 = RIGHT | DOWN;
    pub const LEFT_UP: u8 = LEFT | UP;
    pub const LEFT_DOWN: u8 = LEFT | DOWN;

    /// Direction bits in emission order.
    pub const DIRECTIONS: [u8; 4] = [UP, RIGHT, DOWN, LEFT];
}

/// Key codes shared by every backend (evdev numbering).
pub mod keysym {
    pub const ESC: u16 = 1;
    pub const BACKSPACE: u16 = 14;
    pub const TAB: u16 = 15;
    pub const Q: u16 = 16;
    pub const ENTER: u16 = 28;
    pub const LEFT_CTRL: u16 = 29;
    pub const A: u16 = 30;
    pub const LEFT_SHIFT: u16 = 42;
    pub const Z: u16 = 44;
    pub const KP_ASTERISK: u16 = 55;
    pub const LEFT_ALT: u16 = 56;
    pub const SPACE: u16 = 57;
    pub const F1: u16 = 59;
    pub const NUM_LOCK: u16 = 69;
    pub const KP_ENTER: u16 = 96;
    pub const RIGHT_CTRL: u16 = 97;
    pub const KP_SLASH: u16 = 98;
    pub const SYSRQ: u16 = 99;
    pub const RIGHT_ALT: u16 = 100;
    pub const HOME: u16 = 102;
    pub const UP: u16 = 103;
    pub const PAGE_UP: u16 = 104;
    pub const LEFT: u16 = 105;
    pub const RIGHT: u16 = 106;
    pub const END: u16 = 107;
    pub const DOWN: u16 = 108;
    pub const PAGE_DOWN: u16 = 109;
    pub const INSERT: u16 = 110;
    pub const DELETE: u16 = 111;
    pub const PAUSE: u16 = 119;
    pub const LEFT_META: u16 = 125;
    pub const RIGHT_META: u16 = 126;
    pub const COMPOSE: u16 = 127;

    /// First code past the keyboard range (`BTN_MISC`).
    pub const LIMIT: u16 = 0x100;
}

/// Mouse buttons, including the synthesized wheel directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    WheelUp,
    WheelDown,
    WheelRight,
    WheelLeft,
    X1,
    X2,
    X3,
    X4,
    X5,
}

impl MouseButton {
    const ALL: [MouseButton; 12] = [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::WheelUp,
        MouseButton::WheelDown,
        MouseButton::WheelRight,
        MouseButton::WheelLeft,
        MouseButton::X1,
        MouseButton::X2,
        MouseButton::X3,
        MouseButton::X4,
        MouseButton::X5,
    ];

    /// Stable numeric index of the button.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn is_wheel(self) -> bool {
        matches!(
            self,
            MouseButton::WheelUp
                | MouseButton::WheelDown
                | MouseButton::WheelRight
                | MouseButton::WheelLeft
        )
    }
}

bitflags! {
    /// Force-feedback effect kinds a joystick supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HapticCaps: u32 {
        const RUMBLE = 1 << 0;
        const CONSTANT = 1 << 1;
        const SPRING = 1 << 2;
        const DAMPER = 1 << 3;
        const SINE = 1 << 4;
    }
}

/// Effect kind, independent of parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HapticKind {
    Rumble,
    Constant,
    Spring,
    Damper,
    Sine,
}

impl HapticKind {
    pub fn cap(self) -> HapticCaps {
        match self {
            HapticKind::Rumble => HapticCaps::RUMBLE,
            HapticKind::Constant => HapticCaps::CONSTANT,
            HapticKind::Spring => HapticCaps::SPRING,
            HapticKind::Damper => HapticCaps::DAMPER,
            HapticKind::Sine => HapticCaps::SINE,
        }
    }
}

/// Per-side parameters of a condition effect (spring, damper).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Condition {
    pub right_saturation: u16,
    pub left_saturation: u16,
    pub right_coeff: i16,
    pub left_coeff: i16,
    pub center: i16,
    pub deadband: u16,
}

/// A force-feedback command.
///
/// `direction` is in hundredths of a degree (`0..36000`), 0 = north.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HapticEffect {
    Rumble { weak: u16, strong: u16 },
    Constant { level: i16, direction: u16 },
    Spring(Condition),
    Damper(Condition),
    Sine {
        offset: i16,
        magnitude: i16,
        period_ms: u16,
        direction: u16,
    },
}

impl HapticEffect {
    pub fn kind(&self) -> HapticKind {
        match self {
            HapticEffect::Rumble { .. } => HapticKind::Rumble,
            HapticEffect::Constant { .. } => HapticKind::Constant,
            HapticEffect::Spring(_) => HapticKind::Spring,
            HapticEffect::Damper(_) => HapticKind::Damper,
            HapticEffect::Sine { .. } => HapticKind::Sine,
        }
    }

    /// `true` when the effect produces no force and playback can stop.
    pub fn is_null(&self) -> bool {
        match *self {
            HapticEffect::Rumble { weak, strong } => weak == 0 && strong == 0,
            HapticEffect::Constant { level, .. } => level == 0,
            HapticEffect::Spring(c) | HapticEffect::Damper(c) => {
                c.right_coeff == 0 && c.left_coeff == 0
            }
            HapticEffect::Sine {
                offset, magnitude, ..
            } => offset == 0 && magnitude == 0,
        }
    }
}

/// Negate a 16-bit axis value without overflowing at `i16::MIN`.
#[inline]
pub fn invert_axis(value: i16) -> i16 {
    value.saturating_neg()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn classes_follow_payload() {
        assert_eq!(
            Event::new(3, EventKind::KeyDown { keysym: keysym::A }).class(),
            DeviceClass::Keyboard
        );
        assert_eq!(
            Event::new(0, EventKind::MouseMotion { dx: 1, dy: -1 }).class(),
            DeviceClass::Mouse
        );
        let rumble = HapticEffect::Rumble { weak: 1, strong: 0 };
        assert_eq!(
            Event::new(1, EventKind::Haptic(rumble)).class(),
            DeviceClass::Joystick
        );
    }

    #[test]
    fn mouse_button_index_round_trips() {
        for b in MouseButton::ALL {
            assert_eq!(MouseButton::from_index(b.index()), Some(b));
        }
        assert_eq!(MouseButton::from_index(12), None);
        assert!(MouseButton::WheelLeft.is_wheel());
        assert!(!MouseButton::X1.is_wheel());
    }

    #[test]
    fn inverting_min_saturates() {
        assert_eq!(invert_axis(i16::MIN), i16::MAX);
        assert_eq!(invert_axis(i16::MAX), -i16::MAX);
        assert_eq!(invert_axis(0), 0);
    }

    #[test]
    fn null_effects() {
        assert!(HapticEffect::Rumble { weak: 0, strong: 0 }.is_null());
        assert!(!HapticEffect::Constant {
            level: -5,
            direction: 0
        }
        .is_null());
        assert_eq!(HapticKind::Damper.cap(), HapticCaps::DAMPER);
    }

    proptest! {
        #[test]
        fn inversion_never_wraps(v in any::<i16>()) {
            let inv = invert_axis(v);
            prop_assert!(v == i16::MIN || inv == -v);
            prop_assert!(v != i16::MIN || inv == i16::MAX);
        }
    }
}
