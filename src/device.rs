//! Capabilities of already-opened OS device handles.
//!
//! Opening device nodes and issuing ioctls is the host's business. Backends only
//! see these traits: a node's reported name, its static capabilities, and the few
//! control operations they need. Event bytes arrive separately as read
//! completions on the node's poll token.

use crate::event::{HapticCaps, HapticEffect};
use std::io;

/// An opened evdev node (`/dev/input/event*`).
pub trait EvdevNode {
    /// Name as reported by the kernel, not necessarily UTF-8.
    fn name(&self) -> &[u8];

    /// Exclusive capture (`EVIOCGRAB`).
    fn set_grab(&mut self, grab: bool) -> io::Result<()> {
        let _ = grab;
        Ok(())
    }
}

/// Range of one absolute axis (`EVIOCGABS`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AbsInfo {
    pub code: u16,
    pub min: i32,
    pub max: i32,
}

/// An opened evdev node exposing a joystick.
pub trait JoystickNode: EvdevNode {
    /// Absolute axes present on the device, hats included.
    fn abs_axes(&self) -> Vec<AbsInfo>;

    /// Key/button codes present on the device.
    fn keys(&self) -> Vec<u16>;

    /// Force-feedback effect kinds the device accepts.
    fn ff_caps(&self) -> HapticCaps {
        HapticCaps::empty()
    }

    /// Uploads (or updates, when `id` is given) an effect; returns its id.
    fn upload_effect(&mut self, effect: &HapticEffect, id: Option<i16>) -> io::Result<i16> {
        let _ = (effect, id);
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn play_effect(&mut self, id: i16, play: bool) -> io::Result<()> {
        let _ = (id, play);
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn erase_effect(&mut self, id: i16) -> io::Result<()> {
        let _ = id;
        Ok(())
    }

    /// Path of the hidraw node behind this joystick, if known.
    fn hid_path(&self) -> Option<&str> {
        None
    }
}
