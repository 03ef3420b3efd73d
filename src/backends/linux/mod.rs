//! Linux evdev backends.
//!
//! The host opens `/dev/input/event*` nodes and hands them over as
//! [`EvdevNode`](crate::device::EvdevNode) / [`JoystickNode`](crate::device::JoystickNode)
//! objects. Bytes read from a node arrive as read completions and are decoded
//! here as native `struct input_event` records:
//!
//! | Field | Size |
//! |-------|------|
//! | `time` | two C longs |
//! | `type` | `u16` |
//! | `code` | `u16` |
//! | `value` | `i32` |
//!
//! A read may end in the middle of a record; the tail is carried over to the
//! next read of the same node.

pub mod js;
pub mod mkb;

pub use js::LinuxJoysticks;
pub use mkb::LinuxMkb;

use std::mem::size_of;
use std::os::raw::c_long;

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_ABS: u16 = 0x03;

pub const SYN_REPORT: u16 = 0;

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_HWHEEL: u16 = 0x06;
pub const REL_WHEEL: u16 = 0x08;

pub const BTN_MISC: u16 = 0x100;
pub const BTN_LEFT: u16 = 0x110;
pub const BTN_TASK: u16 = 0x117;
pub const BTN_TRIGGER: u16 = 0x120;
pub const BTN_SOUTH: u16 = 0x130;

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_HAT0X: u16 = 0x10;
pub const ABS_HAT3Y: u16 = 0x17;

/// Size of one `struct input_event` on this target.
pub const EVENT_SIZE: usize = 2 * size_of::<c_long>() + 8;

/// The part of an `input_event` the backends care about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    /// Native-endian `input_event` bytes with a zero timestamp.
    pub fn to_bytes(self) -> Vec<u8> {
        let mut buf = vec![0u8; EVENT_SIZE];
        let at = 2 * size_of::<c_long>();
        buf[at..at + 2].copy_from_slice(&self.kind.to_ne_bytes());
        buf[at + 2..at + 4].copy_from_slice(&self.code.to_ne_bytes());
        buf[at + 4..at + 8].copy_from_slice(&self.value.to_ne_bytes());
        buf
    }
}

/// Splits `data` into records, prefixed by whatever `carry` held from the
/// previous read. An incomplete trailing record is left in `carry`.
pub fn decode_events(carry: &mut Vec<u8>, data: &[u8]) -> Vec<RawEvent> {
    carry.extend_from_slice(data);
    let whole = carry.len() / EVENT_SIZE * EVENT_SIZE;
    let at = 2 * size_of::<c_long>();

    let events = carry[..whole]
        .chunks_exact(EVENT_SIZE)
        .map(|rec| RawEvent {
            kind: u16::from_ne_bytes([rec[at], rec[at + 1]]),
            code: u16::from_ne_bytes([rec[at + 2], rec[at + 3]]),
            value: i32::from_ne_bytes([rec[at + 4], rec[at + 5], rec[at + 6], rec[at + 7]]),
        })
        .collect();
    carry.drain(..whole);
    events
}
