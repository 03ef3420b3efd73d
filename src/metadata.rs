//! HID device metadata and driver match entries.
//!
//! [`DeviceMeta`] is a cloneable description of one enumerated HID interface as
//! reported by the transport. Drivers select devices with [`HidMatch`] tables.
//!
//! # Conventions
//! - `interface_number` is `-1` when the platform does not report one.
//! - `release` is the USB `bcdDevice`; wheel drivers use it to tell models apart
//!   while they still enumerate in compatibility mode.
//! - `path` is opaque and transport-specific; it is the identity used to reopen
//!   a device and to address it in `HidInput::set_callbacks`.

use serde::{Deserialize, Serialize};

/// Snapshot of metadata describing a single HID interface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    pub vid: u16,
    pub pid: u16,
    /// USB `bcdDevice`.
    pub release: u16,
    /// HID interface index, `-1` when not applicable.
    pub interface_number: i32,
    /// Transport path to the device.
    pub path: String,
    pub product_string: Option<String>,
    pub serial_number: Option<String>,
    pub usage_page: Option<u16>,
    pub usage: Option<u16>,
}

impl DeviceMeta {
    pub fn new(vid: u16, pid: u16, path: impl Into<String>) -> Self {
        Self {
            vid,
            pid,
            interface_number: -1,
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Interface wildcard in [`HidMatch`].
pub const ANY_INTERFACE: i32 = -1;

/// One row of a driver's match table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HidMatch {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Interface number, or [`ANY_INTERFACE`].
    pub interface: i32,
}

impl HidMatch {
    pub const fn new(vendor_id: u16, product_id: u16, interface: i32) -> Self {
        Self {
            vendor_id,
            product_id,
            interface,
        }
    }

    pub fn matches(&self, meta: &DeviceMeta) -> bool {
        self.vendor_id == meta.vid
            && self.product_id == meta.pid
            && (self.interface == ANY_INTERFACE || self.interface == meta.interface_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_wildcard() {
        let mut meta = DeviceMeta::new(0x28de, 0x1142, "hid:1");
        meta.interface_number = 2;
        assert!(HidMatch::new(0x28de, 0x1142, ANY_INTERFACE).matches(&meta));
        assert!(HidMatch::new(0x28de, 0x1142, 2).matches(&meta));
        assert!(!HidMatch::new(0x28de, 0x1142, 1).matches(&meta));
        assert!(!HidMatch::new(0x28de, 0x1102, 2).matches(&meta));
    }
}
