//! Device registry.
//!
//! Three tables (keyboards, mice, joysticks) of display metadata, indexed exactly
//! like the backend that reported the devices. Each record carries:
//! - the display name, UTF-8, trimmed, with known controller aliases folded into
//!   one canonical name;
//! - a *virtual index*: 0 for the first device with a given name in its class,
//!   1 for the second, and so on;
//! - for joysticks, a `used` flag and a [`JoystickType`].
//!
//! Accessors are bounds-checked and return `None`/`0`/`false` for absent slots.

use crate::error::{Error, Result};
use crate::event::{DeviceClass, HapticCaps};
use crate::slots::SlotTable;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Recognized controller families.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoystickType {
    #[default]
    Unknown,
    Sixaxis,
    DualShock4,
    Xbox360,
    XboxOne,
    SteamController,
    LogitechWheel,
}

impl JoystickType {
    /// Effects assumed when the backend does not advertise any.
    pub fn default_haptic(self) -> HapticCaps {
        match self {
            JoystickType::Unknown => HapticCaps::empty(),
            JoystickType::Sixaxis
            | JoystickType::DualShock4
            | JoystickType::Xbox360
            | JoystickType::XboxOne
            | JoystickType::SteamController => HapticCaps::RUMBLE,
            JoystickType::LogitechWheel => {
                HapticCaps::CONSTANT | HapticCaps::SPRING | HapticCaps::DAMPER
            }
        }
    }
}

/// Folds several reported names of one controller family into `canonical`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameAlias {
    pub canonical: String,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default)]
    pub kind: JoystickType,
}

impl NameAlias {
    fn new(canonical: &str, variants: &[&str], kind: JoystickType) -> Self {
        Self {
            canonical: canonical.to_owned(),
            variants: variants.iter().map(|v| (*v).to_owned()).collect(),
            kind,
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.canonical == name || self.variants.iter().any(|v| v == name)
    }
}

/// Families known out of the box.
pub fn builtin_aliases() -> Vec<NameAlias> {
    vec![
        NameAlias::new(
            "Sony PLAYSTATION(R)3 Controller",
            &["PLAYSTATION(R)3 Controller", "PS3 Controller"],
            JoystickType::Sixaxis,
        ),
        NameAlias::new(
            "Sony Computer Entertainment Wireless Controller",
            &[
                "Sony Interactive Entertainment Wireless Controller",
                "Wireless Controller",
                "DUALSHOCK 4 Wireless Controller",
            ],
            JoystickType::DualShock4,
        ),
        NameAlias::new(
            "Microsoft X-Box 360 pad",
            &[
                "Xbox 360 Controller",
                "Controller (XBOX 360 For Windows)",
                "Xbox 360 Wireless Receiver",
            ],
            JoystickType::Xbox360,
        ),
        NameAlias::new(
            "Microsoft X-Box One pad",
            &[
                "Controller (Xbox One For Windows)",
                "Microsoft X-Box One S pad",
                "Xbox One Controller",
            ],
            JoystickType::XboxOne,
        ),
        NameAlias::new(
            "Steam Controller",
            &["Valve Software Steam Controller"],
            JoystickType::SteamController,
        ),
        NameAlias::new(
            "Logitech G27 Racing Wheel",
            &["G27 Racing Wheel"],
            JoystickType::LogitechWheel,
        ),
        NameAlias::new(
            "Logitech G29 Driving Force Racing Wheel",
            &["G29 Driving Force Racing Wheel"],
            JoystickType::LogitechWheel,
        ),
        NameAlias::new(
            "Logitech Driving Force GT",
            &["Driving Force GT"],
            JoystickType::LogitechWheel,
        ),
    ]
}

/// Converts a raw OS name to display form: UTF-8 when valid, Latin-1 otherwise,
/// without trailing NULs or surrounding whitespace.
pub fn normalize_name(raw: &[u8]) -> String {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    let raw = &raw[..end];
    let text: Cow<'_, str> = match std::str::from_utf8(raw) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(raw.iter().map(|&b| char::from(b)).collect()),
    };
    text.trim().to_owned()
}

/// Display name for a device that reported an empty one.
pub fn unnamed(class: DeviceClass) -> &'static str {
    match class {
        DeviceClass::Keyboard => "Unnamed keyboard",
        DeviceClass::Mouse => "Unnamed mouse",
        DeviceClass::Joystick => "Unnamed joystick",
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRecord {
    pub name: String,
    pub virtual_index: usize,
    pub used: bool,
    pub kind: JoystickType,
}

#[derive(Debug)]
pub struct DeviceRegistry {
    keyboards: SlotTable<DeviceRecord>,
    mice: SlotTable<DeviceRecord>,
    joysticks: SlotTable<DeviceRecord>,
    aliases: Vec<NameAlias>,
}

impl DeviceRegistry {
    pub fn new(capacity: usize, aliases: Vec<NameAlias>) -> Self {
        Self {
            keyboards: SlotTable::with_capacity(capacity),
            mice: SlotTable::with_capacity(capacity),
            joysticks: SlotTable::with_capacity(capacity),
            aliases,
        }
    }

    fn table(&self, class: DeviceClass) -> &SlotTable<DeviceRecord> {
        match class {
            DeviceClass::Keyboard => &self.keyboards,
            DeviceClass::Mouse => &self.mice,
            DeviceClass::Joystick => &self.joysticks,
        }
    }

    fn table_mut(&mut self, class: DeviceClass) -> &mut SlotTable<DeviceRecord> {
        match class {
            DeviceClass::Keyboard => &mut self.keyboards,
            DeviceClass::Mouse => &mut self.mice,
            DeviceClass::Joystick => &mut self.joysticks,
        }
    }

    /// Canonical name and family of a joystick name.
    pub fn canonicalize<'a>(&'a self, name: &'a str) -> (&'a str, JoystickType) {
        self.aliases
            .iter()
            .find(|a| a.matches(name))
            .map_or((name, JoystickType::Unknown), |a| (a.canonical.as_str(), a.kind))
    }

    /// Appends a device reported by a source; the returned index is the
    /// source's own index for it.
    pub fn add(&mut self, class: DeviceClass, raw_name: &[u8]) -> Result<usize> {
        let mut normalized = normalize_name(raw_name);
        if normalized.is_empty() {
            normalized = unnamed(class).to_owned();
        }
        let (name, kind) = match class {
            DeviceClass::Joystick => {
                let (n, k) = self.canonicalize(&normalized);
                (n.to_owned(), k)
            }
            _ => (normalized, JoystickType::Unknown),
        };

        let table = self.table_mut(class);
        let virtual_index = table
            .iter()
            .rev()
            .find(|(_, r)| r.name == name)
            .map_or(0, |(_, r)| r.virtual_index + 1);

        let capacity = table.capacity();
        let record = DeviceRecord {
            name,
            virtual_index,
            used: false,
            kind,
        };
        let index = table
            .push(record)
            .map_err(|_| Error::TableFull { class, capacity })?;
        debug!(?class, index, virtual_index, ?kind, "device registered");
        Ok(index)
    }

    /// Builds one class table by asking `name_of` for index 0, 1, ... until it
    /// reports no device. Devices beyond table capacity are skipped.
    pub fn populate<'a, F>(&mut self, class: DeviceClass, name_of: F)
    where
        F: Fn(usize) -> Option<&'a [u8]>,
    {
        let mut index = 0;
        while let Some(raw) = name_of(index) {
            if let Err(e) = self.add(class, raw) {
                warn!(?class, index, error = %e, "skipping device");
                break;
            }
            index += 1;
        }
    }

    pub fn record(&self, class: DeviceClass, index: usize) -> Option<&DeviceRecord> {
        self.table(class).get(index)
    }

    pub fn name(&self, class: DeviceClass, index: usize) -> Option<&str> {
        self.record(class, index).map(|r| r.name.as_str())
    }

    pub fn virtual_index(&self, class: DeviceClass, index: usize) -> usize {
        self.record(class, index).map_or(0, |r| r.virtual_index)
    }

    pub fn joystick_type(&self, index: usize) -> JoystickType {
        self.record(DeviceClass::Joystick, index)
            .map_or(JoystickType::Unknown, |r| r.kind)
    }

    pub fn joystick_used(&self, index: usize) -> bool {
        self.record(DeviceClass::Joystick, index)
            .is_some_and(|r| r.used)
    }

    /// Claims a joystick so `release_unused` keeps it. `false` if absent.
    pub fn set_joystick_used(&mut self, index: usize) -> bool {
        match self.joysticks.get_mut(index) {
            Some(r) => {
                r.used = true;
                true
            }
            None => false,
        }
    }

    /// Frees every joystick never claimed and returns the freed indices, which
    /// the caller must close in the backend.
    pub fn release_unused(&mut self) -> Vec<usize> {
        let unused: Vec<usize> = self
            .joysticks
            .iter()
            .filter(|(_, r)| !r.used)
            .map(|(i, _)| i)
            .collect();
        for &i in &unused {
            self.joysticks.remove(i);
        }
        unused
    }

    /// Drops one record after its backend closed the device.
    pub fn remove(&mut self, class: DeviceClass, index: usize) -> Option<DeviceRecord> {
        let removed = self.table_mut(class).remove(index);
        if removed.is_some() {
            debug!(?class, index, "device removed");
        }
        removed
    }

    pub fn count(&self, class: DeviceClass) -> usize {
        self.table(class).len()
    }

    pub fn records(&self, class: DeviceClass) -> impl Iterator<Item = (usize, &DeviceRecord)> {
        self.table(class).iter()
    }

    pub fn clear(&mut self) {
        self.keyboards.clear();
        self.mice.clear();
        self.joysticks.clear();
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(256, builtin_aliases())
    }
}
