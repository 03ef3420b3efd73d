//! Registry snapshot.
//!
//! [`RegistrySnapshot`] is an owned, serializable copy of the device tables at
//! one point in time, produced by
//! [`Manager::snapshot`](crate::manager::Manager::snapshot). It does not track
//! later changes; take a new one after `init`, `release_unused` or `quit`.
//!
//! # Examples
//! ```no_run
//! use ginput::RegistrySnapshot;
//!
//! fn dump(snap: &RegistrySnapshot) -> ginput::Result<()> {
//!     for pad in &snap.joysticks {
//!         println!("{} #{} used={}", pad.name, pad.virtual_index, pad.used);
//!     }
//!     println!("{}", snap.to_json()?);
//!     Ok(())
//! }
//! ```

use crate::error::Result;
use crate::event::DeviceClass;
use crate::registry::{DeviceRegistry, JoystickType};
use serde::{Deserialize, Serialize};

/// One registered device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub index: usize,
    pub name: String,
    pub virtual_index: usize,
    /// Always `false` for keyboards and mice.
    pub used: bool,
    pub kind: JoystickType,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub keyboards: Vec<DeviceEntry>,
    pub mice: Vec<DeviceEntry>,
    pub joysticks: Vec<DeviceEntry>,
    pub grabbed: bool,
}

impl RegistrySnapshot {
    pub fn capture(registry: &DeviceRegistry, grabbed: bool) -> Self {
        let entries = |class| {
            registry
                .records(class)
                .map(|(index, r)| DeviceEntry {
                    index,
                    name: r.name.clone(),
                    virtual_index: r.virtual_index,
                    used: r.used,
                    kind: r.kind,
                })
                .collect()
        };
        Self {
            keyboards: entries(DeviceClass::Keyboard),
            mice: entries(DeviceClass::Mouse),
            joysticks: entries(DeviceClass::Joystick),
            grabbed,
        }
    }

    pub fn class(&self, class: DeviceClass) -> &[DeviceEntry] {
        match class {
            DeviceClass::Keyboard => &self.keyboards,
            DeviceClass::Mouse => &self.mice,
            DeviceClass::Joystick => &self.joysticks,
        }
    }

    pub fn get(&self, class: DeviceClass, index: usize) -> Option<&DeviceEntry> {
        self.class(class).iter().find(|e| e.index == index)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_carries_names_and_types() {
        let mut reg = DeviceRegistry::default();
        reg.add(DeviceClass::Joystick, b"Valve Software Steam Controller")
            .unwrap();
        reg.add(DeviceClass::Keyboard, b"Dell KB").unwrap();
        reg.set_joystick_used(0);

        let snap = RegistrySnapshot::capture(&reg, true);
        let value: serde_json::Value = serde_json::from_str(&snap.to_json().unwrap()).unwrap();
        assert_eq!(value["joysticks"][0]["name"], "Steam Controller");
        assert_eq!(value["joysticks"][0]["kind"], "steam_controller");
        assert_eq!(value["joysticks"][0]["used"], true);
        assert_eq!(value["keyboards"][0]["virtual_index"], 0);
        assert_eq!(value["grabbed"], true);

        let back = RegistrySnapshot::from_json(&snap.to_json().unwrap()).unwrap();
        assert_eq!(back.get(DeviceClass::Keyboard, 0).map(|e| e.name.as_str()), Some("Dell KB"));
    }
}
