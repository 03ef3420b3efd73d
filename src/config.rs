//! Manager configuration.
//!
//! Everything has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! mkb_source = "physical"
//! single_input = false
//! hats_as_buttons = false
//! queue_capacity = 256
//! max_devices = 256
//!
//! [native_mode]
//! retries = 5
//! backoff_ms = 1000
//!
//! [[aliases]]
//! canonical = "My Pad"
//! variants = ["My Pad (wired)", "My Pad (bt)"]
//! kind = "xbox360"
//! ```

use crate::error::{Error, Result};
use crate::registry::NameAlias;
use crate::source::SourceKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for [`Manager`](crate::manager::Manager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GinputConfig {
    /// Mouse/keyboard backend selected at `init`.
    pub mkb_source: SourceKind,

    /// Start in [`MkMode::SingleInput`]: every keyboard and every mouse is
    /// reported as device 0. The mode can be changed at runtime.
    pub single_input: bool,

    /// Deliver hat changes as extra joystick buttons.
    pub hats_as_buttons: bool,

    /// Capacity of the pull-mode event queue.
    pub queue_capacity: usize,

    /// Per-class device table capacity.
    pub max_devices: usize,

    pub native_mode: NativeModeConfig,

    /// Extra name aliases, checked after the built-in families.
    pub aliases: Vec<NameAlias>,
}

impl Default for GinputConfig {
    fn default() -> Self {
        Self {
            mkb_source: SourceKind::Physical,
            single_input: false,
            hats_as_buttons: false,
            queue_capacity: 256,
            max_devices: 256,
            native_mode: NativeModeConfig::default(),
            aliases: Vec::new(),
        }
    }
}

/// How keyboard and mouse events are attributed to devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MkMode {
    /// Each keyboard and mouse keeps its own index.
    #[default]
    MultipleInputs,
    /// All keyboards and mice are device 0.
    SingleInput,
}

impl MkMode {
    pub fn from_single_input(single: bool) -> Self {
        if single {
            MkMode::SingleInput
        } else {
            MkMode::MultipleInputs
        }
    }
}

/// How long to wait for a wheel to re-enumerate after a mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeModeConfig {
    pub retries: u32,
    pub backoff_ms: u64,
}

impl Default for NativeModeConfig {
    fn default() -> Self {
        Self {
            retries: 5,
            backoff_ms: 1000,
        }
    }
}

impl GinputConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".into()));
        }
        if self.max_devices == 0 {
            return Err(Error::Config("max_devices must be at least 1".into()));
        }
        if let Some(a) = self.aliases.iter().find(|a| a.canonical.trim().is_empty()) {
            return Err(Error::Config(format!(
                "alias with variants {:?} has an empty canonical name",
                a.variants
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::JoystickType;

    #[test]
    fn empty_document_gives_defaults() {
        let config = GinputConfig::from_toml_str("").unwrap();
        assert_eq!(config, GinputConfig::default());
        assert_eq!(config.native_mode.retries, 5);
        assert_eq!(config.native_mode.backoff_ms, 1000);
        assert_eq!(MkMode::from_single_input(config.single_input), MkMode::MultipleInputs);
    }

    #[test]
    fn parses_sources_and_aliases() {
        let config = GinputConfig::from_toml_str(
            r#"
            mkb_source = "window"
            single_input = true

            [native_mode]
            backoff_ms = 5

            [[aliases]]
            canonical = "Arcade Stick"
            variants = ["HORI Fighting Stick"]
            kind = "xbox360"
            "#,
        )
        .unwrap();
        assert_eq!(config.mkb_source, SourceKind::Window);
        assert!(config.single_input);
        assert_eq!(config.native_mode.retries, 5);
        assert_eq!(config.native_mode.backoff_ms, 5);
        assert_eq!(config.aliases[0].kind, JoystickType::Xbox360);
    }

    #[test]
    fn rejects_zero_capacity() {
        assert!(matches!(
            GinputConfig::from_toml_str("queue_capacity = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            GinputConfig::from_toml_str("mkb_source = \"nope\""),
            Err(Error::Config(_))
        ));
    }
}
