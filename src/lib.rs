//! ginput: one event stream for keyboards, mice and joysticks.
//!
//! Platform sources (evdev, a window system, Windows raw input, or software
//! feeds) and vendor HID drivers all produce the same [`Event`] values. A
//! [`Manager`] owns them, keeps the per-class device tables, and hands every
//! event to the application callback.
//!
//! ```no_run
//! use ginput::backends::virtual_input::VirtualMkb;
//! use ginput::{Event, GinputConfig, HidInput, LocalReactor, Manager, SourceKind, SourceRegistry};
//!
//! fn main() -> ginput::Result<()> {
//!     let sources = SourceRegistry::new().with_mkb(VirtualMkb::new().with_keyboard("kbd"));
//!     let mut manager = Manager::new(GinputConfig::default(), sources, HidInput::new())?;
//!     let callback = |ev: &Event| -> ginput::Result<()> {
//!         println!("{ev:?}");
//!         Ok(())
//!     };
//!     manager.init(Box::new(LocalReactor::new()), SourceKind::Virtual, Box::new(callback))?;
//!     manager.periodic_task()
//! }
//! ```

pub mod backends;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod hats;
pub mod hid;
pub mod logger;
pub mod manager;
pub mod metadata;
pub mod names;
pub mod poll;
pub mod queue;
pub mod registry;
pub mod slots;
pub mod snapshot;
pub mod source;

pub use config::{GinputConfig, MkMode, NativeModeConfig};
pub use device::{AbsInfo, EvdevNode, JoystickNode};
pub use error::{Error, Result};
pub use event::*;
pub use eventbus::{deliver_all, EventCallback};
pub use hats::HatTranslator;
pub use hid::HidInput;
pub use logger::LogCallback;
pub use manager::Manager;
pub use metadata::{DeviceMeta, HidMatch};
pub use names::{key_id, key_name, mouse_button_id, mouse_button_name};
pub use poll::{Completion, CompletionQueue, Interest, LocalReactor, Poller, Token, TokenKind};
pub use queue::EventQueue;
pub use registry::{DeviceRegistry, JoystickType, NameAlias};
pub use snapshot::{DeviceEntry, RegistrySnapshot};
pub use source::{
    GrabMode, HapticSink, JoystickRegistrar, JsSource, MkbSource, SourceKind, SourceRegistry,
    SyncKey,
};
