//! Crate-wide error type.
//!
//! Errors are local to the operation or device that produced them. Bounds-style
//! lookups (names, virtual ids, used flags) never produce an `Error`; they return
//! `None`/`0`/`false` instead.

use crate::event::DeviceClass;
use crate::poll::Token;
use crate::source::SourceKind;
use thiserror::Error;

/// Errors reported by ginput operations.
#[derive(Debug, Error)]
pub enum Error {
    /// `init` (or a pre-init only operation) was called on a running manager.
    #[error("ginput is already initialized")]
    AlreadyInitialized,

    #[error("ginput is not initialized")]
    NotInitialized,

    /// No mouse/keyboard backend is registered for the requested kind.
    #[error("no mouse/keyboard source registered for kind {0:?}")]
    NoMkbSource(SourceKind),

    #[error("no joystick source registered")]
    NoJoystickSource,

    /// A required hook (transport, poller) was not supplied.
    #[error("missing required hook: {0}")]
    MissingHook(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The event queue is at capacity; the event was not stored.
    #[error("event queue is full")]
    QueueFull,

    #[error("{class:?} table is full (capacity {capacity})")]
    TableFull { class: DeviceClass, capacity: usize },

    /// An allocation failed; the operation had no effect.
    #[error("out of memory")]
    OutOfMemory,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HID transport error: {0}")]
    Hid(String),

    /// A report was shorter than the layout being decoded.
    #[error("report too short: {len} bytes, need {needed}")]
    ShortReport { len: usize, needed: usize },

    /// The effect kind is not a haptic effect the device can play.
    #[error("haptic effect not supported by device")]
    NotHaptic,

    #[error("device closed")]
    DeviceClosed,

    /// A wheel did not re-enumerate under its native product id in time.
    #[error("native mode switch not confirmed for product 0x{product_id:04x}")]
    NativeModeTimeout { product_id: u16 },

    #[error("unsupported device")]
    UnsupportedDevice,

    #[error("no such device")]
    NoSuchDevice,

    #[error("unknown poll token {0:?}")]
    UnknownToken(Token),

    /// The application callback returned a non-zero status.
    #[error("event callback returned status {0}")]
    Callback(i32),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

#[cfg(feature = "hid")]
impl From<hidapi::HidError> for Error {
    fn from(e: hidapi::HidError) -> Self {
        Error::Hid(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
