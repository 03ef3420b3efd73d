//! Mouse/keyboard and joystick sources.
//!
//! | Module | Kind | Platform |
//! |--------|------|----------|
//! | [`linux`] | `Physical` | Linux (evdev nodes) |
//! | [`window`] | `Window` | any window system with an event pump |
//! | `windows` | `Platform` | Windows (raw input) |
//! | [`virtual_input`] | `Virtual` | any |
//!
//! Register the ones a host needs in a
//! [`SourceRegistry`](crate::source::SourceRegistry); nothing is picked up
//! implicitly.

#[cfg(target_os = "linux")]
#[cfg_attr(docsrs, doc(cfg(target_os = "linux")))]
pub mod linux;

pub mod scancode;
pub mod virtual_input;
pub mod window;

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;
