//! Windows raw input source.
//!
//! The host owns the Win32 message loop. It forwards every `WM_INPUT` lparam
//! to a [`RawInputFeed`]; the payload is copied right away and translated on
//! the next sync pass. Device indices follow the order in which raw input
//! lists the keyboards and mice at `init`. Packets from an unlisted handle
//! (injected input has none) are attributed to device 0.

pub mod raw_input;

use crate::backends::scancode::{key_events, mouse_events};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::poll::Poller;
use crate::source::{GrabMode, MkbSource, SourceKind, SyncKey};
use raw_input::RawPacket;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, info, warn};
use windows_sys::Win32::Foundation::{HANDLE, HWND};
use windows_sys::Win32::UI::Input::RIM_TYPEKEYBOARD;

/// Queue of copied `WM_INPUT` payloads.
#[derive(Clone, Debug, Default)]
pub struct RawInputFeed(Rc<RefCell<VecDeque<Vec<u8>>>>);

impl RawInputFeed {
    /// Call from the window procedure on `WM_INPUT`.
    pub fn wm_input(&self, lparam: isize) {
        match raw_input::read_wm_input(lparam) {
            Some(buf) => self.0.borrow_mut().push_back(buf),
            None => debug!("WM_INPUT payload unavailable"),
        }
    }
}

pub struct RawInputMkb {
    hwnd: HWND,
    feed: RawInputFeed,
    keyboards: Vec<(HANDLE, Vec<u8>)>,
    mice: Vec<(HANDLE, Vec<u8>)>,
    grabbed: bool,
}

impl RawInputMkb {
    /// `hwnd` receives `WM_INPUT` and is the capture target when grabbing.
    pub fn new(hwnd: HWND) -> Self {
        Self {
            hwnd,
            feed: RawInputFeed::default(),
            keyboards: Vec::new(),
            mice: Vec::new(),
            grabbed: false,
        }
    }

    pub fn feed(&self) -> RawInputFeed {
        self.feed.clone()
    }

    fn index_of(list: &[(HANDLE, Vec<u8>)], handle: HANDLE) -> usize {
        list.iter().position(|(h, _)| *h == handle).unwrap_or(0)
    }
}

impl MkbSource for RawInputMkb {
    fn kind(&self) -> SourceKind {
        SourceKind::Platform
    }

    fn init(&mut self, _poller: &mut dyn Poller) -> Result<()> {
        self.keyboards.clear();
        self.mice.clear();
        for (handle, kind) in raw_input::list_devices()? {
            let name = raw_input::device_name(handle)
                .unwrap_or_default()
                .into_bytes();
            if kind == RIM_TYPEKEYBOARD {
                self.keyboards.push((handle, name));
            } else {
                self.mice.push((handle, name));
            }
        }
        raw_input::register(self.hwnd, false)?;
        info!(
            keyboards = self.keyboards.len(),
            mice = self.mice.len(),
            "raw input source ready"
        );
        Ok(())
    }

    fn grab(&mut self, mode: GrabMode) -> Result<()> {
        let on = mode == GrabMode::On;
        raw_input::register(self.hwnd, on).map_err(Error::Io)?;
        self.grabbed = on;
        Ok(())
    }

    fn mouse_name(&self, index: usize) -> Option<&[u8]> {
        self.mice.get(index).map(|(_, n)| n.as_slice())
    }

    fn keyboard_name(&self, index: usize) -> Option<&[u8]> {
        self.keyboards.get(index).map(|(_, n)| n.as_slice())
    }

    fn sync_key(&self) -> Option<SyncKey> {
        Some(SyncKey("raw-input"))
    }

    fn sync_process(&mut self, out: &mut Vec<Event>) -> Result<()> {
        let pending: Vec<Vec<u8>> = self.feed.0.borrow_mut().drain(..).collect();
        for buf in pending {
            match raw_input::parse_raw_input(&buf) {
                Some(RawPacket::Keyboard(handle, packet)) => {
                    key_events(Self::index_of(&self.keyboards, handle), &packet, out);
                }
                Some(RawPacket::Mouse(handle, packet)) => {
                    mouse_events(Self::index_of(&self.mice, handle), &packet, out);
                }
                None => {}
            }
        }
        Ok(())
    }

    fn quit(&mut self, _poller: &mut dyn Poller) {
        if self.grabbed {
            if let Err(e) = self.grab(GrabMode::Off) {
                warn!(error = %e, "releasing raw input capture failed");
            }
        }
        self.feed.0.borrow_mut().clear();
        self.keyboards.clear();
        self.mice.clear();
    }
}
