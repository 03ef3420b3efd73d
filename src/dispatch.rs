//! Event dispatch core.
//!
//! [`EventDispatch`] owns the registered backends, activates one mkb source (by
//! kind) plus the joystick source at `init`, and forwards every per-device call to
//! whichever backend is active. Grabbing only concerns the mkb side.

use crate::error::{Error, Result};
use crate::event::{Event, HapticCaps, HapticEffect};
use crate::poll::{Completion, Poller, TokenKind};
use crate::source::{
    GrabMode, HapticSink, JoystickRegistrar, MkbSource, SourceKind, SourceRegistry,
};
use tracing::{debug, error, info, warn};

pub struct EventDispatch {
    sources: SourceRegistry,
    mkb: Option<Box<dyn MkbSource>>,
}

impl EventDispatch {
    pub fn new(sources: SourceRegistry) -> Self {
        Self { sources, mkb: None }
    }

    pub fn is_active(&self) -> bool {
        self.mkb.is_some()
    }

    /// Kind of the active mkb source.
    pub fn mkb_kind(&self) -> Option<SourceKind> {
        self.mkb.as_ref().map(|m| m.kind())
    }

    pub fn init(&mut self, kind: SourceKind, poller: &mut dyn Poller) -> Result<()> {
        if self.mkb.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        let Some(mut mkb) = self.sources.take_mkb(kind) else {
            error!(?kind, available = ?self.sources.mkb_kinds(), "no mouse/keyboard source for kind");
            return Err(Error::NoMkbSource(kind));
        };
        if let Err(e) = mkb.init(poller) {
            self.sources.restore_mkb(mkb);
            return Err(e);
        }
        info!(?kind, "mouse/keyboard source ready");

        match self.sources.js_mut() {
            Some(js) => {
                if let Err(e) = js.init(poller) {
                    error!(error = %e, "joystick source failed to start");
                    mkb.quit(poller);
                    self.sources.restore_mkb(mkb);
                    return Err(e);
                }
            }
            None => warn!("no joystick source registered, running keyboard/mouse only"),
        }
        self.mkb = Some(mkb);
        Ok(())
    }

    pub fn quit(&mut self, poller: &mut dyn Poller) {
        if let Some(mut mkb) = self.mkb.take() {
            mkb.quit(poller);
            self.sources.restore_mkb(mkb);
        }
        if let Some(js) = self.sources.js_mut() {
            js.quit(poller);
        }
    }

    pub fn grab(&mut self, mode: GrabMode) -> Result<()> {
        self.mkb
            .as_mut()
            .ok_or(Error::NotInitialized)?
            .grab(mode)
    }

    pub fn mouse_name(&self, index: usize) -> Option<&[u8]> {
        self.mkb.as_ref()?.mouse_name(index)
    }

    pub fn keyboard_name(&self, index: usize) -> Option<&[u8]> {
        self.mkb.as_ref()?.keyboard_name(index)
    }

    pub fn joystick_name(&self, index: usize) -> Option<&[u8]> {
        self.sources.js()?.name(index)
    }

    pub fn joystick_button_count(&self, index: usize) -> usize {
        self.sources.js().map_or(0, |js| js.button_count(index))
    }

    pub fn joystick_haptic(&self, index: usize) -> HapticCaps {
        self.sources
            .js()
            .map_or(HapticCaps::empty(), |js| js.haptic_caps(index))
    }

    pub fn set_haptic(&mut self, index: usize, effect: &HapticEffect) -> Result<()> {
        self.sources
            .js_mut()
            .ok_or(Error::NoJoystickSource)?
            .set_haptic(index, effect)
    }

    pub fn joystick_hid(&self, index: usize) -> Option<&str> {
        self.sources.js()?.hid_path(index)
    }

    pub fn joystick_close(&mut self, index: usize, poller: &mut dyn Poller) {
        if let Some(js) = self.sources.js_mut() {
            js.close(index, poller);
        }
    }

    /// Joysticks the backend lost since the last call.
    pub fn take_closed_joysticks(&mut self) -> Vec<usize> {
        self.sources
            .js_mut()
            .map_or_else(Vec::new, |js| js.take_closed())
    }

    /// Routes a completion to the backend owning its token.
    pub fn handle_completion(
        &mut self,
        completion: Completion,
        poller: &mut dyn Poller,
        out: &mut Vec<Event>,
    ) -> Result<()> {
        let token = completion.token();
        match token.kind {
            TokenKind::Mkb => self
                .mkb
                .as_mut()
                .ok_or(Error::UnknownToken(token))?
                .handle_completion(completion, poller, out),
            TokenKind::Joystick => self
                .sources
                .js_mut()
                .ok_or(Error::UnknownToken(token))?
                .handle_completion(completion, poller, out),
            TokenKind::Hid => Err(Error::UnknownToken(token)),
        }
    }

    /// Runs the sync hook of each active backend that has one, once per pump.
    pub fn sync_process(&mut self, out: &mut Vec<Event>) -> Result<()> {
        let mut result = Ok(());
        let mkb_key = self.mkb.as_ref().and_then(|m| m.sync_key());
        if let (Some(mkb), Some(_)) = (self.mkb.as_mut(), mkb_key) {
            result = mkb.sync_process(out);
        }
        if let Some(js) = self.sources.js_mut() {
            match js.sync_key() {
                Some(key) if Some(key) == mkb_key => {
                    debug!(?key, "joystick events already pumped by mkb source");
                }
                Some(_) => {
                    let r = js.sync_process(out);
                    if result.is_ok() {
                        result = r;
                    }
                }
                None => {}
            }
        }
        result
    }
}

impl JoystickRegistrar for EventDispatch {
    fn register_joystick(
        &mut self,
        name: &str,
        caps: HapticCaps,
        sink: Option<Box<dyn HapticSink>>,
    ) -> Result<usize> {
        let js = self.sources.js_mut().ok_or(Error::NoJoystickSource)?;
        let index = js.add(name, caps, sink)?;
        debug!(name, index, ?caps, "software joystick registered");
        Ok(index)
    }
}
