//! Physical joystick source.
//!
//! Each evdev joystick is remapped at `add` time from the node's static
//! capabilities:
//!
//! - absolute axes other than the hats are numbered in code order and scaled
//!   from `[min, max]` to the full `i16` range;
//! - `ABS_HAT0X..=ABS_HAT3Y` pairs that are present become hats, numbered in
//!   order, with the usual bitmask layout;
//! - key codes from `BTN_MISC` up become buttons in code order.
//!
//! Force feedback keeps one uploaded effect per [`HapticKind`]: the first play
//! uploads it, later plays update it in place, and a null effect stops it.
//!
//! Closing a joystick only detaches it from the current session; its node
//! stays with the source and is attached again by the next `init`. A node that
//! reports EOF or an error is gone for good and is reported through
//! [`JsSource::take_closed`].

use super::{decode_events, RawEvent, ABS_HAT0X, ABS_HAT3Y, BTN_MISC, EV_ABS, EV_KEY};
use crate::device::{AbsInfo, JoystickNode};
use crate::error::{Error, Result};
use crate::event::{hat, DeviceClass, Event, EventKind, HapticCaps, HapticEffect, HapticKind};
use crate::poll::{Completion, Interest, Poller, Token, TokenKind};
use crate::slots::SlotTable;
use crate::source::{HapticSink, JsSource, SoftJoystick};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const MAX_JOYSTICKS: usize = 64;

/// Scales `value` from `[min, max]` to `[-32768, 32767]`.
pub fn scale_axis(value: i32, min: i32, max: i32) -> i16 {
    if max <= min {
        return 0;
    }
    let span = i64::from(max) - i64::from(min);
    let v = i64::from(value.clamp(min, max)) - i64::from(min);
    (v * 65535 / span - 32768) as i16
}

struct EvdevStick {
    node: Box<dyn JoystickNode>,
    axes: HashMap<u16, (u8, AbsInfo)>,
    /// code -> (hat index, is the Y half)
    hats: HashMap<u16, (u8, bool)>,
    hat_state: Vec<u8>,
    buttons: HashMap<u16, u16>,
    caps: HapticCaps,
    effects: HashMap<HapticKind, i16>,
    carry: Vec<u8>,
    attached: bool,
}

impl EvdevStick {
    fn new(node: Box<dyn JoystickNode>) -> Self {
        let mut abs = node.abs_axes();
        abs.sort_by_key(|a| a.code);

        let mut axes = HashMap::new();
        let mut hats = HashMap::new();
        let mut hat_numbers: Vec<u16> = Vec::new();
        for info in abs {
            if (ABS_HAT0X..=ABS_HAT3Y).contains(&info.code) {
                let number = (info.code - ABS_HAT0X) / 2;
                let index = match hat_numbers.iter().position(|&n| n == number) {
                    Some(i) => i,
                    None => {
                        hat_numbers.push(number);
                        hat_numbers.len() - 1
                    }
                };
                hats.insert(info.code, (index as u8, (info.code - ABS_HAT0X) % 2 == 1));
            } else {
                let index = axes.len() as u8;
                axes.insert(info.code, (index, info));
            }
        }

        let mut keys: Vec<u16> = node.keys().into_iter().filter(|&k| k >= BTN_MISC).collect();
        keys.sort_unstable();
        keys.dedup();
        let buttons = keys
            .into_iter()
            .enumerate()
            .map(|(i, code)| (code, i as u16))
            .collect();

        let caps = node.ff_caps();
        Self {
            node,
            axes,
            hats,
            hat_state: vec![0; hat_numbers.len()],
            buttons,
            caps,
            effects: HashMap::new(),
            carry: Vec::new(),
            attached: true,
        }
    }

    fn apply(&mut self, device: usize, ev: RawEvent, out: &mut Vec<Event>) {
        match ev.kind {
            EV_KEY => {
                let Some(&button) = self.buttons.get(&ev.code) else {
                    return;
                };
                let kind = match ev.value {
                    0 => EventKind::JoystickButtonUp { button },
                    1 => EventKind::JoystickButtonDown { button },
                    _ => return,
                };
                out.push(Event::new(device, kind));
            }
            EV_ABS => {
                if let Some(&(axis, info)) = self.axes.get(&ev.code) {
                    let value = scale_axis(ev.value, info.min, info.max);
                    out.push(Event::new(device, EventKind::JoystickAxis { axis, value }));
                } else if let Some(&(index, is_y)) = self.hats.get(&ev.code) {
                    let Some(state) = self.hat_state.get_mut(index as usize) else {
                        return;
                    };
                    let (neg, pos) = if is_y {
                        (hat::UP, hat::DOWN)
                    } else {
                        (hat::LEFT, hat::RIGHT)
                    };
                    let mut next = *state & !(neg | pos);
                    match ev.value.signum() {
                        -1 => next |= neg,
                        1 => next |= pos,
                        _ => {}
                    }
                    if next != *state {
                        *state = next;
                        out.push(Event::new(
                            device,
                            EventKind::JoystickHat {
                                hat: index,
                                value: next,
                            },
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    fn play(&mut self, effect: &HapticEffect) -> Result<()> {
        let kind = effect.kind();
        if !self.caps.contains(kind.cap()) {
            return Err(Error::UnsupportedDevice);
        }
        if effect.is_null() {
            if let Some(&id) = self.effects.get(&kind) {
                self.node.play_effect(id, false)?;
            }
            return Ok(());
        }
        let id = self.node.upload_effect(effect, self.effects.get(&kind).copied())?;
        self.effects.insert(kind, id);
        self.node.play_effect(id, true)?;
        Ok(())
    }

    fn release(&mut self) {
        for (kind, id) in self.effects.drain() {
            if let Err(e) = self.node.erase_effect(id) {
                debug!(?kind, id, error = %e, "effect erase failed");
            }
        }
        self.hat_state.iter_mut().for_each(|h| *h = 0);
        self.carry.clear();
        self.attached = false;
    }
}

enum Stick {
    Evdev(EvdevStick),
    Soft(SoftJoystick),
}

/// Joysticks read from evdev nodes the host opened, plus software joysticks.
pub struct LinuxJoysticks {
    sticks: SlotTable<Stick>,
    lost: Vec<usize>,
}

impl Default for LinuxJoysticks {
    fn default() -> Self {
        Self {
            sticks: SlotTable::with_capacity(MAX_JOYSTICKS),
            lost: Vec::new(),
        }
    }
}

impl LinuxJoysticks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_joystick(mut self, node: impl JoystickNode + 'static) -> Self {
        if let Err(e) = self.add_node(Box::new(node)) {
            warn!(error = %e, "joystick node dropped");
        }
        self
    }

    pub fn add_node(&mut self, node: Box<dyn JoystickNode>) -> Result<usize> {
        let stick = EvdevStick::new(node);
        debug!(
            axes = stick.axes.len(),
            hats = stick.hat_state.len(),
            buttons = stick.buttons.len(),
            caps = ?stick.caps,
            "evdev joystick mapped"
        );
        self.push(Stick::Evdev(stick))
    }

    fn push(&mut self, stick: Stick) -> Result<usize> {
        self.sticks.push(stick).map_err(|_| Error::TableFull {
            class: DeviceClass::Joystick,
            capacity: MAX_JOYSTICKS,
        })
    }

    /// A joystick visible in the current session.
    fn live(&self, index: usize) -> Option<&Stick> {
        match self.sticks.get(index)? {
            Stick::Evdev(s) if !s.attached => None,
            stick => Some(stick),
        }
    }

    fn detach(index: usize, stick: &mut EvdevStick, poller: &mut dyn Poller) {
        if !stick.attached {
            return;
        }
        if let Err(e) = poller.remove(Token::new(TokenKind::Joystick, index)) {
            debug!(index, error = %e, "joystick token was not registered");
        }
        stick.release();
        info!(index, "evdev joystick closed");
    }

    /// Forgets a node whose device went away.
    fn lose(&mut self, index: usize, poller: &mut dyn Poller) {
        if let Some(Stick::Evdev(mut s)) = self.sticks.remove(index) {
            Self::detach(index, &mut s, poller);
            self.lost.push(index);
        }
    }
}

impl JsSource for LinuxJoysticks {
    fn init(&mut self, poller: &mut dyn Poller) -> Result<()> {
        let evdev: Vec<usize> = self
            .sticks
            .iter()
            .filter(|(_, s)| matches!(s, Stick::Evdev(_)))
            .map(|(i, _)| i)
            .collect();
        for (n, &index) in evdev.iter().enumerate() {
            let token = Token::new(TokenKind::Joystick, index);
            if let Err(e) = poller.register(token, Interest::READ | Interest::CLOSE) {
                for &done in &evdev[..n] {
                    let _ = poller.remove(Token::new(TokenKind::Joystick, done));
                }
                return Err(e);
            }
        }
        for (_, stick) in self.sticks.iter_mut() {
            if let Stick::Evdev(s) = stick {
                s.attached = true;
            }
        }
        info!(joysticks = self.sticks.len(), "evdev joystick source ready");
        Ok(())
    }

    fn name(&self, index: usize) -> Option<&[u8]> {
        match self.live(index)? {
            Stick::Evdev(s) => Some(s.node.name()),
            Stick::Soft(s) => Some(s.name.as_bytes()),
        }
    }

    fn add(
        &mut self,
        name: &str,
        caps: HapticCaps,
        sink: Option<Box<dyn HapticSink>>,
    ) -> Result<usize> {
        self.push(Stick::Soft(SoftJoystick::new(name, caps, sink)))
    }

    fn button_count(&self, index: usize) -> usize {
        match self.live(index) {
            Some(Stick::Evdev(s)) => s.buttons.len(),
            _ => 0,
        }
    }

    fn haptic_caps(&self, index: usize) -> HapticCaps {
        match self.live(index) {
            Some(Stick::Evdev(s)) => s.caps,
            Some(Stick::Soft(s)) => s.caps,
            None => HapticCaps::empty(),
        }
    }

    fn set_haptic(&mut self, index: usize, effect: &HapticEffect) -> Result<()> {
        match self.sticks.get_mut(index).ok_or(Error::NoSuchDevice)? {
            Stick::Evdev(s) if !s.attached => Err(Error::NoSuchDevice),
            Stick::Evdev(s) => s.play(effect),
            Stick::Soft(s) => s.play(effect),
        }
    }

    fn hid_path(&self, index: usize) -> Option<&str> {
        match self.live(index)? {
            Stick::Evdev(s) => s.node.hid_path(),
            Stick::Soft(_) => None,
        }
    }

    fn close(&mut self, index: usize, poller: &mut dyn Poller) {
        let soft = match self.sticks.get_mut(index) {
            Some(Stick::Evdev(s)) => {
                Self::detach(index, s, poller);
                false
            }
            Some(Stick::Soft(_)) => true,
            None => false,
        };
        if soft {
            self.sticks.remove(index);
        }
    }

    fn take_closed(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.lost)
    }

    fn handle_completion(
        &mut self,
        completion: Completion,
        poller: &mut dyn Poller,
        out: &mut Vec<Event>,
    ) -> Result<()> {
        let token = completion.token();
        let index = token.slot;
        let Some(Stick::Evdev(stick)) = self.sticks.get_mut(index) else {
            return Err(Error::UnknownToken(token));
        };
        if !stick.attached {
            return Err(Error::UnknownToken(token));
        }
        match completion {
            Completion::Read { result: Ok(data), .. } if data.is_empty() => {
                self.lose(index, poller);
                Ok(())
            }
            Completion::Read { result: Ok(data), .. } => {
                for ev in decode_events(&mut stick.carry, &data) {
                    stick.apply(index, ev, out);
                }
                Ok(())
            }
            Completion::Read { result: Err(e), .. } => {
                warn!(index, error = %e, "joystick read failed, closing");
                self.lose(index, poller);
                Err(Error::Io(e))
            }
            Completion::Write { .. } => Ok(()),
            Completion::Closed { .. } => {
                self.lose(index, poller);
                Ok(())
            }
        }
    }

    /// Detaches every node and renumbers the survivors for the next session.
    fn quit(&mut self, poller: &mut dyn Poller) {
        let mut kept = Vec::new();
        for index in self.sticks.indices() {
            if let Some(Stick::Evdev(mut s)) = self.sticks.remove(index) {
                Self::detach(index, &mut s, poller);
                kept.push(s);
            }
        }
        self.sticks.clear();
        self.lost.clear();
        for s in kept {
            let _ = self.sticks.push(Stick::Evdev(s));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::linux::{ABS_X, ABS_Y, BTN_SOUTH, BTN_TRIGGER};
    use crate::device::EvdevNode;
    use crate::poll::LocalReactor;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    #[derive(Default)]
    struct FfLog {
        uploads: Vec<(HapticKind, Option<i16>)>,
        plays: Vec<(i16, bool)>,
        erased: Vec<i16>,
    }

    struct Pad {
        log: Rc<RefCell<FfLog>>,
    }

    impl EvdevNode for Pad {
        fn name(&self) -> &[u8] {
            b"Microsoft X-Box 360 pad"
        }
    }

    impl JoystickNode for Pad {
        fn abs_axes(&self) -> Vec<AbsInfo> {
            vec![
                AbsInfo {
                    code: ABS_HAT0X + 1,
                    min: -1,
                    max: 1,
                },
                AbsInfo {
                    code: ABS_Y,
                    min: 0,
                    max: 255,
                },
                AbsInfo {
                    code: ABS_HAT0X,
                    min: -1,
                    max: 1,
                },
                AbsInfo {
                    code: ABS_X,
                    min: -32768,
                    max: 32767,
                },
            ]
        }

        fn keys(&self) -> Vec<u16> {
            vec![BTN_SOUTH + 1, 30, BTN_SOUTH, BTN_TRIGGER]
        }

        fn ff_caps(&self) -> HapticCaps {
            HapticCaps::RUMBLE
        }

        fn upload_effect(&mut self, effect: &HapticEffect, id: Option<i16>) -> io::Result<i16> {
            self.log.borrow_mut().uploads.push((effect.kind(), id));
            Ok(id.unwrap_or(4))
        }

        fn play_effect(&mut self, id: i16, play: bool) -> io::Result<()> {
            self.log.borrow_mut().plays.push((id, play));
            Ok(())
        }

        fn erase_effect(&mut self, id: i16) -> io::Result<()> {
            self.log.borrow_mut().erased.push(id);
            Ok(())
        }
    }

    fn pad() -> (LinuxJoysticks, Rc<RefCell<FfLog>>, LocalReactor) {
        let log = Rc::new(RefCell::new(FfLog::default()));
        let mut js = LinuxJoysticks::new().with_joystick(Pad { log: log.clone() });
        let mut poller = LocalReactor::new();
        js.init(&mut poller).unwrap();
        (js, log, poller)
    }

    fn read(events: &[(u16, u16, i32)]) -> Completion {
        Completion::Read {
            token: Token::new(TokenKind::Joystick, 0),
            result: Ok(events
                .iter()
                .flat_map(|&(k, c, v)| RawEvent::new(k, c, v).to_bytes())
                .collect()),
        }
    }

    #[test]
    fn remaps_axes_hats_and_buttons() {
        let (mut js, _, mut poller) = pad();
        assert_eq!(js.button_count(0), 3);

        let mut out = Vec::new();
        js.handle_completion(
            read(&[
                (EV_ABS, ABS_Y, 255),
                (EV_ABS, ABS_HAT0X, -1),
                (EV_ABS, ABS_HAT0X + 1, -1),
                (EV_ABS, ABS_HAT0X, 0),
                (EV_KEY, BTN_SOUTH, 1),
                (EV_KEY, BTN_TRIGGER, 0),
                (EV_KEY, 30, 1),
            ]),
            &mut poller,
            &mut out,
        )
        .unwrap();

        let kinds: Vec<EventKind> = out.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::JoystickAxis {
                    axis: 1,
                    value: 32767
                },
                EventKind::JoystickHat {
                    hat: 0,
                    value: hat::LEFT
                },
                EventKind::JoystickHat {
                    hat: 0,
                    value: hat::LEFT_UP
                },
                EventKind::JoystickHat {
                    hat: 0,
                    value: hat::UP
                },
                EventKind::JoystickButtonDown { button: 1 },
                EventKind::JoystickButtonUp { button: 0 },
            ]
        );
    }

    #[test]
    fn effects_upload_once_then_update() {
        let (mut js, log, _) = pad();
        let strong = HapticEffect::Rumble {
            weak: 0,
            strong: 900,
        };
        js.set_haptic(0, &strong).unwrap();
        js.set_haptic(0, &strong).unwrap();
        js.set_haptic(0, &HapticEffect::Rumble { weak: 0, strong: 0 })
            .unwrap();
        let constant = HapticEffect::Constant {
            level: 5,
            direction: 0,
        };
        assert!(matches!(
            js.set_haptic(0, &constant),
            Err(Error::UnsupportedDevice)
        ));

        let log = log.borrow();
        assert_eq!(
            log.uploads,
            vec![(HapticKind::Rumble, None), (HapticKind::Rumble, Some(4))]
        );
        assert_eq!(log.plays, vec![(4, true), (4, true), (4, false)]);
    }

    #[test]
    fn close_erases_effects_and_deregisters() {
        let (mut js, log, mut poller) = pad();
        js.set_haptic(0, &HapticEffect::Rumble { weak: 1, strong: 1 })
            .unwrap();
        js.close(0, &mut poller);
        js.close(0, &mut poller);
        assert_eq!(log.borrow().erased, vec![4]);
        assert_eq!(poller.registered_count(), 0);
        assert_eq!(js.name(0), None);
    }

    #[test]
    fn closed_node_comes_back_after_quit() {
        let (mut js, _, mut poller) = pad();
        js.add("soft", HapticCaps::empty(), None).unwrap();
        js.close(0, &mut poller);
        assert!(js.take_closed().is_empty());

        js.quit(&mut poller);
        js.init(&mut poller).unwrap();
        assert_eq!(js.name(0), Some(&b"Microsoft X-Box 360 pad"[..]));
        assert_eq!(js.name(1), None);
        assert_eq!(poller.registered_count(), 1);

        let mut out = Vec::new();
        js.handle_completion(read(&[(EV_KEY, BTN_SOUTH, 1)]), &mut poller, &mut out)
            .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn failing_node_is_lost_for_good() {
        let (mut js, _, mut poller) = pad();
        let failed = Completion::Read {
            token: Token::new(TokenKind::Joystick, 0),
            result: Err(io::Error::from(io::ErrorKind::BrokenPipe)),
        };
        let mut out = Vec::new();
        assert!(matches!(
            js.handle_completion(failed, &mut poller, &mut out),
            Err(Error::Io(_))
        ));
        assert_eq!(js.take_closed(), vec![0]);
        assert_eq!(poller.registered_count(), 0);

        js.quit(&mut poller);
        js.init(&mut poller).unwrap();
        assert_eq!(js.name(0), None);
    }

    #[test]
    fn soft_joysticks_share_the_table() {
        let (mut js, _, _) = pad();
        let idx = js.add("Steam Controller", HapticCaps::RUMBLE, None).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(js.name(1), Some(&b"Steam Controller"[..]));
        assert_eq!(js.button_count(1), 0);
    }

    #[test]
    fn axis_scaling_endpoints() {
        assert_eq!(scale_axis(0, 0, 255), -32768);
        assert_eq!(scale_axis(255, 0, 255), 32767);
        assert_eq!(scale_axis(-32768, -32768, 32767), -32768);
        assert_eq!(scale_axis(32767, -32768, 32767), 32767);
        assert_eq!(scale_axis(5, 3, 3), 0);
    }

    proptest! {
        #[test]
        fn scaled_axis_is_monotonic(min in -1000i32..0, span in 1i32..4000, a in 0i32..4000, b in 0i32..4000) {
            let max = min + span;
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(scale_axis(min + lo, min, max) <= scale_axis(min + hi, min, max));
        }
    }
}
