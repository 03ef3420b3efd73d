//! Hat-to-button translation.
//!
//! A [`HatTranslator`] remembers, per joystick hat, which direction bits are
//! currently pressed. Each incoming hat event is replaced by the button events
//! describing the change:
//!
//! - a newly set bit `b` on hat `h` yields `JoystickButtonDown { button_count + 4*h + log2(b) }`
//! - a newly cleared bit yields the matching `JoystickButtonUp`
//!
//! Releases are emitted first (highest bit first), then presses (lowest bit
//! first). The hat event itself never reaches the output; every other event
//! passes through untouched and in order. Output is appended to a growable
//! buffer, so no batch is ever skipped for lack of room.

use crate::event::{hat, Event, EventKind};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct HatTranslator {
    pressed: HashMap<(usize, u8), u8>,
}

impl HatTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently pressed direction bits of one hat.
    pub fn state(&self, device: usize, hat_index: u8) -> u8 {
        self.pressed.get(&(device, hat_index)).copied().unwrap_or(0)
    }

    /// Drops all remembered state for a joystick (e.g. when it is closed).
    pub fn forget(&mut self, device: usize) {
        self.pressed.retain(|&(d, _), _| d != device);
    }

    /// Expands one event. Non-hat events come back unchanged.
    ///
    /// `button_count` is the number of physical buttons of `event.device`.
    pub fn translate(&mut self, event: Event, button_count: usize) -> Expansion {
        let EventKind::JoystickHat { hat: h, value } = event.kind else {
            return Expansion::single(event);
        };

        let new = value & (hat::UP | hat::RIGHT | hat::DOWN | hat::LEFT);
        let old = self.pressed.insert((event.device, h), new).unwrap_or(0);
        if new == 0 {
            self.pressed.remove(&(event.device, h));
        }

        let base = button_count + 4 * h as usize;
        let mut out = Expansion::empty();
        for bit in hat::DIRECTIONS.iter().rev().copied() {
            if old & bit != 0 && new & bit == 0 {
                if let Some(button) = hat_button(base, bit) {
                    out.push(Event::new(event.device, EventKind::JoystickButtonUp { button }));
                }
            }
        }
        for bit in hat::DIRECTIONS {
            if new & bit != 0 && old & bit == 0 {
                if let Some(button) = hat_button(base, bit) {
                    out.push(Event::new(event.device, EventKind::JoystickButtonDown { button }));
                }
            }
        }
        out
    }

    /// Rewrites a batch, preserving the relative order of every other event.
    pub fn translate_all<F>(&mut self, events: &[Event], button_count: F) -> Vec<Event>
    where
        F: Fn(usize) -> usize,
    {
        let mut out = Vec::with_capacity(events.len());
        for &ev in events {
            let count = button_count(ev.device);
            out.extend(self.translate(ev, count));
        }
        out
    }
}

/// Button number of one hat direction, or `None` past the 16-bit range.
fn hat_button(base: usize, bit: u8) -> Option<u16> {
    base.checked_add(bit.trailing_zeros() as usize)
        .and_then(|b| u16::try_from(b).ok())
}

/// The 0..=4 events produced for one input event.
#[derive(Debug, Clone)]
pub struct Expansion {
    events: [Option<Event>; 4],
    len: usize,
    next: usize,
}

impl Expansion {
    fn empty() -> Self {
        Self {
            events: [None; 4],
            len: 0,
            next: 0,
        }
    }

    fn single(event: Event) -> Self {
        let mut e = Self::empty();
        e.push(event);
        e
    }

    fn push(&mut self, event: Event) {
        self.events[self.len] = Some(event);
        self.len += 1;
    }
}

impl Iterator for Expansion {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        if self.next >= self.len {
            return None;
        }
        let ev = self.events[self.next].take();
        self.next += 1;
        ev
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.len - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Expansion {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hat_ev(device: usize, h: u8, value: u8) -> Event {
        Event::new(device, EventKind::JoystickHat { hat: h, value })
    }

    fn buttons(events: &[Event]) -> Vec<(bool, u16)> {
        events
            .iter()
            .map(|e| match e.kind {
                EventKind::JoystickButtonDown { button } => (true, button),
                EventKind::JoystickButtonUp { button } => (false, button),
                other => panic!("unexpected {other:?}"),
            })
            .collect()
    }

    #[test]
    fn up_then_diagonal_then_center() {
        let mut t = HatTranslator::new();
        let input = [
            hat_ev(0, 0, hat::CENTERED),
            hat_ev(0, 0, hat::UP),
            hat_ev(0, 0, hat::UP | hat::RIGHT),
            hat_ev(0, 0, hat::CENTERED),
        ];
        let out = t.translate_all(&input, |_| 8);
        assert_eq!(
            buttons(&out),
            vec![(true, 8), (true, 9), (false, 9), (false, 8)]
        );
        assert_eq!(t.state(0, 0), 0);
    }

    #[test]
    fn second_hat_is_offset_by_four() {
        let mut t = HatTranslator::new();
        let out: Vec<Event> = t.translate(hat_ev(2, 1, hat::LEFT), 10).collect();
        assert_eq!(buttons(&out), vec![(true, 10 + 4 + 3)]);
        assert_eq!(t.state(2, 1), hat::LEFT);
    }

    #[test]
    fn other_events_keep_their_order() {
        let mut t = HatTranslator::new();
        let a = Event::new(0, EventKind::JoystickAxis { axis: 1, value: 5 });
        let b = Event::new(0, EventKind::JoystickButtonDown { button: 2 });
        let out = t.translate_all(&[a, hat_ev(0, 0, hat::DOWN), b], |_| 4);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], a);
        assert_eq!(
            out[1].kind,
            EventKind::JoystickButtonDown { button: 4 + 2 }
        );
        assert_eq!(out[2], b);
    }

    #[test]
    fn repeated_state_emits_nothing() {
        let mut t = HatTranslator::new();
        assert_eq!(t.translate(hat_ev(0, 0, hat::UP), 0).len(), 1);
        assert_eq!(t.translate(hat_ev(0, 0, hat::UP), 0).len(), 0);
        t.forget(0);
        assert_eq!(t.state(0, 0), 0);
    }

    #[test]
    fn buttons_past_the_16_bit_range_are_dropped() {
        let mut t = HatTranslator::new();
        let out: Vec<Event> = t
            .translate(hat_ev(0, 0, hat::UP | hat::LEFT), u16::MAX as usize - 1)
            .collect();
        assert_eq!(buttons(&out), vec![(true, u16::MAX - 1)]);
        assert_eq!(t.state(0, 0), hat::UP | hat::LEFT);
    }

    proptest! {
        #[test]
        fn presses_and_releases_balance(seq in proptest::collection::vec(0u8..16, 0..32)) {
            let mut t = HatTranslator::new();
            let mut input: Vec<Event> = seq.iter().map(|&v| hat_ev(1, 0, v)).collect();
            input.push(hat_ev(1, 0, hat::CENTERED));
            let out = t.translate_all(&input, |_| 0);
            let mut held = [false; 4];
            for (down, button) in buttons(&out) {
                let slot = &mut held[button as usize];
                prop_assert_ne!(*slot, down);
                *slot = down;
            }
            prop_assert_eq!(held, [false; 4]);
            prop_assert_eq!(t.state(1, 0), 0);
        }
    }
}
