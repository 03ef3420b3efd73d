//! Valve Steam Controller.
//!
//! The controller (wired, or through the wireless dongle) is exposed as a
//! software joystick with 24 buttons and 8 axes. Buttons are numbered over the
//! three button bytes, most significant bit first. Axes:
//!
//! | Axis | Source |
//! |------|--------|
//! | 0, 1 | left, right trigger (0..=32767) |
//! | 2, 3 | left pad X, Y |
//! | 4, 5 | right pad X, Y |
//! | 6, 7 | stick X, Y |
//!
//! Y axes are inverted so that down is positive. The stick and the left pad
//! share the same report fields; the pad-touch bit says which one they carry.
//! Touching the pad re-centers the stick. Only changes against the previous
//! report are emitted, and a pad click raised together with a stick click
//! transition is dropped.
//!
//! Only 64-byte input status reports are decoded; battery and connection
//! reports from the dongle are skipped.
//!
//! Rumble is played as haptic pulses on the two trackpads (weak motor on the
//! right pad, strong on the left).

use crate::error::{Error, Result};
use crate::event::{invert_axis, Event, EventKind, HapticCaps, HapticEffect};
use crate::hid::driver::{
    HidDriver, HidDriverDevice, OpenCtx, OpenOutcome, OutputQueue, OutputReport,
};
use crate::hid::report::{ReportBuilder, ReportReader};
use crate::hid::transport::HidHandle;
use crate::metadata::{HidMatch, ANY_INTERFACE};
use crate::source::HapticSink;
use tracing::{debug, info, trace};

pub const VALVE_VID: u16 = 0x28de;
pub const WIRED_PID: u16 = 0x1102;
pub const WIRELESS_PID: u16 = 0x1142;

/// Name the controller is registered under.
pub const JOYSTICK_NAME: &str = "Valve Software Steam Controller";
pub const BUTTON_COUNT: usize = 24;
pub const AXIS_COUNT: usize = 8;

const REPORT_LEN: usize = 64;
const FEATURE_REPORT_LEN: usize = 65;

/// Big-endian status word of input reports.
const STATUS_INPUT: [u8; 2] = [0x01, 0x3c];

const CMD_CLEAR_MAPPINGS: u8 = 0x81;
const CMD_HAPTIC_PULSE: u8 = 0x8f;

const OFFSET_STATUS: usize = 2;
const OFFSET_BUTTONS: usize = 8;
const OFFSET_LT: usize = 11;
const OFFSET_RT: usize = 12;
const OFFSET_LEFT_X: usize = 16;
const OFFSET_LEFT_Y: usize = 18;
const OFFSET_RIGHT_X: usize = 20;
const OFFSET_RIGHT_Y: usize = 22;

// Bits of the third button byte.
const B2_LPAD_CLICK: u8 = 0x02;
const B2_LPAD_TOUCH: u8 = 0x08;
const B2_STICK_CLICK: u8 = 0x40;

const AXIS_LT: u8 = 0;
const AXIS_RT: u8 = 1;
const AXIS_LPAD_X: u8 = 2;
const AXIS_LPAD_Y: u8 = 3;
const AXIS_RPAD_X: u8 = 4;
const AXIS_RPAD_Y: u8 = 5;
const AXIS_STICK_X: u8 = 6;
const AXIS_STICK_Y: u8 = 7;

/// Longest pulse, in microseconds.
const PULSE_PERIOD_US: u16 = 2048;
const PULSE_REPEAT: u16 = 50;

/// The fields of one input report the driver looks at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct InputReport {
    buttons: [u8; 3],
    left_trigger: u8,
    right_trigger: u8,
    left_x: i16,
    left_y: i16,
    right_x: i16,
    right_y: i16,
}

impl InputReport {
    /// `None` for anything but a full-size input status report.
    fn parse(report: &[u8]) -> Result<Option<Self>> {
        if report.len() != REPORT_LEN {
            return Ok(None);
        }
        let r = ReportReader::new(report);
        if r.bytes(OFFSET_STATUS, 2)? != STATUS_INPUT {
            return Ok(None);
        }
        let b = r.bytes(OFFSET_BUTTONS, 3)?;
        Ok(Some(Self {
            buttons: [b[0], b[1], b[2]],
            left_trigger: r.u8_at(OFFSET_LT)?,
            right_trigger: r.u8_at(OFFSET_RT)?,
            left_x: r.i16_le(OFFSET_LEFT_X)?,
            left_y: r.i16_le(OFFSET_LEFT_Y)?,
            right_x: r.i16_le(OFFSET_RIGHT_X)?,
            right_y: r.i16_le(OFFSET_RIGHT_Y)?,
        }))
    }

    fn pad_touched(&self) -> bool {
        self.buttons[2] & B2_LPAD_TOUCH != 0
    }
}

fn scale_trigger(raw: u8) -> i16 {
    (i32::from(raw) * i32::from(i16::MAX) / 255) as i16
}

fn emit_buttons(device: usize, prev: &InputReport, cur: &InputReport, out: &mut Vec<Event>) {
    let mut inhibit = [0u8; 3];
    if (cur.buttons[2] ^ prev.buttons[2]) & B2_STICK_CLICK != 0 {
        inhibit[2] |= B2_LPAD_CLICK;
    }

    let mut button: u16 = 0;
    for (i, (&now, &before)) in cur.buttons.iter().zip(prev.buttons.iter()).enumerate() {
        let changed = (now ^ before) & !inhibit[i];
        for bit in (0..8).rev() {
            let mask = 1u8 << bit;
            if changed & mask != 0 {
                let kind = if now & mask != 0 {
                    EventKind::JoystickButtonDown { button }
                } else {
                    EventKind::JoystickButtonUp { button }
                };
                out.push(Event::new(device, kind));
            }
            button += 1;
        }
    }
}

fn emit_axes(device: usize, prev: &InputReport, cur: &InputReport, out: &mut Vec<Event>) {
    let mut axis = |axis: u8, value: i16| {
        out.push(Event::new(device, EventKind::JoystickAxis { axis, value }));
    };

    if cur.left_trigger != prev.left_trigger {
        axis(AXIS_LT, scale_trigger(cur.left_trigger));
    }
    if cur.right_trigger != prev.right_trigger {
        axis(AXIS_RT, scale_trigger(cur.right_trigger));
    }

    let touched = cur.pad_touched();
    let was_touched = prev.pad_touched();
    if touched || was_touched {
        if cur.left_x != prev.left_x {
            axis(AXIS_LPAD_X, cur.left_x);
        }
        if cur.left_y != prev.left_y {
            axis(AXIS_LPAD_Y, invert_axis(cur.left_y));
        }
    }

    if cur.right_x != prev.right_x {
        axis(AXIS_RPAD_X, cur.right_x);
    }
    if cur.right_y != prev.right_y {
        axis(AXIS_RPAD_Y, invert_axis(cur.right_y));
    }

    if !touched {
        if cur.left_x != prev.left_x {
            axis(AXIS_STICK_X, cur.left_x);
        }
        if cur.left_y != prev.left_y {
            axis(AXIS_STICK_Y, invert_axis(cur.left_y));
        }
    } else if !was_touched {
        axis(AXIS_STICK_X, 0);
        axis(AXIS_STICK_Y, 0);
    }
}

fn haptic_pulse(side: u8, magnitude: u16) -> Vec<u8> {
    let on = magnitude / 32;
    let (off, repeat) = if on == 0 {
        (0, 0)
    } else {
        (PULSE_PERIOD_US - on, PULSE_REPEAT)
    };
    ReportBuilder::new(FEATURE_REPORT_LEN)
        .u8(0x00)
        .u8(CMD_HAPTIC_PULSE)
        .u8(0x07)
        .u8(side)
        .u16_le(on)
        .u16_le(off)
        .u16_le(repeat)
        .build()
}

/// Plays rumble on the controller's trackpads.
struct PulseSink {
    output: OutputQueue,
}

impl HapticSink for PulseSink {
    fn play(&mut self, effect: &HapticEffect) -> Result<()> {
        let HapticEffect::Rumble { weak, strong } = *effect else {
            return Err(Error::UnsupportedDevice);
        };
        self.output
            .push(OutputReport::Feature(haptic_pulse(0, weak)))?;
        self.output
            .push(OutputReport::Feature(haptic_pulse(1, strong)))
    }
}

pub struct SteamControllerDriver {
    ids: [HidMatch; 5],
}

impl Default for SteamControllerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SteamControllerDriver {
    pub fn new() -> Self {
        Self {
            // Wired controllers first.
            ids: [
                HidMatch::new(VALVE_VID, WIRED_PID, ANY_INTERFACE),
                HidMatch::new(VALVE_VID, WIRELESS_PID, 1),
                HidMatch::new(VALVE_VID, WIRELESS_PID, 2),
                HidMatch::new(VALVE_VID, WIRELESS_PID, 3),
                HidMatch::new(VALVE_VID, WIRELESS_PID, 4),
            ],
        }
    }
}

impl HidDriver for SteamControllerDriver {
    fn name(&self) -> &'static str {
        "steam-controller"
    }

    fn ids(&self) -> &[HidMatch] {
        &self.ids
    }

    fn open(&mut self, handle: &mut dyn HidHandle, ctx: &mut OpenCtx<'_>) -> Result<OpenOutcome> {
        // Stop keyboard/mouse emulation.
        let clear = ReportBuilder::new(FEATURE_REPORT_LEN)
            .u8(0x00)
            .u8(CMD_CLEAR_MAPPINGS)
            .build();
        handle.send_feature_report(&clear)?;

        let sink = PulseSink {
            output: ctx.output.clone(),
        };
        let joystick =
            ctx.registrar
                .register_joystick(JOYSTICK_NAME, HapticCaps::RUMBLE, Some(Box::new(sink)))?;
        info!(joystick, path = %handle.meta().path, "steam controller opened");
        Ok(OpenOutcome::Opened(Box::new(SteamController {
            joystick,
            previous: InputReport::default(),
        })))
    }
}

struct SteamController {
    joystick: usize,
    previous: InputReport,
}

impl HidDriverDevice for SteamController {
    fn process(&mut self, report: &[u8], out: &mut Vec<Event>) -> Result<()> {
        let Some(current) = InputReport::parse(report)? else {
            trace!(len = report.len(), "non-input report skipped");
            return Ok(());
        };
        emit_buttons(self.joystick, &self.previous, &current, out);
        emit_axes(self.joystick, &self.previous, &current, out);
        self.previous = current;
        Ok(())
    }

    fn close(&mut self) {
        debug!(joystick = self.joystick, "steam controller closed");
    }
}
