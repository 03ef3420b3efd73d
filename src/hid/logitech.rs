//! Logitech wheels.
//!
//! Most Logitech wheels plug in emulating an older model with a reduced
//! feature set. The real model is recovered from the product id and
//! `bcdDevice`; sending the model's native-mode command makes the wheel
//! re-enumerate under its own product id at the same path.
//!
//! | Emulated product        | `bcdDevice` mask/value          | Native model | Command        |
//! |-------------------------|---------------------------------|--------------|----------------|
//! | DF, DFP, DFGT, G25, G27 | `0xfff8`/`0x1350`, `0xff00`/`0x8900` | G29 (`0xC24F`)  | `f8 09 05 01 01` |
//! | DF, DFP                 | `0xff00`/`0x1300`               | DFGT (`0xC29A`) | `f8 09 03 01`  |
//! | DF, DFP, G25            | `0xfff0`/`0x1230`               | G27 (`0xC29B`)  | `f8 09 04 01`  |
//! | DF, DFP                 | `0xff00`/`0x1200`               | G25 (`0xC299`)  | `f8 10`        |
//! | DF                      | `0xf000`/`0x1000`               | DFP (`0xC298`)  | `f8 01`        |
//!
//! Rows are checked in order. Every command is a single 7-byte output report
//! starting with a zero report id.
//!
//! A wheel that needs no switch is mirrored to a
//! [`VirtualHid`](super::VirtualHid) device that receives the raw reports.
//! Models whose stock descriptor hides the pedals behind a vendor page get a
//! replacement exposing them as separate axes. The G29 is not claimed once
//! native; the OS handles it.

use crate::config::NativeModeConfig;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::hid::driver::{
    HidDriver, HidDriverDevice, OpenCtx, OpenOutcome, SharedVirtualHid,
};
use crate::hid::report::ReportBuilder;
use crate::hid::transport::{HidHandle, HidTransport};
use crate::metadata::{HidMatch, ANY_INTERFACE};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const LOGITECH_VID: u16 = 0x046d;

/// Output reports are 7 bytes, report id included.
const COMMAND_LEN: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WheelModel {
    FormulaForce,
    FormulaForceGp,
    DrivingForce,
    Momo,
    DrivingForcePro,
    G25,
    DrivingForceGt,
    G27,
    Momo2,
    G29,
}

impl WheelModel {
    /// Models the driver claims.
    pub const SUPPORTED: [WheelModel; 9] = [
        WheelModel::FormulaForce,
        WheelModel::FormulaForceGp,
        WheelModel::DrivingForce,
        WheelModel::Momo,
        WheelModel::DrivingForcePro,
        WheelModel::G25,
        WheelModel::DrivingForceGt,
        WheelModel::G27,
        WheelModel::Momo2,
    ];

    pub fn from_pid(pid: u16) -> Option<Self> {
        Self::SUPPORTED
            .into_iter()
            .chain([WheelModel::G29])
            .find(|m| m.pid() == pid)
    }

    pub fn pid(self) -> u16 {
        match self {
            WheelModel::FormulaForce => 0xc291,
            WheelModel::FormulaForceGp => 0xc293,
            WheelModel::DrivingForce => 0xc294,
            WheelModel::Momo => 0xc295,
            WheelModel::DrivingForcePro => 0xc298,
            WheelModel::G25 => 0xc299,
            WheelModel::DrivingForceGt => 0xc29a,
            WheelModel::G27 => 0xc29b,
            WheelModel::Momo2 => 0xca03,
            WheelModel::G29 => 0xc24f,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WheelModel::FormulaForce => "Logitech Formula Force",
            WheelModel::FormulaForceGp => "Logitech Formula Force GP",
            WheelModel::DrivingForce => "Logitech Driving Force",
            WheelModel::Momo => "Logitech MOMO Force",
            WheelModel::DrivingForcePro => "Logitech Driving Force Pro",
            WheelModel::G25 => "Logitech G25 Racing Wheel",
            WheelModel::DrivingForceGt => "Logitech Driving Force GT",
            WheelModel::G27 => "Logitech G27 Racing Wheel",
            WheelModel::Momo2 => "Logitech MOMO Racing",
            WheelModel::G29 => "Logitech G29 Driving Force Racing Wheel",
        }
    }

    /// The model hiding behind this product id, when it is not already
    /// running natively.
    pub fn native_target(self, release: u16) -> Option<WheelModel> {
        use WheelModel::*;
        let g29_host = matches!(
            self,
            DrivingForce | DrivingForcePro | DrivingForceGt | G25 | G27
        );
        let target = if g29_host && (release & 0xfff8 == 0x1350 || release & 0xff00 == 0x8900) {
            G29
        } else if matches!(self, DrivingForce | DrivingForcePro) && release & 0xff00 == 0x1300 {
            DrivingForceGt
        } else if matches!(self, DrivingForce | DrivingForcePro | G25)
            && release & 0xfff0 == 0x1230
        {
            G27
        } else if matches!(self, DrivingForce | DrivingForcePro) && release & 0xff00 == 0x1200 {
            G25
        } else if self == DrivingForce && release & 0xf000 == 0x1000 {
            DrivingForcePro
        } else {
            return None;
        };
        Some(target)
    }

    /// Output report switching an emulating wheel to this model.
    pub fn native_mode_command(self) -> Option<Vec<u8>> {
        let body: &[u8] = match self {
            WheelModel::DrivingForceGt => &[0xf8, 0x09, 0x03, 0x01],
            WheelModel::G27 => &[0xf8, 0x09, 0x04, 0x01],
            WheelModel::G25 => &[0xf8, 0x10],
            WheelModel::DrivingForcePro => &[0xf8, 0x01],
            WheelModel::G29 => &[0xf8, 0x09, 0x05, 0x01, 0x01],
            _ => return None,
        };
        Some(ReportBuilder::new(COMMAND_LEN).u8(0x00).bytes(body).build())
    }

    /// Replacement descriptor with separate pedal axes, where one is needed.
    pub fn fixed_descriptor(self) -> Option<&'static [u8]> {
        match self {
            WheelModel::FormulaForceGp => Some(FFGP_RDESC_FIXED),
            WheelModel::DrivingForce => Some(DF_RDESC_FIXED),
            WheelModel::Momo => Some(MOMO_RDESC_FIXED),
            WheelModel::Momo2 => Some(MOMO2_RDESC_FIXED),
            WheelModel::DrivingForcePro => Some(DFP_RDESC_FIXED),
            _ => None,
        }
    }
}

/// Waits for the wheel at `path` to come back as `pid`.
fn wait_for_native(
    transport: &mut dyn HidTransport,
    path: &str,
    pid: u16,
    config: NativeModeConfig,
) -> Result<()> {
    for attempt in 0..config.retries {
        thread::sleep(Duration::from_millis(config.backoff_ms));
        let found = transport
            .enumerate()?
            .iter()
            .any(|m| m.vid == LOGITECH_VID && m.pid == pid && m.path == path);
        if found {
            debug!(attempt, path, "native product 0x{:04x} enumerated", pid);
            return Ok(());
        }
    }
    Err(Error::NativeModeTimeout { product_id: pid })
}

/// Driver for Logitech wheels.
pub struct LogitechWheelDriver {
    ids: Vec<HidMatch>,
    virtual_hid: Option<SharedVirtualHid>,
}

impl Default for LogitechWheelDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LogitechWheelDriver {
    /// Switches wheels to native mode only; without a virtual HID sink the
    /// wheels themselves are left to the OS joystick backend.
    pub fn new() -> Self {
        let ids = WheelModel::SUPPORTED
            .iter()
            .map(|m| HidMatch::new(LOGITECH_VID, m.pid(), ANY_INTERFACE))
            .collect();
        Self {
            ids,
            virtual_hid: None,
        }
    }

    /// Also mirrors wheels through `virtual_hid`.
    pub fn with_virtual_hid(mut self, virtual_hid: SharedVirtualHid) -> Self {
        self.virtual_hid = Some(virtual_hid);
        self
    }
}

impl HidDriver for LogitechWheelDriver {
    fn name(&self) -> &'static str {
        "logitech-wheel"
    }

    fn ids(&self) -> &[HidMatch] {
        &self.ids
    }

    fn open(&mut self, handle: &mut dyn HidHandle, ctx: &mut OpenCtx<'_>) -> Result<OpenOutcome> {
        let meta = handle.meta().clone();
        let model = WheelModel::from_pid(meta.pid).ok_or(Error::UnsupportedDevice)?;

        if let Some(target) = model.native_target(meta.release) {
            let command = target
                .native_mode_command()
                .ok_or(Error::UnsupportedDevice)?;
            handle.write_now(&command).inspect_err(|e| {
                warn!(path = %meta.path, error = %e, "cannot send native mode command");
            })?;
            info!(path = %meta.path, model = target.name(), "native mode command sent");
            wait_for_native(ctx.transport, &meta.path, target.pid(), ctx.native_mode)
                .inspect_err(|_| {
                    warn!(model = target.name(), "wheel did not come back in native mode");
                })?;
            info!(model = target.name(), "wheel switched to native mode");
            return Ok(OpenOutcome::Reenumerated);
        }

        debug!(path = %meta.path, model = model.name(), "native mode already enabled");
        let Some(virtual_hid) = self.virtual_hid.clone() else {
            return Err(Error::MissingHook("virtual hid"));
        };
        let id = virtual_hid
            .borrow_mut()
            .create(model.name(), &meta, model.fixed_descriptor())?;
        info!(model = model.name(), id, "wheel mirrored to virtual HID device");
        Ok(OpenOutcome::Opened(Box::new(WheelDevice { virtual_hid, id })))
    }
}

struct WheelDevice {
    virtual_hid: SharedVirtualHid,
    id: usize,
}

impl HidDriverDevice for WheelDevice {
    fn process(&mut self, report: &[u8], _out: &mut Vec<Event>) -> Result<()> {
        self.virtual_hid.borrow_mut().input(self.id, report)
    }

    fn close(&mut self) {
        self.virtual_hid.borrow_mut().destroy(self.id);
    }
}

/// Driving Force: 10-bit wheel, 12 buttons, hat, throttle (Y) and brake (Rz).
const DF_RDESC_FIXED: &[u8] = &[
    0x05, 0x01, //       Usage Page (Desktop)
    0x09, 0x04, //       Usage (Joystick)
    0xa1, 0x01, //       Collection (Application)
    0xa1, 0x02, //         Collection (Logical)
    0x95, 0x01, //           Report Count (1)
    0x75, 0x0a, //           Report Size (10)
    0x14, //                 Logical Minimum (0)
    0x26, 0xff, 0x03, //     Logical Maximum (1023)
    0x34, //                 Physical Minimum (0)
    0x46, 0xff, 0x03, //     Physical Maximum (1023)
    0x09, 0x30, //           Usage (X)
    0x81, 0x02, //           Input (Variable)
    0x95, 0x0c, //           Report Count (12)
    0x75, 0x01, //           Report Size (1)
    0x25, 0x01, //           Logical Maximum (1)
    0x45, 0x01, //           Physical Maximum (1)
    0x05, 0x09, //           Usage Page (Button)
    0x19, 0x01, //           Usage Minimum (1)
    0x29, 0x0c, //           Usage Maximum (12)
    0x81, 0x02, //           Input (Variable)
    0x95, 0x02, //           Report Count (2)
    0x06, 0x00, 0xff, //     Usage Page (Vendor)
    0x09, 0x01, //           Usage (01h)
    0x81, 0x02, //           Input (Variable)
    0x05, 0x01, //           Usage Page (Desktop)
    0x26, 0xff, 0x00, //     Logical Maximum (255)
    0x46, 0xff, 0x00, //     Physical Maximum (255)
    0x95, 0x01, //           Report Count (1)
    0x75, 0x08, //           Report Size (8)
    0x81, 0x02, //           Input (Variable)
    0x25, 0x07, //           Logical Maximum (7)
    0x46, 0x3b, 0x01, //     Physical Maximum (315)
    0x75, 0x04, //           Report Size (4)
    0x65, 0x14, //           Unit (Degrees)
    0x09, 0x39, //           Usage (Hat Switch)
    0x81, 0x42, //           Input (Variable, Null State)
    0x75, 0x01, //           Report Size (1)
    0x95, 0x04, //           Report Count (4)
    0x65, 0x00, //           Unit
    0x06, 0x00, 0xff, //     Usage Page (Vendor)
    0x09, 0x01, //           Usage (01h)
    0x25, 0x01, //           Logical Maximum (1)
    0x45, 0x01, //           Physical Maximum (1)
    0x81, 0x02, //           Input (Variable)
    0x05, 0x01, //           Usage Page (Desktop)
    0x95, 0x01, //           Report Count (1)
    0x75, 0x08, //           Report Size (8)
    0x26, 0xff, 0x00, //     Logical Maximum (255)
    0x46, 0xff, 0x00, //     Physical Maximum (255)
    0x09, 0x31, //           Usage (Y)
    0x81, 0x02, //           Input (Variable)
    0x09, 0x35, //           Usage (Rz)
    0x81, 0x02, //           Input (Variable)
    0xc0, //               End Collection
    0xa1, 0x02, //         Collection (Logical)
    0x26, 0xff, 0x00, //     Logical Maximum (255)
    0x46, 0xff, 0x00, //     Physical Maximum (255)
    0x95, 0x07, //           Report Count (7)
    0x75, 0x08, //           Report Size (8)
    0x09, 0x03, //           Usage (03h)
    0x91, 0x02, //           Output (Variable)
    0xc0, //               End Collection
    0xc0, //             End Collection
];

/// Driving Force Pro: 14-bit wheel, 14 buttons, hat, throttle (Y) and brake
/// (Rz).
const DFP_RDESC_FIXED: &[u8] = &[
    0x05, 0x01, //       Usage Page (Desktop)
    0x09, 0x04, //       Usage (Joystick)
    0xa1, 0x01, //       Collection (Application)
    0xa1, 0x02, //         Collection (Logical)
    0x95, 0x01, //           Report Count (1)
    0x75, 0x0e, //           Report Size (14)
    0x14, //                 Logical Minimum (0)
    0x26, 0xff, 0x3f, //     Logical Maximum (16383)
    0x34, //                 Physical Minimum (0)
    0x46, 0xff, 0x3f, //     Physical Maximum (16383)
    0x09, 0x30, //           Usage (X)
    0x81, 0x02, //           Input (Variable)
    0x95, 0x0e, //           Report Count (14)
    0x75, 0x01, //           Report Size (1)
    0x25, 0x01, //           Logical Maximum (1)
    0x45, 0x01, //           Physical Maximum (1)
    0x05, 0x09, //           Usage Page (Button)
    0x19, 0x01, //           Usage Minimum (01h)
    0x29, 0x0e, //           Usage Maximum (0Eh)
    0x81, 0x02, //           Input (Variable)
    0x05, 0x01, //           Usage Page (Desktop)
    0x95, 0x01, //           Report Count (1)
    0x75, 0x04, //           Report Size (4)
    0x25, 0x07, //           Logical Maximum (7)
    0x46, 0x3b, 0x01, //     Physical Maximum (315)
    0x65, 0x14, //           Unit (Degrees)
    0x09, 0x39, //           Usage (Hat Switch)
    0x81, 0x42, //           Input (Variable, Null State)
    0x65, 0x00, //           Unit
    0x26, 0xff, 0x00, //     Logical Maximum (255)
    0x46, 0xff, 0x00, //     Physical Maximum (255)
    0x75, 0x08, //           Report Size (8)
    0x81, 0x01, //           Input (Constant)
    0x09, 0x31, //           Usage (Y)
    0x81, 0x02, //           Input (Variable)
    0x09, 0x35, //           Usage (Rz)
    0x81, 0x02, //           Input (Variable)
    0x81, 0x01, //           Input (Constant)
    0xc0, //               End Collection
    0xa1, 0x02, //         Collection (Logical)
    0x09, 0x02, //           Usage (02h)
    0x95, 0x07, //           Report Count (7)
    0x91, 0x02, //           Output (Variable)
    0xc0, //               End Collection
    0xc0, //             End Collection
];

/// MOMO Force: 10-bit wheel, 8 buttons, throttle (Y) and brake (Z).
const MOMO_RDESC_FIXED: &[u8] = &[
    0x05, 0x01, //       Usage Page (Desktop)
    0x09, 0x04, //       Usage (Joystick)
    0xa1, 0x01, //       Collection (Application)
    0xa1, 0x02, //         Collection (Logical)
    0x95, 0x01, //           Report Count (1)
    0x75, 0x0a, //           Report Size (10)
    0x15, 0x00, //           Logical Minimum (0)
    0x26, 0xff, 0x03, //     Logical Maximum (1023)
    0x35, 0x00, //           Physical Minimum (0)
    0x46, 0xff, 0x03, //     Physical Maximum (1023)
    0x09, 0x30, //           Usage (X)
    0x81, 0x02, //           Input (Variable)
    0x95, 0x08, //           Report Count (8)
    0x75, 0x01, //           Report Size (1)
    0x25, 0x01, //           Logical Maximum (1)
    0x45, 0x01, //           Physical Maximum (1)
    0x05, 0x09, //           Usage Page (Button)
    0x19, 0x01, //           Usage Minimum (01h)
    0x29, 0x08, //           Usage Maximum (08h)
    0x81, 0x02, //           Input (Variable)
    0x06, 0x00, 0xff, //     Usage Page (Vendor)
    0x75, 0x0e, //           Report Size (14)
    0x95, 0x01, //           Report Count (1)
    0x26, 0xff, 0x00, //     Logical Maximum (255)
    0x46, 0xff, 0x00, //     Physical Maximum (255)
    0x09, 0x00, //           Usage (00h)
    0x81, 0x02, //           Input (Variable)
    0x05, 0x01, //           Usage Page (Desktop)
    0x75, 0x08, //           Report Size (8)
    0x09, 0x31, //           Usage (Y)
    0x81, 0x02, //           Input (Variable)
    0x09, 0x32, //           Usage (Z)
    0x81, 0x02, //           Input (Variable)
    0x06, 0x00, 0xff, //     Usage Page (Vendor)
    0x09, 0x01, //           Usage (01h)
    0x81, 0x02, //           Input (Variable)
    0xc0, //               End Collection
    0xa1, 0x02, //         Collection (Logical)
    0x09, 0x02, //           Usage (02h)
    0x95, 0x07, //           Report Count (7)
    0x91, 0x02, //           Output (Variable)
    0xc0, //               End Collection
    0xc0, //             End Collection
];

/// Formula Force GP: 10-bit wheel, 6 buttons, combined pedals (Y).
const FFGP_RDESC_FIXED: &[u8] = &[
    0x05, 0x01, //       Usage Page (Desktop)
    0x09, 0x04, //       Usage (Joystick)
    0xa1, 0x01, //       Collection (Application)
    0xa1, 0x02, //         Collection (Logical)
    0x95, 0x01, //           Report Count (1)
    0x75, 0x0a, //           Report Size (10)
    0x15, 0x00, //           Logical Minimum (0)
    0x26, 0xff, 0x03, //     Logical Maximum (1023)
    0x35, 0x00, //           Physical Minimum (0)
    0x46, 0xff, 0x03, //     Physical Maximum (1023)
    0x09, 0x30, //           Usage (X)
    0x81, 0x02, //           Input (Variable)
    0x95, 0x06, //           Report Count (6)
    0x75, 0x01, //           Report Size (1)
    0x25, 0x01, //           Logical Maximum (1)
    0x45, 0x01, //           Physical Maximum (1)
    0x05, 0x09, //           Usage Page (Button)
    0x19, 0x01, //           Usage Minimum (01h)
    0x29, 0x06, //           Usage Maximum (06h)
    0x81, 0x02, //           Input (Variable)
    0x95, 0x01, //           Report Count (1)
    0x75, 0x08, //           Report Size (8)
    0x26, 0xff, 0x00, //     Logical Maximum (255)
    0x46, 0xff, 0x00, //     Physical Maximum (255)
    0x09, 0x01, //           Usage (01h)
    0x81, 0x02, //           Input (Variable)
    0x05, 0x01, //           Usage Page (Desktop)
    0x09, 0x31, //           Usage (Y)
    0x81, 0x02, //           Input (Variable)
    0x09, 0x01, //           Usage (01h)
    0x95, 0x03, //           Report Count (3)
    0x81, 0x02, //           Input (Variable)
    0xc0, //               End Collection
    0xa1, 0x02, //         Collection (Logical)
    0x09, 0x02, //           Usage (02h)
    0x95, 0x07, //           Report Count (7)
    0x91, 0x02, //           Output (Variable)
    0xc0, //               End Collection
    0xc0, //             End Collection
];

/// MOMO Racing: 10-bit wheel, 10 buttons, throttle (Y) and brake (Z).
const MOMO2_RDESC_FIXED: &[u8] = &[
    0x05, 0x01, //       Usage Page (Desktop)
    0x09, 0x04, //       Usage (Joystick)
    0xa1, 0x01, //       Collection (Application)
    0xa1, 0x02, //         Collection (Logical)
    0x95, 0x01, //           Report Count (1)
    0x75, 0x0a, //           Report Size (10)
    0x15, 0x00, //           Logical Minimum (0)
    0x26, 0xff, 0x03, //     Logical Maximum (1023)
    0x35, 0x00, //           Physical Minimum (0)
    0x46, 0xff, 0x03, //     Physical Maximum (1023)
    0x09, 0x30, //           Usage (X)
    0x81, 0x02, //           Input (Variable)
    0x95, 0x0a, //           Report Count (10)
    0x75, 0x01, //           Report Size (1)
    0x25, 0x01, //           Logical Maximum (1)
    0x45, 0x01, //           Physical Maximum (1)
    0x05, 0x09, //           Usage Page (Button)
    0x19, 0x01, //           Usage Minimum (01h)
    0x29, 0x0a, //           Usage Maximum (0Ah)
    0x81, 0x02, //           Input (Variable)
    0x06, 0x00, 0xff, //     Usage Page (Vendor)
    0x09, 0x00, //           Usage (00h)
    0x95, 0x04, //           Report Count (4)
    0x81, 0x02, //           Input (Variable)
    0x95, 0x01, //           Report Count (1)
    0x75, 0x08, //           Report Size (8)
    0x26, 0xff, 0x00, //     Logical Maximum (255)
    0x46, 0xff, 0x00, //     Physical Maximum (255)
    0x09, 0x01, //           Usage (01h)
    0x81, 0x02, //           Input (Variable)
    0x05, 0x01, //           Usage Page (Desktop)
    0x09, 0x31, //           Usage (Y)
    0x81, 0x02, //           Input (Variable)
    0x09, 0x32, //           Usage (Z)
    0x81, 0x02, //           Input (Variable)
    0x06, 0x00, 0xff, //     Usage Page (Vendor)
    0x09, 0x00, //           Usage (00h)
    0x81, 0x02, //           Input (Variable)
    0xc0, //               End Collection
    0xa1, 0x02, //         Collection (Logical)
    0x09, 0x02, //           Usage (02h)
    0x95, 0x07, //           Report Count (7)
    0x91, 0x02, //           Output (Variable)
    0xc0, //               End Collection
    0xc0, //             End Collection
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::HapticCaps;
    use crate::hid::driver::{OutputQueue, VirtualHid};
    use crate::hid::transport::MemoryTransport;
    use crate::hid::HidInput;
    use crate::metadata::DeviceMeta;
    use crate::poll::{CompletionQueue, LocalReactor, Poller};
    use crate::source::{HapticSink, JoystickRegistrar};
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct NoJoysticks;

    impl JoystickRegistrar for NoJoysticks {
        fn register_joystick(
            &mut self,
            _: &str,
            _: HapticCaps,
            _: Option<Box<dyn HapticSink>>,
        ) -> Result<usize> {
            Err(Error::NoJoystickSource)
        }
    }

    #[derive(Default)]
    struct RecordingUhid {
        created: Vec<(String, Option<Vec<u8>>)>,
        inputs: Vec<Vec<u8>>,
        destroyed: Vec<usize>,
    }

    impl VirtualHid for RecordingUhid {
        fn create(
            &mut self,
            name: &str,
            _meta: &DeviceMeta,
            descriptor: Option<&[u8]>,
        ) -> Result<usize> {
            self.created
                .push((name.to_owned(), descriptor.map(<[u8]>::to_vec)));
            Ok(self.created.len() - 1)
        }

        fn input(&mut self, _id: usize, report: &[u8]) -> Result<()> {
            self.inputs.push(report.to_vec());
            Ok(())
        }

        fn destroy(&mut self, id: usize) {
            self.destroyed.push(id);
        }
    }

    fn wheel(model: WheelModel, release: u16, path: &str) -> DeviceMeta {
        let mut meta = DeviceMeta::new(LOGITECH_VID, model.pid(), path);
        meta.release = release;
        meta
    }

    fn quick() -> NativeModeConfig {
        NativeModeConfig {
            retries: 2,
            backoff_ms: 0,
        }
    }

    fn mirrored(
        metas: Vec<DeviceMeta>,
    ) -> (HidInput, LocalReactor, Rc<RefCell<RecordingUhid>>) {
        let mut reactor = LocalReactor::new();
        let mut transport = MemoryTransport::new(reactor.completions());
        for meta in metas {
            transport.add_device(meta);
        }
        let uhid = Rc::new(RefCell::new(RecordingUhid::default()));
        let mut hid = HidInput::new()
            .with_transport(transport)
            .with_driver(LogitechWheelDriver::new().with_virtual_hid(uhid.clone()));
        hid.set_native_mode(quick());
        hid.init(&mut reactor, &mut NoJoysticks).unwrap();
        (hid, reactor, uhid)
    }

    #[test]
    fn native_target_depends_on_product_and_release() {
        use WheelModel::*;
        assert_eq!(DrivingForce.native_target(0x1350), Some(G29));
        assert_eq!(DrivingForcePro.native_target(0x8900), Some(G29));
        assert_eq!(G27.native_target(0x1352), Some(G29));
        assert_eq!(DrivingForce.native_target(0x1338), Some(DrivingForceGt));
        assert_eq!(DrivingForcePro.native_target(0x1230), Some(G27));
        assert_eq!(G25.native_target(0x1230), Some(G27));
        assert_eq!(DrivingForce.native_target(0x1210), Some(G25));
        assert_eq!(G25.native_target(0x1210), None);
        assert_eq!(DrivingForce.native_target(0x1106), Some(DrivingForcePro));
        assert_eq!(DrivingForcePro.native_target(0x1106), None);
        assert_eq!(Momo.native_target(0x1350), None);
        assert_eq!(DrivingForce.native_target(0x0100), None);
    }

    #[test]
    fn native_commands_are_single_reports() {
        assert_eq!(
            WheelModel::G29.native_mode_command(),
            Some(vec![0x00, 0xf8, 0x09, 0x05, 0x01, 0x01, 0x00])
        );
        assert_eq!(
            WheelModel::G27.native_mode_command(),
            Some(vec![0x00, 0xf8, 0x09, 0x04, 0x01, 0x00, 0x00])
        );
        assert_eq!(
            WheelModel::G25.native_mode_command(),
            Some(vec![0x00, 0xf8, 0x10, 0x00, 0x00, 0x00, 0x00])
        );
        assert_eq!(WheelModel::Momo.native_mode_command(), None);
    }

    #[test]
    fn claims_the_wheel_family_but_not_the_g29() {
        let driver = LogitechWheelDriver::new();
        assert_eq!(driver.ids().len(), 9);
        assert!(driver.accepts(&wheel(WheelModel::Momo2, 0, "a")));
        assert!(driver.accepts(&wheel(WheelModel::FormulaForceGp, 0, "b")));
        assert!(!driver.accepts(&wheel(WheelModel::G29, 0, "c")));
    }

    #[test]
    fn wheel_times_out_when_it_never_switches() {
        let mut transport = MemoryTransport::new(CompletionQueue::new());
        let dev = transport.add_device(wheel(WheelModel::DrivingForce, 0x1230, "mem:wheel"));
        let mut handle = transport.open(&dev.meta()).unwrap();
        let mut ctx = OpenCtx {
            registrar: &mut NoJoysticks,
            transport: &mut transport,
            output: OutputQueue::new(),
            native_mode: quick(),
        };
        let result = LogitechWheelDriver::new().open(handle.as_mut(), &mut ctx);
        assert!(matches!(
            result,
            Err(Error::NativeModeTimeout { product_id: 0xc29b })
        ));
        assert_eq!(dev.written().len(), 1);
    }

    #[test]
    fn native_wheel_at_another_path_does_not_count() {
        let mut transport = MemoryTransport::new(CompletionQueue::new());
        let dev = transport.add_device(wheel(WheelModel::DrivingForce, 0x1230, "mem:wheel"));
        transport.add_device(wheel(WheelModel::G27, 0x1230, "mem:other"));
        let mut handle = transport.open(&dev.meta()).unwrap();
        let mut ctx = OpenCtx {
            registrar: &mut NoJoysticks,
            transport: &mut transport,
            output: OutputQueue::new(),
            native_mode: quick(),
        };
        let result = LogitechWheelDriver::new().open(handle.as_mut(), &mut ctx);
        assert!(matches!(
            result,
            Err(Error::NativeModeTimeout { product_id: 0xc29b })
        ));
    }

    #[test]
    fn emulating_wheel_is_switched_then_mirrored() {
        let mut reactor = LocalReactor::new();
        let mut transport = MemoryTransport::new(reactor.completions());
        let dev = transport.add_device(wheel(WheelModel::DrivingForce, 0x1230, "mem:wheel"));
        dev.switch_on_write(WheelModel::G27.pid());

        let uhid = Rc::new(RefCell::new(RecordingUhid::default()));
        let driver = LogitechWheelDriver::new().with_virtual_hid(uhid.clone());
        let mut hid = HidInput::new().with_transport(transport).with_driver(driver);
        hid.set_native_mode(quick());
        hid.init(&mut reactor, &mut NoJoysticks).unwrap();

        assert_eq!(
            dev.written(),
            vec![vec![0x00, 0xf8, 0x09, 0x04, 0x01, 0x00, 0x00]]
        );
        assert_eq!(hid.open_count(), 1);
        assert_eq!(
            uhid.borrow().created,
            vec![("Logitech G27 Racing Wheel".to_owned(), None)]
        );

        dev.push_report(&[0x08, 0x00, 0x80]);
        hid.poll().unwrap();
        let mut out = Vec::new();
        for c in reactor.take_completions() {
            hid.handle_completion(c, &mut reactor, &mut out).unwrap();
        }
        assert!(out.is_empty());
        assert_eq!(uhid.borrow().inputs, vec![vec![0x08, 0x00, 0x80]]);

        hid.quit(&mut reactor);
        assert_eq!(uhid.borrow().destroyed, vec![0]);
    }

    #[test]
    fn g29_is_switched_and_left_to_the_os() {
        let mut reactor = LocalReactor::new();
        let mut transport = MemoryTransport::new(reactor.completions());
        let dev = transport.add_device(wheel(WheelModel::DrivingForce, 0x1350, "mem:wheel"));
        dev.switch_on_write(WheelModel::G29.pid());
        let uhid = Rc::new(RefCell::new(RecordingUhid::default()));
        let mut hid = HidInput::new()
            .with_transport(transport)
            .with_driver(LogitechWheelDriver::new().with_virtual_hid(uhid.clone()));
        hid.set_native_mode(quick());
        hid.init(&mut reactor, &mut NoJoysticks).unwrap();

        assert_eq!(dev.written().len(), 1);
        assert_eq!(dev.meta().pid, 0xc24f);
        assert_eq!(hid.open_count(), 0);
        assert!(uhid.borrow().created.is_empty());
    }

    #[test]
    fn pass_through_wheels_get_their_fixed_descriptor() {
        let (hid, _reactor, uhid) = mirrored(vec![
            wheel(WheelModel::DrivingForce, 0x0100, "mem:df"),
            wheel(WheelModel::DrivingForcePro, 0x1106, "mem:dfp"),
            wheel(WheelModel::Momo, 0x0000, "mem:momo"),
            wheel(WheelModel::G25, 0x1210, "mem:g25"),
        ]);
        assert_eq!(hid.open_count(), 4);
        let created = &uhid.borrow().created;
        let descriptor = |name: &str| {
            created
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, d)| d.clone())
        };
        assert_eq!(
            descriptor("Logitech Driving Force"),
            Some(Some(DF_RDESC_FIXED.to_vec()))
        );
        assert_eq!(
            descriptor("Logitech Driving Force Pro"),
            Some(Some(DFP_RDESC_FIXED.to_vec()))
        );
        assert_eq!(
            descriptor("Logitech MOMO Force"),
            Some(Some(MOMO_RDESC_FIXED.to_vec()))
        );
        assert_eq!(descriptor("Logitech G25 Racing Wheel"), Some(None));
    }

    #[test]
    fn descriptors_close_every_collection() {
        for model in WheelModel::SUPPORTED {
            if let Some(rdesc) = model.fixed_descriptor() {
                let opened = rdesc.iter().filter(|&&b| b == 0xa1).count();
                assert_eq!(rdesc.last(), Some(&0xc0), "{model:?}");
                assert_eq!(opened, 3, "{model:?}");
            }
        }
    }

    #[test]
    fn wheel_without_virtual_hid_is_left_alone() {
        let mut reactor = LocalReactor::new();
        let mut transport = MemoryTransport::new(reactor.completions());
        let dev = transport.add_device(wheel(WheelModel::G27, 0x1230, "mem:g27"));
        let mut hid = HidInput::new()
            .with_transport(transport)
            .with_driver(LogitechWheelDriver::new());
        hid.init(&mut reactor, &mut NoJoysticks).unwrap();
        assert_eq!(hid.open_count(), 0);
        assert!(!dev.is_open());
        assert!(dev.written().is_empty());
    }

    proptest! {
        #[test]
        fn only_emulating_products_are_switched(release in any::<u16>()) {
            for model in [
                WheelModel::FormulaForce,
                WheelModel::FormulaForceGp,
                WheelModel::Momo,
                WheelModel::Momo2,
                WheelModel::G29,
            ] {
                prop_assert_eq!(model.native_target(release), None);
            }
            for model in WheelModel::SUPPORTED {
                if let Some(target) = model.native_target(release) {
                    prop_assert_ne!(target, model);
                    prop_assert!(target.native_mode_command().is_some());
                }
            }
        }
    }
}
