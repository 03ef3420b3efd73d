//! `WM_INPUT` parsing and raw input device calls.
//!
//! Parsing only extracts keyboard and mouse packets; device registration and
//! event translation live in [`RawInputMkb`](super::RawInputMkb).

use crate::backends::scancode::{KeyPacket, MousePacket, RI_MOUSE_HWHEEL, RI_MOUSE_WHEEL};
use core::ffi::c_void;
use std::io;
use windows_sys::Win32::Foundation::{HANDLE, HWND};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{MapVirtualKeyW, MAPVK_VK_TO_VSC_EX};
use windows_sys::Win32::UI::Input::*;

// Local constants; module exports vary between windows-sys versions.
const RI_KEY_BREAK: u16 = 0x0001;
const RI_KEY_E0: u16 = 0x0002;
const RI_KEY_E1: u16 = 0x0004;

const RIDEV_NOLEGACY: u32 = 0x0000_0030;
const RIDEV_CAPTUREMOUSE: u32 = 0x0000_0200;

const USAGE_PAGE_GENERIC: u16 = 0x01;
const USAGE_MOUSE: u16 = 0x02;
const USAGE_KEYBOARD: u16 = 0x06;

#[derive(Clone, Copy, Debug)]
pub(crate) enum RawPacket {
    Keyboard(HANDLE, KeyPacket),
    Mouse(HANDLE, MousePacket),
}

fn vkey_to_scancode(vkey: u16) -> Option<(u16, bool)> {
    // SAFETY: MapVirtualKeyW has no pointer arguments.
    let sc = unsafe { MapVirtualKeyW(vkey as u32, MAPVK_VK_TO_VSC_EX) };
    if sc == 0 {
        return None;
    }
    // MAPVK_VK_TO_VSC_EX reports extended keys as 0xE0xx.
    if (sc & 0xFF00) == 0xE000 {
        Some(((sc & 0x00FF) as u16, true))
    } else {
        Some((sc as u16, false))
    }
}

/// Copies the `RID_INPUT` payload behind a `WM_INPUT` lparam.
pub(crate) fn read_wm_input(lparam: isize) -> Option<Vec<u8>> {
    let header = core::mem::size_of::<RAWINPUTHEADER>() as u32;
    let mut size: u32 = 0;
    // SAFETY: a null buffer only queries the size.
    let r0 = unsafe {
        GetRawInputData(
            lparam as _,
            RID_INPUT,
            core::ptr::null_mut(),
            &mut size,
            header,
        )
    };
    if r0 == u32::MAX || size == 0 {
        return None;
    }

    let mut buf = vec![0u8; size as usize];
    // SAFETY: `buf` holds `size` bytes, as reported above.
    let r1 = unsafe {
        GetRawInputData(
            lparam as _,
            RID_INPUT,
            buf.as_mut_ptr() as *mut c_void,
            &mut size,
            header,
        )
    };
    if r1 == u32::MAX {
        return None;
    }
    Some(buf)
}

/// Parses a copied `RID_INPUT` payload.
pub(crate) fn parse_raw_input(buf: &[u8]) -> Option<RawPacket> {
    let hdr_sz = core::mem::size_of::<RAWINPUTHEADER>();
    if buf.len() < hdr_sz {
        return None;
    }

    // SAFETY: every read is bounds-checked against `buf` first and done
    // unaligned.
    unsafe {
        let hdr: RAWINPUTHEADER = core::ptr::read_unaligned(buf.as_ptr() as *const RAWINPUTHEADER);
        let data_ptr = buf.as_ptr().add(hdr_sz);

        match hdr.dwType {
            RIM_TYPEKEYBOARD => {
                if buf.len() < hdr_sz + core::mem::size_of::<RAWKEYBOARD>() {
                    return None;
                }
                let kbd: RAWKEYBOARD = core::ptr::read_unaligned(data_ptr as *const RAWKEYBOARD);
                let flags = kbd.Flags;
                let (scancode, mapped_ext) = if kbd.MakeCode != 0 {
                    (kbd.MakeCode, false)
                } else {
                    vkey_to_scancode(kbd.VKey)?
                };
                Some(RawPacket::Keyboard(
                    hdr.hDevice,
                    KeyPacket {
                        scancode,
                        extended: mapped_ext || flags & (RI_KEY_E0 | RI_KEY_E1) != 0,
                        released: flags & RI_KEY_BREAK != 0,
                    },
                ))
            }
            RIM_TYPEMOUSE => {
                if buf.len() < hdr_sz + core::mem::size_of::<RAWMOUSE>() {
                    return None;
                }
                let m: RAWMOUSE = core::ptr::read_unaligned(data_ptr as *const RAWMOUSE);
                let button_flags = m.Anonymous.Anonymous.usButtonFlags;
                let data = m.Anonymous.Anonymous.usButtonData as i16;
                Some(RawPacket::Mouse(
                    hdr.hDevice,
                    MousePacket {
                        dx: m.lLastX,
                        dy: m.lLastY,
                        button_flags,
                        wheel: if button_flags & RI_MOUSE_WHEEL != 0 { data } else { 0 },
                        hwheel: if button_flags & RI_MOUSE_HWHEEL != 0 { data } else { 0 },
                    },
                ))
            }
            _ => None,
        }
    }
}

/// Interface path of a raw input device (`RIDI_DEVICENAME`).
pub(crate) fn device_name(hdev: HANDLE) -> Option<String> {
    let mut size: u32 = 0;
    // SAFETY: a null buffer only queries the size in WCHARs.
    let r0 = unsafe { GetRawInputDeviceInfoW(hdev, RIDI_DEVICENAME, core::ptr::null_mut(), &mut size) };
    if r0 == u32::MAX || size == 0 {
        return None;
    }

    let mut wide: Vec<u16> = vec![0u16; size as usize];
    // SAFETY: `wide` holds `size` WCHARs.
    let r1 = unsafe {
        GetRawInputDeviceInfoW(
            hdev,
            RIDI_DEVICENAME,
            wide.as_mut_ptr() as *mut c_void,
            &mut size,
        )
    };
    if r1 == u32::MAX {
        return None;
    }
    while wide.last() == Some(&0) {
        wide.pop();
    }
    Some(String::from_utf16_lossy(&wide))
}

/// Attached keyboards and mice, in the order the OS lists them.
pub(crate) fn list_devices() -> io::Result<Vec<(HANDLE, u32)>> {
    let entry = core::mem::size_of::<RAWINPUTDEVICELIST>() as u32;
    let mut count: u32 = 0;
    // SAFETY: a null list only queries the count.
    if unsafe { GetRawInputDeviceList(core::ptr::null_mut(), &mut count, entry) } == u32::MAX {
        return Err(io::Error::last_os_error());
    }

    let mut list: Vec<RAWINPUTDEVICELIST> = Vec::with_capacity(count as usize);
    // SAFETY: capacity for `count` entries; the length is set from the result.
    let got = unsafe { GetRawInputDeviceList(list.as_mut_ptr(), &mut count, entry) };
    if got == u32::MAX {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: the call wrote `got` entries.
    unsafe { list.set_len(got as usize) };

    Ok(list
        .into_iter()
        .filter(|d| d.dwType == RIM_TYPEKEYBOARD || d.dwType == RIM_TYPEMOUSE)
        .map(|d| (d.hDevice, d.dwType))
        .collect())
}

/// Registers keyboard and mouse input for `hwnd`, capturing both when
/// `grab` is set.
pub(crate) fn register(hwnd: HWND, grab: bool) -> io::Result<()> {
    let (kbd_flags, mouse_flags) = if grab {
        (RIDEV_NOLEGACY, RIDEV_NOLEGACY | RIDEV_CAPTUREMOUSE)
    } else {
        (0, 0)
    };
    let devices = [
        RAWINPUTDEVICE {
            usUsagePage: USAGE_PAGE_GENERIC,
            usUsage: USAGE_KEYBOARD,
            dwFlags: kbd_flags,
            hwndTarget: hwnd,
        },
        RAWINPUTDEVICE {
            usUsagePage: USAGE_PAGE_GENERIC,
            usUsage: USAGE_MOUSE,
            dwFlags: mouse_flags,
            hwndTarget: hwnd,
        },
    ];
    // SAFETY: `devices` outlives the call and the size matches the element type.
    let ok = unsafe {
        RegisterRawInputDevices(
            devices.as_ptr(),
            devices.len() as u32,
            core::mem::size_of::<RAWINPUTDEVICE>() as u32,
        )
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
