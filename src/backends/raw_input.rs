//! Raw Input mouse packet decoder.
//!
//! This module is intentionally "dumb": it copies fixed-layout `RAWINPUT`
//! records out of a byte buffer into small typed structs and turns them into
//! [`DeviceEvent`]s. It reads every field with explicit bounds checks and
//! little-endian conversions, so it has no `unsafe`, no pointers, and builds
//! on every platform (tests run anywhere). The Windows window procedure hands
//! it the bytes it got from `GetRawInputData` / `GetRawInputBuffer`.
//!
//! ## Layout
//! `RAWINPUTHEADER` is `dwType: u32, dwSize: u32, hDevice: HANDLE, wParam: WPARAM`,
//! i.e. 24 bytes with 64-bit handles and 16 bytes with 32-bit ones. A 32-bit
//! process on a 64-bit kernel (WoW64) receives 64-bit headers from
//! `GetRawInputBuffer`, so it must decode those with [`HeaderLayout::Wide`].
//!
//! `RAWMOUSE` follows the header (24 bytes):
//!
//! | offset | field |
//! |---|---|
//! | 0  | `usFlags: u16` (+2 padding) |
//! | 4  | `usButtonFlags: u16` |
//! | 6  | `usButtonData: u16` |
//! | 8  | `ulRawButtons: u32` |
//! | 12 | `lLastX: i32` |
//! | 16 | `lLastY: i32` |
//! | 20 | `ulExtraInformation: u32` |

use crate::event::{DeviceEvent, DeviceHandle};
use smallvec::SmallVec;

pub const RIM_TYPEMOUSE: u32 = 0;
pub const RIM_TYPEKEYBOARD: u32 = 1;

pub const MOUSE_MOVE_ABSOLUTE: u16 = 0x0001;

pub const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
pub const HID_USAGE_GENERIC_MOUSE: u16 = 0x02;

pub const RI_MOUSE_LEFT_BUTTON_DOWN: u16 = 0x0001;
pub const RI_MOUSE_LEFT_BUTTON_UP: u16 = 0x0002;
pub const RI_MOUSE_RIGHT_BUTTON_DOWN: u16 = 0x0004;
pub const RI_MOUSE_RIGHT_BUTTON_UP: u16 = 0x0008;
pub const RI_MOUSE_MIDDLE_BUTTON_DOWN: u16 = 0x0010;
pub const RI_MOUSE_MIDDLE_BUTTON_UP: u16 = 0x0020;

const RAWMOUSE_SIZE: usize = 24;

/// Button flag pairs → hub button ids. Left is the primary action.
const BUTTON_MAP: &[(u16, u16, u16)] = &[
    (RI_MOUSE_LEFT_BUTTON_DOWN, RI_MOUSE_LEFT_BUTTON_UP, 0),
    (RI_MOUSE_RIGHT_BUTTON_DOWN, RI_MOUSE_RIGHT_BUTTON_UP, 1),
    (RI_MOUSE_MIDDLE_BUTTON_DOWN, RI_MOUSE_MIDDLE_BUTTON_UP, 2),
];

/// Width of handle-sized header fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderLayout {
    /// 64-bit handles: 24-byte header.
    Wide,
    /// 32-bit handles: 16-byte header.
    Narrow,
}

impl HeaderLayout {
    /// Layout of records returned by `GetRawInputData` in this process.
    pub const fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            HeaderLayout::Wide
        } else {
            HeaderLayout::Narrow
        }
    }

    /// Layout of records returned by `GetRawInputBuffer`; `is_wow64` is
    /// whether this is a 32-bit process on a 64-bit kernel.
    pub const fn buffered(is_wow64: bool) -> Self {
        if is_wow64 {
            HeaderLayout::Wide
        } else {
            Self::native()
        }
    }

    pub const fn header_size(self) -> usize {
        match self {
            HeaderLayout::Wide => 24,
            HeaderLayout::Narrow => 16,
        }
    }
}

/// Decoded `RAWMOUSE` record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawMousePacket {
    /// `hDevice` of the producing mouse.
    pub device: u64,
    /// `usFlags` (`MOUSE_MOVE_*`).
    pub flags: u16,
    /// `usButtonFlags` (`RI_MOUSE_*`).
    pub button_flags: u16,
    /// `usButtonData` (wheel delta when a wheel flag is set).
    pub button_data: u16,
    pub last_x: i32,
    pub last_y: i32,
}

impl RawMousePacket {
    pub fn is_absolute(&self) -> bool {
        self.flags & MOUSE_MOVE_ABSOLUTE != 0
    }

    pub fn handle(&self) -> DeviceHandle {
        DeviceHandle::pointer(self.device)
    }

    /// Translate into hub events: motion first, then button edges.
    pub fn events(&self) -> SmallVec<[DeviceEvent; 4]> {
        let mut out = SmallVec::new();
        let handle = self.handle();
        let (x, y) = (self.last_x as f32, self.last_y as f32);

        if self.is_absolute() {
            out.push(DeviceEvent::absolute(handle, x, y));
        } else if self.last_x != 0 || self.last_y != 0 {
            out.push(DeviceEvent::motion(handle, x, y));
        }

        for &(down, up, button) in BUTTON_MAP {
            if self.button_flags & down != 0 {
                out.push(DeviceEvent::button(handle, button, true));
            }
            if self.button_flags & up != 0 {
                out.push(DeviceEvent::button(handle, button, false));
            }
        }
        out
    }
}

#[inline]
fn read_u16(buf: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(buf.get(at..at + 2)?.try_into().ok()?))
}

#[inline]
fn read_u32(buf: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(buf.get(at..at + 4)?.try_into().ok()?))
}

#[inline]
fn read_i32(buf: &[u8], at: usize) -> Option<i32> {
    Some(i32::from_le_bytes(buf.get(at..at + 4)?.try_into().ok()?))
}

#[inline]
fn read_handle(buf: &[u8], at: usize, layout: HeaderLayout) -> Option<u64> {
    match layout {
        HeaderLayout::Wide => Some(u64::from_le_bytes(buf.get(at..at + 8)?.try_into().ok()?)),
        HeaderLayout::Narrow => read_u32(buf, at).map(u64::from),
    }
}

/// Decode one `RAWINPUT` record. Returns `None` for non-mouse records and for
/// buffers too short to hold a header plus a `RAWMOUSE`.
pub fn decode_mouse(buf: &[u8], layout: HeaderLayout) -> Option<RawMousePacket> {
    let hdr = layout.header_size();
    if buf.len() < hdr + RAWMOUSE_SIZE {
        return None;
    }
    if read_u32(buf, 0)? != RIM_TYPEMOUSE {
        return None;
    }
    let device = read_handle(buf, 8, layout)?;

    Some(RawMousePacket {
        device,
        flags: read_u16(buf, hdr)?,
        button_flags: read_u16(buf, hdr + 4)?,
        button_data: read_u16(buf, hdr + 6)?,
        last_x: read_i32(buf, hdr + 12)?,
        last_y: read_i32(buf, hdr + 16)?,
    })
}

/// Walks a `GetRawInputBuffer` batch record by record (`NEXTRAWINPUTBLOCK`:
/// advance by `dwSize` rounded up to 8 bytes).
pub struct RawInputRecords<'a> {
    buf: &'a [u8],
    offset: usize,
    remaining: usize,
}

impl<'a> RawInputRecords<'a> {
    /// `count` is the record count returned by `GetRawInputBuffer`.
    pub fn new(buf: &'a [u8], count: usize) -> Self {
        Self {
            buf,
            offset: 0,
            remaining: count,
        }
    }
}

impl<'a> Iterator for RawInputRecords<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.remaining == 0 {
            return None;
        }
        let size = read_u32(self.buf, self.offset + 4)? as usize;
        if size == 0 {
            self.remaining = 0;
            return None;
        }
        let record = self.buf.get(self.offset..self.offset + size)?;
        self.offset += (size + 7) & !7;
        self.remaining -= 1;
        Some(record)
    }
}

/// Who currently receives generic-desktop mouse input for this process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseRegistration {
    Ours,
    /// Another window holds the mouse usage (`0` means it follows focus).
    Taken(isize),
    Missing,
}

/// Classify the `(usage page, usage, target window)` entries reported by
/// `GetRegisteredRawInputDevices` against our window. Only one window per
/// process can own a usage, so a host that registers mice for its own
/// window silently takes them away from ours.
pub fn mouse_registration<I>(entries: I, ours: isize) -> MouseRegistration
where
    I: IntoIterator<Item = (u16, u16, isize)>,
{
    entries
        .into_iter()
        .find(|&(page, usage, _)| page == HID_USAGE_PAGE_GENERIC && usage == HID_USAGE_GENERIC_MOUSE)
        .map_or(MouseRegistration::Missing, |(_, _, target)| {
            if target == ours {
                MouseRegistration::Ours
            } else {
                MouseRegistration::Taken(target)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DeviceEventKind;

    fn record(layout: HeaderLayout, device: u64, flags: u16, buttons: u16, x: i32, y: i32) -> Vec<u8> {
        let hdr = layout.header_size();
        let size = hdr + RAWMOUSE_SIZE;
        let mut buf = vec![0u8; size];
        buf[0..4].copy_from_slice(&RIM_TYPEMOUSE.to_le_bytes());
        buf[4..8].copy_from_slice(&(size as u32).to_le_bytes());
        match layout {
            HeaderLayout::Wide => buf[8..16].copy_from_slice(&device.to_le_bytes()),
            HeaderLayout::Narrow => buf[8..12].copy_from_slice(&(device as u32).to_le_bytes()),
        }
        buf[hdr..hdr + 2].copy_from_slice(&flags.to_le_bytes());
        buf[hdr + 4..hdr + 6].copy_from_slice(&buttons.to_le_bytes());
        buf[hdr + 12..hdr + 16].copy_from_slice(&x.to_le_bytes());
        buf[hdr + 16..hdr + 20].copy_from_slice(&y.to_le_bytes());
        buf
    }

    #[test]
    fn decodes_relative_click() {
        let buf = record(HeaderLayout::Wide, 0xABCD, 0, RI_MOUSE_LEFT_BUTTON_DOWN, 5, -3);
        let packet = decode_mouse(&buf, HeaderLayout::Wide).expect("mouse packet");
        assert_eq!(packet.device, 0xABCD);
        assert!(!packet.is_absolute());

        let events = packet.events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].kind,
            DeviceEventKind::Motion {
                absolute: false,
                x: 5.0,
                y: -3.0
            }
        );
        assert_eq!(
            events[1].kind,
            DeviceEventKind::Button {
                button: 0,
                down: true
            }
        );
    }

    #[test]
    fn narrow_header_and_absolute_motion() {
        let buf = record(HeaderLayout::Narrow, 7, MOUSE_MOVE_ABSOLUTE, RI_MOUSE_RIGHT_BUTTON_UP, 0, 0);
        let packet = decode_mouse(&buf, HeaderLayout::Narrow).expect("mouse packet");
        assert_eq!(packet.device, 7);
        let events = packet.events();
        assert!(matches!(events[0].kind, DeviceEventKind::Motion { absolute: true, .. }));
        assert_eq!(
            events[1].kind,
            DeviceEventKind::Button {
                button: 1,
                down: false
            }
        );
    }

    #[test]
    fn rejects_short_and_non_mouse_buffers() {
        let buf = record(HeaderLayout::Wide, 1, 0, 0, 1, 1);
        assert_eq!(decode_mouse(&buf[..30], HeaderLayout::Wide), None);

        let mut keyboard = buf.clone();
        keyboard[0..4].copy_from_slice(&RIM_TYPEKEYBOARD.to_le_bytes());
        assert_eq!(decode_mouse(&keyboard, HeaderLayout::Wide), None);
    }

    #[test]
    fn walks_batched_records() {
        let mut batch = record(HeaderLayout::Wide, 1, 0, 0, 1, 0);
        batch.extend(record(HeaderLayout::Wide, 2, 0, 0, 0, 1));
        let devices: Vec<u64> = RawInputRecords::new(&batch, 2)
            .filter_map(|r| decode_mouse(r, HeaderLayout::Wide))
            .map(|p| p.device)
            .collect();
        assert_eq!(devices, vec![1, 2]);

        // A count larger than the buffer stops at the end.
        assert_eq!(RawInputRecords::new(&batch, 5).count(), 2);
    }

    #[test]
    fn mouse_registration_owner() {
        const KEYBOARD: u16 = 0x06;
        let ours = 0x1000;
        assert_eq!(
            mouse_registration([(HID_USAGE_PAGE_GENERIC, KEYBOARD, 0x2000)], ours),
            MouseRegistration::Missing
        );
        assert_eq!(
            mouse_registration(
                [
                    (HID_USAGE_PAGE_GENERIC, KEYBOARD, 0x2000),
                    (HID_USAGE_PAGE_GENERIC, HID_USAGE_GENERIC_MOUSE, ours),
                ],
                ours
            ),
            MouseRegistration::Ours
        );
        assert_eq!(
            mouse_registration([(HID_USAGE_PAGE_GENERIC, HID_USAGE_GENERIC_MOUSE, 0x2000)], ours),
            MouseRegistration::Taken(0x2000)
        );
        assert_eq!(
            mouse_registration([(HID_USAGE_PAGE_GENERIC, HID_USAGE_GENERIC_MOUSE, 0)], ours),
            MouseRegistration::Taken(0)
        );
    }
}
