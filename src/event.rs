//! Backend events and device identity.
//!
//! Backends report what physical devices do as small [`DeviceEvent`]s. The hub
//! turns them into slot state; it never sees OS structures directly.
//!
//! ## Value conventions
//! - **Pointer motion** keeps the units reported by the OS (raw counts for
//!   relative mice, device coordinates for absolute tablets/touch).
//! - **Controller motion** is a stick deflection in `[-1.0, 1.0]` reported on
//!   every poll while deflected; the hub scales it into cursor units.
//! - **Buttons** are edges (`down = true` for press, `false` for release).
//!   Button `0` is the primary action on every backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which family of backend owns a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Mouse, trackpad, tablet (Raw Input HID mouse).
    Pointer,
    /// Gamepad (XInput slot or gilrs id).
    Controller,
}

/// Opaque backend identifier of a physical device.
///
/// `raw` is whatever the backend uses (Raw Input `hDevice`, XInput slot, gilrs
/// id). The kind is part of the identity so a pad in XInput slot 0 never
/// collides with a mouse whose handle happens to be 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle {
    pub kind: DeviceKind,
    pub raw: u64,
}

impl DeviceHandle {
    pub const fn pointer(raw: u64) -> Self {
        Self {
            kind: DeviceKind::Pointer,
            raw,
        }
    }

    pub const fn controller(raw: u64) -> Self {
        Self {
            kind: DeviceKind::Controller,
            raw,
        }
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DeviceKind::Pointer => write!(f, "pointer:{:#x}", self.raw),
            DeviceKind::Controller => write!(f, "controller:{}", self.raw),
        }
    }
}

/// Backend-local button index. `0` is the primary action.
pub type ButtonId = u16;

/// Primary action button (left mouse button, pad A/South).
pub const PRIMARY_BUTTON: ButtonId = 0;

/// What happened on a device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeviceEventKind {
    /// Pointer or stick motion.
    ///
    /// `absolute = false`: `x`/`y` are a delta.
    /// `absolute = true`: `x`/`y` are a position; the hub derives the delta.
    Motion { absolute: bool, x: f32, y: f32 },

    /// A button edge.
    Button { button: ButtonId, down: bool },

    /// The OS announced a device. Informational only: pairing happens on the
    /// first primary press.
    Connected,

    /// The device is gone. Its slot (if any) is released immediately.
    Disconnected,
}

/// One event delivered by a backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceEvent {
    pub handle: DeviceHandle,
    pub kind: DeviceEventKind,
}

impl DeviceEvent {
    pub fn motion(handle: DeviceHandle, x: f32, y: f32) -> Self {
        Self {
            handle,
            kind: DeviceEventKind::Motion {
                absolute: false,
                x,
                y,
            },
        }
    }

    pub fn absolute(handle: DeviceHandle, x: f32, y: f32) -> Self {
        Self {
            handle,
            kind: DeviceEventKind::Motion {
                absolute: true,
                x,
                y,
            },
        }
    }

    pub fn button(handle: DeviceHandle, button: ButtonId, down: bool) -> Self {
        Self {
            handle,
            kind: DeviceEventKind::Button { button, down },
        }
    }

    pub fn connected(handle: DeviceHandle) -> Self {
        Self {
            handle,
            kind: DeviceEventKind::Connected,
        }
    }

    pub fn disconnected(handle: DeviceHandle) -> Self {
        Self {
            handle,
            kind: DeviceEventKind::Disconnected,
        }
    }
}
