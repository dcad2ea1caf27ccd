//! Windows XInput pads as polled [`Device`]s.
//!
//! Each of the four XInput user slots is one device, identified as
//! `DeviceHandle::controller(slot)`. Per poll a pad reports:
//! - `Connected` / `Disconnected` when `XInputGetState` starts or stops
//!   succeeding,
//! - the left stick, after the deadzone, as relative motion (emitted on every
//!   poll while deflected, so holding the stick keeps the cursor moving),
//! - button edges for the face/shoulder buttons. `A` is button 0, the primary
//!   action that pairs the pad with a player slot.

use crate::backends::stick_motion;
use crate::device::Device;
use crate::event::{DeviceEvent, DeviceHandle};

use tracing::debug;
use windows_sys::Win32::UI::Input::XboxController::*;

/// XInput supports four user slots.
pub const XUSER_MAX_COUNT: u32 = 4;

/// XInput button mask → hub button id.
const BUTTON_MAP: &[(u16, u16)] = &[
    (XINPUT_GAMEPAD_A, 0),
    (XINPUT_GAMEPAD_B, 1),
    (XINPUT_GAMEPAD_X, 2),
    (XINPUT_GAMEPAD_Y, 3),
    (XINPUT_GAMEPAD_LEFT_SHOULDER, 4),
    (XINPUT_GAMEPAD_RIGHT_SHOULDER, 5),
    (XINPUT_GAMEPAD_BACK, 6),
    (XINPUT_GAMEPAD_START, 7),
];

/// One XInput user slot.
pub struct XInputPad {
    index: u32,
    id: String,
    name: String,
    deadzone: f32,
    last_buttons: u16,
    connected: bool,
}

impl XInputPad {
    pub fn new(index: u32, deadzone: f32) -> Self {
        Self {
            index,
            id: format!("xinput:{index}"),
            name: format!("XInput Controller {index}"),
            deadzone,
            last_buttons: 0,
            connected: false,
        }
    }

    pub fn handle(&self) -> DeviceHandle {
        DeviceHandle::controller(u64::from(self.index))
    }

    /// Normalize a signed thumbstick axis into `[-1, 1]`.
    #[inline]
    fn normalize_thumb(v: i16) -> f32 {
        if v >= 0 {
            (v as f32) / 32767.0
        } else {
            (v as f32) / 32768.0
        }
    }
}

impl Device for XInputPad {
    fn poll(&mut self) -> Vec<DeviceEvent> {
        let mut events = Vec::new();
        let handle = self.handle();

        // SAFETY: zeroed POD out-struct; XInputGetState returns 0 on success.
        let mut state: XINPUT_STATE = unsafe { std::mem::zeroed() };
        let res = unsafe { XInputGetState(self.index, &mut state) };

        if res != 0 {
            if self.connected {
                self.connected = false;
                self.last_buttons = 0;
                debug!(slot = self.index, "xinput pad disconnected");
                events.push(DeviceEvent::disconnected(handle));
            }
            return events;
        }

        if !self.connected {
            self.connected = true;
            debug!(slot = self.index, "xinput pad connected");
            events.push(DeviceEvent::connected(handle));
        }

        let gp = state.Gamepad;

        if let Some((x, y)) = stick_motion(
            Self::normalize_thumb(gp.sThumbLX),
            Self::normalize_thumb(gp.sThumbLY),
            self.deadzone,
        ) {
            events.push(DeviceEvent::motion(handle, x, y));
        }

        let buttons = gp.wButtons;
        let changed = buttons ^ self.last_buttons;
        for &(mask, button) in BUTTON_MAP {
            if changed & mask != 0 {
                events.push(DeviceEvent::button(handle, button, buttons & mask != 0));
            }
        }
        self.last_buttons = buttons;

        events
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// One device per XInput slot; empty slots report nothing until a pad
/// appears.
pub fn probe_pads(deadzone: f32) -> Vec<Box<dyn Device>> {
    (0..XUSER_MAX_COUNT)
        .map(|i| Box::new(XInputPad::new(i, deadzone)) as Box<dyn Device>)
        .collect()
}
