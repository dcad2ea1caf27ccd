//! Input backends for `multimouse`.
//!
//! Every backend ends in a [`HubIngest`](crate::hub::HubIngest): it turns
//! platform input into [`DeviceEvent`](crate::event::DeviceEvent)s and pushes
//! them from its own thread.
//!
//! # Feature flags
//! - **`rawinput`** (default): Windows Raw Input mice via a message-only window.
//! - **`xinput`** (default): Windows XInput pads, polled.
//! - **`gamepad`**: cross-platform gamepads through `gilrs`.
//!
//! [`raw_input`], [`polling`] and [`virtual_input`] are portable and always
//! built: the decoder is plain byte parsing, and virtual devices drive the hub
//! in tests and demos.

use crate::config::BackendSettings;
use crate::error::BackendError;
use crate::hub::DeviceHub;
use tracing::{info, warn};

pub mod polling;
pub mod raw_input;
pub mod virtual_input;

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;

#[cfg(feature = "gamepad")]
#[cfg_attr(docsrs, doc(cfg(feature = "gamepad")))]
pub mod gamepad;

pub use polling::PollingBackend;

/// Start every backend that `settings` enables and this build supports.
///
/// A backend that is enabled but not compiled in (wrong platform or feature)
/// is skipped with a warning. A backend that fails to start is an error. If
/// backends were requested and none of them could run, the result is
/// [`BackendError::Unsupported`].
#[cfg_attr(
    not(any(target_os = "windows", feature = "gamepad")),
    allow(unused_mut, unused_variables)
)]
pub fn start_configured(hub: &mut DeviceHub, settings: &BackendSettings) -> Result<(), BackendError> {
    let mut requested = 0usize;
    let mut started = 0usize;

    if settings.rawinput {
        requested += 1;
        #[cfg(all(feature = "rawinput", target_os = "windows"))]
        {
            hub.attach(windows::message_window::RawInputBackend::new())?;
            started += 1;
        }
        #[cfg(not(all(feature = "rawinput", target_os = "windows")))]
        warn!("rawinput requested but not available in this build");
    }

    if settings.xinput {
        requested += 1;
        #[cfg(all(feature = "xinput", target_os = "windows"))]
        {
            let pads = windows::xinput_devices::probe_pads(settings.stick_deadzone);
            hub.attach(PollingBackend::new("xinput", pads, settings.poll_interval()))?;
            started += 1;
        }
        #[cfg(not(all(feature = "xinput", target_os = "windows")))]
        warn!("xinput requested but not available in this build");
    }

    if settings.gamepad {
        requested += 1;
        #[cfg(feature = "gamepad")]
        {
            hub.attach(gamepad::GamepadBackend::new(
                settings.stick_deadzone,
                settings.poll_interval(),
            ))?;
            started += 1;
        }
        #[cfg(not(feature = "gamepad"))]
        warn!("gamepad requested but the `gamepad` feature is off");
    }

    if requested > 0 && started == 0 {
        return Err(BackendError::Unsupported("no requested input backend is available"));
    }
    info!(requested, started, "input backends running");
    Ok(())
}

/// Zero out `value` inside `deadzone` and rescale the rest back to `[-1, 1]`.
///
/// A deadzone of 1 or more swallows every deflection.
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone || deadzone >= 1.0 || !value.is_finite() {
        0.0
    } else {
        let sign = if value < 0.0 { -1.0 } else { 1.0 };
        sign * (value.abs() - deadzone) / (1.0 - deadzone)
    }
}

/// Stick deflection (`y` up positive) to cursor motion (`y` down positive).
/// `None` while the stick rests inside the deadzone.
pub fn stick_motion(x: f32, y: f32, deadzone: f32) -> Option<(f32, f32)> {
    let (x, y) = (apply_deadzone(x, deadzone), apply_deadzone(y, deadzone));
    if x == 0.0 && y == 0.0 {
        None
    } else {
        Some((x, -y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadzone_rescales() {
        assert_eq!(apply_deadzone(0.1, 0.2), 0.0);
        assert_eq!(apply_deadzone(1.0, 0.2), 1.0);
        assert!((apply_deadzone(-0.6, 0.2) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn full_deadzone_never_yields_nan() {
        assert_eq!(apply_deadzone(1.0, 1.0), 0.0);
        assert_eq!(stick_motion(1.0, -1.0, 1.0), None);
        assert_eq!(stick_motion(f32::NAN, 0.0, 0.15), None);
    }

    #[test]
    fn stick_up_moves_cursor_up() {
        assert_eq!(stick_motion(0.05, -0.05, 0.15), None);
        let (x, y) = stick_motion(0.0, 1.0, 0.15).expect("deflected");
        assert_eq!(x, 0.0);
        assert_eq!(y, -1.0);
    }

    #[test]
    fn nothing_requested_is_ok() {
        let mut hub = DeviceHub::new(Default::default());
        let settings = BackendSettings {
            rawinput: false,
            xinput: false,
            gamepad: false,
            ..Default::default()
        };
        assert!(start_configured(&mut hub, &settings).is_ok());
    }
}
