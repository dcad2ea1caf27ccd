#![cfg(target_os = "windows")]

//! Windows input backends.
//!
//! - **Raw Input** mice through a message-only window ([`message_window`]).
//! - **XInput** pads polled per user slot ([`xinput_devices`]).
//!
//! Both feed the hub through [`start_configured`](crate::backends::start_configured);
//! most callers never touch these modules directly.

#[cfg(feature = "rawinput")]
#[cfg_attr(docsrs, doc(cfg(feature = "rawinput")))]
pub mod message_window;

#[cfg(feature = "xinput")]
#[cfg_attr(docsrs, doc(cfg(feature = "xinput")))]
pub mod xinput_devices;

#[cfg(feature = "rawinput")]
pub use message_window::RawInputBackend;
#[cfg(feature = "xinput")]
pub use xinput_devices::{probe_pads, XInputPad};
