//! Input source traits.
//!
//! There are two kinds of sources:
//! - [`Device`]: something you *poll* (XInput pads, virtual devices). A
//!   [`PollingBackend`](crate::backends::polling::PollingBackend) drives a set
//!   of them on a worker thread.
//! - [`InputBackend`]: something that *pushes* events from its own context
//!   (Raw Input window procedure, gilrs pump). It receives a [`HubIngest`] and
//!   calls it from whatever thread the platform uses.

use crate::error::BackendError;
use crate::event::DeviceEvent;
use crate::hub::HubIngest;

/// A polled input device.
pub trait Device: Send {
    /// Events since the previous poll.
    fn poll(&mut self) -> Vec<DeviceEvent>;
    fn name(&self) -> &str;
    fn id(&self) -> &str;
}

/// A push-style input source attached to a hub.
pub trait InputBackend: Send {
    fn name(&self) -> &'static str;

    /// Begin delivering events into `sink`.
    ///
    /// Errors are fatal for this backend: the caller should abort startup.
    fn start(&mut self, sink: HubIngest) -> Result<(), BackendError>;

    /// Stop delivering events. Must be idempotent.
    fn stop(&mut self);
}
