//! multimouse: several mice and gamepads, one cursor each.
//!
//! Two independent pieces:
//! - [`DeviceHub`]: routes events from many physical pointing devices into a
//!   fixed pool of player slots, pairing a device with a slot on its first
//!   primary press, and hands the simulation a frame-coherent view of each
//!   slot.
//! - [`SignalBus`]: 128 analog channels with edge-triggered listeners, the
//!   wiring that connects levers, plates, gates and doors in a level.
//!
//! [`Session`] ties them together for a cursor-driven game: possession of
//! host avatars and interaction with levers through a [`CapabilityTable`].

pub mod backends;
pub mod components;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod gate;
pub mod hub;
pub mod interaction;
pub mod logger;
pub mod session;
pub mod signal;
pub mod slot;
pub mod snapshot;

pub use components::{Door, Lever, PressurePlate, Relay};
pub use config::{BackendSettings, Config, SessionSettings};
pub use device::{Device, InputBackend};
pub use error::{BackendError, ConfigError, HubError, SignalError};
pub use event::{ButtonId, DeviceEvent, DeviceEventKind, DeviceHandle, DeviceKind, PRIMARY_BUTTON};
pub use gate::{Gate, GateKind, GateSpec};
pub use hub::{DeviceHub, HubIngest, HubSettings, ObserverId, SlotNotice};
pub use interaction::{
    pick_target, Candidate, Capability, CapabilityTable, ClickOutcome, Interact, ObjectHandle,
    SpatialQuery,
};
pub use logger::SignalLogger;
pub use session::{Cursor, Session, TickReport};
pub use signal::{ChannelId, ListenerId, SignalBus, SignalListener, SignalSettings, CHANNEL_COUNT, THRESHOLD};
pub use slot::{ButtonEdges, SlotInput, Vec2};
pub use snapshot::{HubSnapshot, SlotSnapshot};
