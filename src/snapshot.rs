//! Per-frame snapshots of slot state.
//!
//! [`SlotSnapshot`] is an **owned** copy of one slot's frame view. It is
//! produced by [`DeviceHub::snapshot`](crate::hub::DeviceHub::snapshot) and does
//! not change when more input arrives; read again (after a clear) for newer
//! data.
//!
//! [`HubSnapshot`] holds every slot at once, which is handy for debug overlays
//! and for serializing the input state of a frame.
//!
//! # Example
//! ```
//! use multimouse::{DeviceHub, HubSettings};
//!
//! let hub = DeviceHub::new(HubSettings::default());
//! for snap in hub.snapshot_all().iter() {
//!     if snap.is_bound() {
//!         println!("player {} moved {:?}", snap.slot, snap.input.delta);
//!     }
//! }
//! ```

use crate::event::{DeviceHandle, DeviceKind};
use crate::slot::{ButtonEdges, SlotInput, Vec2};
use serde::{Deserialize, Serialize};

/// Owned copy of one slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotSnapshot {
    /// Slot (player) index.
    pub slot: usize,
    /// Bound device, `None` when unbound.
    pub device: Option<DeviceHandle>,
    /// Accumulated input for the current read window.
    pub input: SlotInput,
}

impl SlotSnapshot {
    /// Zeroed snapshot for `slot`, used when a read fails.
    pub fn empty(slot: usize) -> Self {
        Self {
            slot,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.device.is_some()
    }

    #[inline]
    pub fn device_kind(&self) -> Option<DeviceKind> {
        self.device.map(|d| d.kind)
    }

    #[inline]
    pub fn delta(&self) -> Vec2 {
        self.input.delta
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.input.position
    }

    #[inline]
    pub fn primary(&self) -> ButtonEdges {
        self.input.primary
    }
}

/// Owned snapshot of every slot, indexed by slot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HubSnapshot(pub Vec<SlotSnapshot>);

impl HubSnapshot {
    #[inline]
    pub fn get(&self, slot: usize) -> Option<&SlotSnapshot> {
        self.0.get(slot)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &SlotSnapshot> {
        self.0.iter()
    }

    /// Number of slots currently bound.
    pub fn bound_count(&self) -> usize {
        self.0.iter().filter(|s| s.is_bound()).count()
    }

    #[inline]
    pub fn into_inner(self) -> Vec<SlotSnapshot> {
        self.0
    }
}
