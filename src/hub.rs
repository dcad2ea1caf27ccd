//! Device hub: many physical devices, a fixed pool of player slots.
//!
//! The hub sits between two execution contexts:
//! - **Ingestion** ([`HubIngest`]): backend threads/callbacks push
//!   [`DeviceEvent`]s. This side only mutates slot accumulators and queues
//!   bind/unbind notices. It never blocks on the tick side and never runs
//!   consumer code.
//! - **Tick** ([`DeviceHub`]): the simulation thread reads snapshots, clears
//!   slots once it is done with them, and calls
//!   [`dispatch_notices`](DeviceHub::dispatch_notices) once per tick to run
//!   observers.
//!
//! One mutex guards the slot array; critical sections are plain field copies.
//!
//! # Pairing
//! A device that is not bound is ignored until it presses its primary button;
//! that press claims the first free slot. A device never owns two slots.
//! Disconnects release the slot at once.
//!
//! # Example
//! ```
//! use multimouse::{DeviceEvent, DeviceHandle, DeviceHub, HubSettings, SlotNotice};
//!
//! let mut hub = DeviceHub::new(HubSettings::default());
//! let ingest = hub.ingest_handle();
//! let mouse = DeviceHandle::pointer(0x1234);
//!
//! // Backend thread:
//! ingest.ingest(DeviceEvent::button(mouse, 0, true));
//! ingest.ingest(DeviceEvent::motion(mouse, 4.0, -2.0));
//!
//! // Tick:
//! assert_eq!(hub.dispatch_notices(), vec![SlotNotice::Bound(0)]);
//! let snap = hub.snapshot(0);
//! assert!(snap.primary().pressed);
//! hub.clear(0);
//! ```

use crate::device::InputBackend;
use crate::error::{BackendError, HubError};
use crate::event::{ButtonId, DeviceEvent, DeviceEventKind, DeviceHandle, DeviceKind, PRIMARY_BUTTON};
use crate::slot::{Slot, Vec2};
use crate::snapshot::{HubSnapshot, SlotSnapshot};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Tunables for a hub.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    /// Size of the slot pool (max players).
    pub slot_count: usize,
    /// Multiplier applied to pointer motion.
    pub pointer_scale: f32,
    /// Multiplier applied to controller stick motion (per poll).
    pub controller_scale: f32,
    /// Button that pairs a device and drives `primary`.
    pub primary_button: ButtonId,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            slot_count: 4,
            pointer_scale: 1.0,
            controller_scale: 12.0,
            primary_button: PRIMARY_BUTTON,
        }
    }
}

impl HubSettings {
    fn scale_for(&self, kind: DeviceKind) -> f32 {
        match kind {
            DeviceKind::Pointer => self.pointer_scale,
            DeviceKind::Controller => self.controller_scale,
        }
    }
}

/// Pairing change for a slot, delivered on the tick thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotNotice {
    Bound(usize),
    Unbound(usize),
}

/// Handle returned by [`DeviceHub::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Shared {
    slots: Mutex<Vec<Slot>>,
    settings: HubSettings,
    notices: Sender<SlotNotice>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Vec<Slot>> {
        // Slot records are plain data; a panic mid-update cannot leave them
        // in a state worse than a dropped event.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notice: SlotNotice) {
        // Unbounded: never blocks. The receiver lives in the hub, so a send
        // only fails while the hub is being dropped.
        let _ = self.notices.send(notice);
    }
}

/// Ingestion side of a hub. Cheap to clone, `Send + Sync`.
#[derive(Clone)]
pub struct HubIngest {
    shared: Arc<Shared>,
}

impl HubIngest {
    /// Apply one backend event.
    pub fn ingest(&self, event: DeviceEvent) {
        #[cfg(feature = "debug-log")]
        tracing::trace!(?event, "ingest");

        let settings = &self.shared.settings;
        let mut slots = self.shared.lock();
        let owned = slots.iter().position(|s| s.binding == Some(event.handle));

        match event.kind {
            DeviceEventKind::Connected => {
                debug!(device = %event.handle, "device connected");
                return;
            }
            DeviceEventKind::Disconnected => {
                if let Some(index) = owned {
                    slots[index].unbind();
                    self.shared.notify(SlotNotice::Unbound(index));
                    info!(slot = index, device = %event.handle, "device disconnected, slot released");
                } else {
                    debug!(device = %event.handle, "unpaired device disconnected");
                }
                return;
            }
            _ => {}
        }

        let index = match owned {
            Some(index) => index,
            None => {
                let is_pairing_press = matches!(
                    event.kind,
                    DeviceEventKind::Button { button, down: true } if button == settings.primary_button
                );
                if !is_pairing_press {
                    return;
                }
                match slots.iter().position(|s| !s.is_bound()) {
                    Some(free) => {
                        slots[free].bind(event.handle);
                        self.shared.notify(SlotNotice::Bound(free));
                        info!(slot = free, device = %event.handle, "device paired");
                        free
                    }
                    None => {
                        debug!(device = %event.handle, "no free slot, pairing press ignored");
                        return;
                    }
                }
            }
        };

        let slot = &mut slots[index];
        match event.kind {
            DeviceEventKind::Motion { absolute, x, y } => {
                let v = Vec2::new(x, y).scale(settings.scale_for(event.handle.kind));
                if !v.x.is_finite() || !v.y.is_finite() {
                    debug!(slot = index, device = %event.handle, x, y, "non-finite motion dropped");
                    return;
                }
                if absolute {
                    slot.move_to(v);
                } else {
                    slot.add_motion(v);
                }
            }
            DeviceEventKind::Button { button, down } if button == settings.primary_button => {
                if down {
                    slot.primary_mut().press();
                } else {
                    slot.primary_mut().release();
                }
            }
            _ => {}
        }
    }

    /// Apply a batch of events under one pass of the caller.
    pub fn ingest_all<I: IntoIterator<Item = DeviceEvent>>(&self, events: I) {
        for event in events {
            self.ingest(event);
        }
    }
}

/// Tick side of the slot pool.
pub struct DeviceHub {
    shared: Arc<Shared>,
    notices: Receiver<SlotNotice>,
    observers: Vec<(ObserverId, Box<dyn FnMut(SlotNotice)>)>,
    next_observer: u64,
    backends: Vec<Box<dyn InputBackend>>,
}

impl DeviceHub {
    /// Allocate the slot pool. Slots are never destroyed; only their binding
    /// changes.
    pub fn new(settings: HubSettings) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let slots = vec![Slot::default(); settings.slot_count];
        info!(slots = settings.slot_count, "device hub ready");

        Self {
            shared: Arc::new(Shared {
                slots: Mutex::new(slots),
                settings,
                notices: tx,
            }),
            notices: rx,
            observers: Vec::new(),
            next_observer: 0,
            backends: Vec::new(),
        }
    }

    pub fn settings(&self) -> &HubSettings {
        &self.shared.settings
    }

    pub fn slot_count(&self) -> usize {
        self.shared.settings.slot_count
    }

    /// Handle for backends to push events from any thread.
    pub fn ingest_handle(&self) -> HubIngest {
        HubIngest {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Start a backend and keep it alive for the hub's lifetime.
    pub fn attach<B: InputBackend + 'static>(&mut self, mut backend: B) -> Result<(), BackendError> {
        info!(backend = backend.name(), "starting input backend");
        backend.start(self.ingest_handle())?;
        self.backends.push(Box::new(backend));
        Ok(())
    }

    fn check(&self, slot: usize) -> Result<(), HubError> {
        let len = self.slot_count();
        if slot >= len {
            return Err(HubError::OutOfRange { index: slot, len });
        }
        Ok(())
    }

    /// Frame view of a slot.
    ///
    /// Two calls with no [`clear`](Self::clear) in between return the same
    /// delta and edges, even if input arrived in between. That input shows up
    /// in the first read after the next clear.
    pub fn try_snapshot(&self, slot: usize) -> Result<SlotSnapshot, HubError> {
        self.check(slot)?;
        let mut slots = self.shared.lock();
        let (device, input) = slots[slot].latch();
        Ok(SlotSnapshot {
            slot,
            device,
            input,
        })
    }

    /// Like [`try_snapshot`](Self::try_snapshot), but logs and returns a zeroed
    /// snapshot on a bad index.
    pub fn snapshot(&self, slot: usize) -> SlotSnapshot {
        self.try_snapshot(slot).unwrap_or_else(|e| {
            warn!("snapshot: {e}");
            SlotSnapshot::empty(slot)
        })
    }

    /// Frame view of every slot.
    pub fn snapshot_all(&self) -> HubSnapshot {
        let mut slots = self.shared.lock();
        HubSnapshot(
            slots
                .iter_mut()
                .enumerate()
                .map(|(slot, s)| {
                    let (device, input) = s.latch();
                    SlotSnapshot {
                        slot,
                        device,
                        input,
                    }
                })
                .collect(),
        )
    }

    /// End the slot's read window: zero delta and button edges.
    ///
    /// Call once per tick, after the last read of that tick.
    pub fn try_clear(&self, slot: usize) -> Result<(), HubError> {
        self.check(slot)?;
        self.shared.lock()[slot].clear();
        Ok(())
    }

    pub fn clear(&self, slot: usize) {
        if let Err(e) = self.try_clear(slot) {
            warn!("clear: {e}");
        }
    }

    /// Clear every slot.
    pub fn clear_all(&self) {
        for slot in self.shared.lock().iter_mut() {
            slot.clear();
        }
    }

    /// Whether a device currently owns the slot.
    pub fn is_bound(&self, slot: usize) -> bool {
        if let Err(e) = self.check(slot) {
            warn!("is_bound: {e}");
            return false;
        }
        self.shared.lock()[slot].is_bound()
    }

    /// Device currently owning the slot.
    pub fn device(&self, slot: usize) -> Option<DeviceHandle> {
        self.check(slot).ok()?;
        self.shared.lock()[slot].binding
    }

    /// Slot owned by `device`, if any.
    pub fn slot_of(&self, device: DeviceHandle) -> Option<usize> {
        self.shared
            .lock()
            .iter()
            .position(|s| s.binding == Some(device))
    }

    /// Pair `device` with a specific slot (e.g. restoring a saved pairing).
    ///
    /// Fails with [`HubError::AlreadyBound`] if the slot is taken or the
    /// device already owns another slot.
    pub fn try_bind(&self, slot: usize, device: DeviceHandle) -> Result<(), HubError> {
        self.check(slot)?;
        let mut slots = self.shared.lock();
        if let Some(owner) = slots.iter().position(|s| s.binding == Some(device)) {
            return Err(HubError::AlreadyBound(owner));
        }
        if slots[slot].is_bound() {
            return Err(HubError::AlreadyBound(slot));
        }
        slots[slot].bind(device);
        self.shared.notify(SlotNotice::Bound(slot));
        info!(slot, %device, "device paired explicitly");
        Ok(())
    }

    /// Non-failing [`try_bind`](Self::try_bind): occupied slots are left alone.
    pub fn bind(&self, slot: usize, device: DeviceHandle) -> bool {
        match self.try_bind(slot, device) {
            Ok(()) => true,
            Err(HubError::AlreadyBound(_)) => {
                debug!(slot, %device, "bind ignored, already bound");
                false
            }
            Err(e) => {
                warn!("bind: {e}");
                false
            }
        }
    }

    /// Unpair a slot from the tick side, as if its device disconnected.
    pub fn try_release(&self, slot: usize) -> Result<DeviceHandle, HubError> {
        self.check(slot)?;
        let mut slots = self.shared.lock();
        let device = slots[slot].unbind().ok_or(HubError::Unbound(slot))?;
        self.shared.notify(SlotNotice::Unbound(slot));
        info!(slot, %device, "slot released");
        Ok(device)
    }

    pub fn release(&self, slot: usize) -> Option<DeviceHandle> {
        match self.try_release(slot) {
            Ok(device) => Some(device),
            Err(e) => {
                warn!("release: {e}");
                None
            }
        }
    }

    /// Register an observer for pairing changes. Observers run in
    /// registration order during [`dispatch_notices`](Self::dispatch_notices).
    pub fn subscribe(&mut self, observer: impl FnMut(SlotNotice) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    /// Drain queued pairing changes and run observers on this thread.
    ///
    /// Returns the drained notices in the order they happened.
    pub fn dispatch_notices(&mut self) -> Vec<SlotNotice> {
        let pending: Vec<SlotNotice> = self.notices.try_iter().collect();
        for &notice in &pending {
            debug!(?notice, "dispatching slot notice");
            for (_, observer) in self.observers.iter_mut() {
                observer(notice);
            }
        }
        pending
    }
}

impl Drop for DeviceHub {
    fn drop(&mut self) {
        for backend in self.backends.iter_mut() {
            info!(backend = backend.name(), "stopping input backend");
            backend.stop();
        }
    }
}
