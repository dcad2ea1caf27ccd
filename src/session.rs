//! Session: the object that owns the hub, the bus and the cursors.
//!
//! The host simulation creates one [`Session`] per level/run and calls
//! [`step`](Session::step) once per tick. Each step:
//! 1. drains pairing notices (a cursor whose device left drops its host),
//! 2. reads each slot once, banks its motion and handles a primary press as a
//!    click through the [`CapabilityTable`],
//! 3. clears every slot for the next tick.
//!
//! Physics owns positions; the session only tells it which host each cursor
//! drives and how much motion to apply ([`take_motion`](Session::take_motion)).

use crate::config::{Config, SessionSettings};
use crate::error::BackendError;
use crate::gate::Gate;
use crate::hub::{DeviceHub, SlotNotice};
use crate::interaction::{
    pick_target, Candidate, Capability, CapabilityTable, ClickOutcome, ObjectHandle, SpatialQuery,
};
use crate::signal::SignalBus;
use crate::slot::Vec2;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Per-player cursor state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cursor {
    pub slot: usize,
    /// Whether a device drives this cursor.
    pub bound: bool,
    /// Possessed host, if any.
    pub host: Option<ObjectHandle>,
    /// Motion banked since the simulation last took it.
    pub motion: Vec2,
    /// Primary button level as of the last step.
    pub held: bool,
}

/// What happened during one [`Session::step`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub notices: Vec<SlotNotice>,
    /// `(slot, outcome)` for every click this tick.
    pub clicks: Vec<(usize, ClickOutcome)>,
}

pub struct Session {
    hub: DeviceHub,
    bus: SignalBus,
    capabilities: CapabilityTable,
    cursors: Vec<Cursor>,
    gates: Vec<Rc<Gate>>,
    settings: SessionSettings,
    config: Config,
}

impl Session {
    /// Build a hub and a bus from `config` and attach its gates. Backends are
    /// not started; see [`start_backends`](Self::start_backends).
    pub fn new(config: Config) -> Self {
        let hub = DeviceHub::new(config.hub.clone());
        let mut bus = SignalBus::new(config.signals.clone());
        let gates = config.build_gates(&mut bus);
        let cursors = (0..hub.slot_count())
            .map(|slot| Cursor {
                slot,
                ..Default::default()
            })
            .collect();
        info!(slots = hub.slot_count(), gates = gates.len(), "session created");

        Self {
            hub,
            bus,
            capabilities: CapabilityTable::new(),
            cursors,
            gates,
            settings: config.session.clone(),
            config,
        }
    }

    /// Start the backends enabled in the config and compiled into this build.
    ///
    /// A failure is fatal: the input path cannot work without it.
    pub fn start_backends(&mut self) -> Result<(), BackendError> {
        let backends = self.config.backends.clone();
        crate::backends::start_configured(&mut self.hub, &backends)
    }

    pub fn hub(&self) -> &DeviceHub {
        &self.hub
    }

    pub fn hub_mut(&mut self) -> &mut DeviceHub {
        &mut self.hub
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SignalBus {
        &mut self.bus
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    pub fn capabilities_mut(&mut self) -> &mut CapabilityTable {
        &mut self.capabilities
    }

    pub fn gates(&self) -> &[Rc<Gate>] {
        &self.gates
    }

    pub fn cursors(&self) -> &[Cursor] {
        &self.cursors
    }

    pub fn cursor(&self, slot: usize) -> Option<&Cursor> {
        self.cursors.get(slot)
    }

    /// Player index for a slot, `None` while no device drives it.
    pub fn player_index(&self, slot: usize) -> Option<usize> {
        self.cursors.get(slot).filter(|c| c.bound).map(|c| c.slot)
    }

    /// Run one tick.
    ///
    /// `origin_of(slot)` gives the world-space interaction point of that
    /// player's cursor; `query` answers overlap queries around it.
    pub fn step<Q, O>(&mut self, query: &Q, origin_of: O) -> TickReport
    where
        Q: SpatialQuery + ?Sized,
        O: Fn(usize) -> [f32; 3],
    {
        let mut report = TickReport {
            notices: self.hub.dispatch_notices(),
            clicks: Vec::new(),
        };

        for notice in &report.notices {
            match *notice {
                SlotNotice::Bound(slot) => {
                    if let Some(cursor) = self.cursors.get_mut(slot) {
                        cursor.bound = true;
                    }
                }
                SlotNotice::Unbound(slot) => {
                    if let Some(cursor) = self.cursors.get_mut(slot) {
                        if let Some(host) = cursor.host.take() {
                            debug!(slot, ?host, "device left, host released");
                        }
                        *cursor = Cursor {
                            slot,
                            ..Default::default()
                        };
                    }
                }
            }
        }

        let range = self.settings.interaction_range;
        let cap = self.settings.max_pending_motion;
        for slot in 0..self.cursors.len() {
            let snap = self.hub.snapshot(slot);
            if snap.is_bound() {
                let cursor = &mut self.cursors[slot];
                cursor.motion += snap.delta();
                let len = cursor.motion.length();
                if len > cap {
                    cursor.motion = cursor.motion.scale(cap / len);
                }
                cursor.held = snap.primary().held;

                if snap.primary().pressed {
                    let candidates = query.overlap(origin_of(slot), range);
                    let outcome = self.click(slot, &candidates);
                    report.clicks.push((slot, outcome));
                }
            }
            self.hub.clear(slot);
        }

        report
    }

    /// Resolve a click by `slot` against `candidates`.
    pub fn click(&mut self, slot: usize, candidates: &[Candidate]) -> ClickOutcome {
        let Some(cursor) = self.cursors.get(slot) else {
            warn!(slot, "click: slot out of range");
            return ClickOutcome::Nothing;
        };
        let exclude: Vec<ObjectHandle> = cursor.host.into_iter().collect();
        let Some(target) = pick_target(
            candidates,
            &self.capabilities,
            self.settings.interaction_range,
            &exclude,
        ) else {
            return ClickOutcome::Nothing;
        };

        match self.capabilities.get(target.handle).cloned() {
            Some(Capability::Host) => {
                if self.is_host_taken(target.handle, slot) {
                    debug!(slot, host = ?target.handle, "host already possessed");
                    return ClickOutcome::Nothing;
                }
                let previous = self.cursors[slot].host.replace(target.handle);
                info!(slot, host = ?target.handle, ?previous, "host possessed");
                ClickOutcome::Possessed {
                    host: target.handle,
                    previous,
                }
            }
            Some(Capability::Interactable(interactable)) => {
                if self.cursors[slot].host.is_none() {
                    return ClickOutcome::NeedsHost(target.handle);
                }
                interactable.begin_interaction(&mut self.bus);
                ClickOutcome::Interacted(target.handle)
            }
            None => ClickOutcome::Nothing,
        }
    }

    fn is_host_taken(&self, host: ObjectHandle, by_other_than: usize) -> bool {
        self.cursors
            .iter()
            .any(|c| c.slot != by_other_than && c.host == Some(host))
    }

    /// Give `slot` a host directly (level start). Fails if another cursor has it.
    pub fn assign_host(&mut self, slot: usize, host: ObjectHandle) -> bool {
        if slot >= self.cursors.len() || self.is_host_taken(host, slot) {
            return false;
        }
        self.cursors[slot].host = Some(host);
        true
    }

    /// Drop the cursor's host.
    pub fn eject(&mut self, slot: usize) -> Option<ObjectHandle> {
        self.cursors.get_mut(slot)?.host.take()
    }

    /// Take the motion banked for `slot`, leaving zero.
    pub fn take_motion(&mut self, slot: usize) -> Vec2 {
        self.cursors
            .get_mut(slot)
            .map(|c| std::mem::take(&mut c.motion))
            .unwrap_or_default()
    }

    /// Level restart: every channel back to 0, no notifications.
    pub fn reset_signals(&mut self) {
        self.bus.reset_all();
    }
}
