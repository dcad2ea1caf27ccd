//! Signal bus: a fixed bank of analog/boolean channels with edge-triggered
//! listeners.
//!
//! Each channel holds a value in `[0, 1]`; its boolean projection is
//! `value > 0.5`. Listeners on a channel run **only** when a write flips the
//! boolean projection. Writes that stay on the same side of the threshold are
//! silent, which keeps gate networks from producing notification storms.
//!
//! Dispatch is synchronous, on the caller's thread, in registration order.
//! Listeners get `&mut SignalBus` and may write further channels; the
//! cascade resolves on the call stack before the triggering
//! [`set_value`](SignalBus::set_value) returns.
//!
//! The bus is single-threaded (`!Send`): it belongs to the simulation tick.
//!
//! # Example
//! ```
//! use multimouse::signal::{ChannelId, SignalBus};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut bus = SignalBus::default();
//! let hits = Rc::new(Cell::new(0));
//! let counter = hits.clone();
//! bus.add_listener(3, Rc::new(move |_: &mut SignalBus, _: ChannelId| {
//!     counter.set(counter.get() + 1);
//! }));
//!
//! bus.set_value(3, 0.3); // below threshold
//! bus.set_value(3, 0.6); // crosses
//! bus.set_value(3, 0.9); // still above
//! assert_eq!(hits.get(), 1);
//! ```

use crate::error::SignalError;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, warn};

/// Number of channels in a bus.
pub const CHANNEL_COUNT: usize = 128;

/// Boolean threshold.
pub const THRESHOLD: f32 = 0.5;

/// Channel index, `0..CHANNEL_COUNT`.
pub type ChannelId = usize;

/// Reacts to edges on a channel.
///
/// Takes `&self` so a listener can be re-entered by a feedback loop; keep
/// mutable state in `Cell`/`RefCell`.
pub trait SignalListener {
    fn on_signal(&self, bus: &mut SignalBus, channel: ChannelId);
}

impl<F> SignalListener for F
where
    F: Fn(&mut SignalBus, ChannelId),
{
    fn on_signal(&self, bus: &mut SignalBus, channel: ChannelId) {
        self(bus, channel)
    }
}

/// Handle returned by [`SignalBus::add_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Bus tunables.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    /// Maximum nesting of listener dispatch. `None` = unbounded.
    ///
    /// With a limit, a write at the limit still stores its value but does not
    /// notify, which breaks feedback loops that never settle.
    pub max_cascade_depth: Option<usize>,
}

#[inline]
fn projection(value: f32) -> bool {
    value > THRESHOLD
}

struct ListenerEntry {
    id: ListenerId,
    listener: Rc<dyn SignalListener>,
}

struct Channel {
    value: f32,
    listeners: Vec<ListenerEntry>,
}

pub struct SignalBus {
    channels: Vec<Channel>,
    settings: SignalSettings,
    next_id: u64,
    depth: usize,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(SignalSettings::default())
    }
}

impl SignalBus {
    pub fn new(settings: SignalSettings) -> Self {
        let channels = (0..CHANNEL_COUNT)
            .map(|_| Channel {
                value: 0.0,
                listeners: Vec::new(),
            })
            .collect();
        Self {
            channels,
            settings,
            next_id: 0,
            depth: 0,
        }
    }

    pub fn settings(&self) -> &SignalSettings {
        &self.settings
    }

    fn check(channel: ChannelId) -> Result<(), SignalError> {
        if channel >= CHANNEL_COUNT {
            return Err(SignalError::OutOfRange(channel));
        }
        Ok(())
    }

    pub fn try_value(&self, channel: ChannelId) -> Result<f32, SignalError> {
        Self::check(channel)?;
        Ok(self.channels[channel].value)
    }

    /// Analog value; `0.0` (and a warning) on a bad channel.
    pub fn value(&self, channel: ChannelId) -> f32 {
        self.try_value(channel).unwrap_or_else(|e| {
            warn!("value: {e}");
            0.0
        })
    }

    pub fn try_get(&self, channel: ChannelId) -> Result<bool, SignalError> {
        self.try_value(channel).map(projection)
    }

    /// Boolean projection; `false` (and a warning) on a bad channel.
    pub fn get(&self, channel: ChannelId) -> bool {
        self.try_get(channel).unwrap_or_else(|e| {
            warn!("get: {e}");
            false
        })
    }

    /// Store `value` (clamped to `[0, 1]`) and notify listeners if the boolean
    /// projection flipped. Returns whether it flipped.
    pub fn try_set_value(&mut self, channel: ChannelId, value: f32) -> Result<bool, SignalError> {
        Self::check(channel)?;

        let value = if value.is_nan() {
            warn!(channel, "NaN written to channel, stored as 0");
            0.0
        } else {
            value.clamp(0.0, 1.0)
        };

        let before = projection(self.channels[channel].value);
        self.channels[channel].value = value;
        let after = projection(value);
        if before == after {
            return Ok(false);
        }

        #[cfg(feature = "debug-log")]
        tracing::trace!(channel, value, "edge");

        self.dispatch(channel);
        Ok(true)
    }

    pub fn set_value(&mut self, channel: ChannelId, value: f32) -> bool {
        self.try_set_value(channel, value).unwrap_or_else(|e| {
            warn!("set_value: {e}");
            false
        })
    }

    pub fn try_set(&mut self, channel: ChannelId, on: bool) -> Result<bool, SignalError> {
        self.try_set_value(channel, if on { 1.0 } else { 0.0 })
    }

    /// Boolean write; same as `set_value(channel, 1.0 or 0.0)`.
    pub fn set(&mut self, channel: ChannelId, on: bool) -> bool {
        self.set_value(channel, if on { 1.0 } else { 0.0 })
    }

    fn dispatch(&mut self, channel: ChannelId) {
        if let Some(limit) = self.settings.max_cascade_depth {
            if self.depth >= limit {
                warn!(channel, depth = self.depth, "signal cascade depth limit hit, edge not propagated");
                return;
            }
        }

        // Copy the list: listeners may add/remove listeners while running.
        let targets: Vec<Rc<dyn SignalListener>> = self.channels[channel]
            .listeners
            .iter()
            .map(|e| Rc::clone(&e.listener))
            .collect();

        self.depth += 1;
        for listener in targets {
            listener.on_signal(self, channel);
        }
        self.depth -= 1;
    }

    /// Append a listener to a channel. `None` (and a warning) on a bad channel.
    pub fn add_listener(
        &mut self,
        channel: ChannelId,
        listener: Rc<dyn SignalListener>,
    ) -> Option<ListenerId> {
        if let Err(e) = Self::check(channel) {
            warn!("add_listener: {e}");
            return None;
        }
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.channels[channel]
            .listeners
            .push(ListenerEntry { id, listener });
        debug!(channel, ?id, "listener added");
        Some(id)
    }

    /// Remove a listener. Returns `false` if it was not registered there.
    pub fn remove_listener(&mut self, channel: ChannelId, id: ListenerId) -> bool {
        if let Err(e) = Self::check(channel) {
            warn!("remove_listener: {e}");
            return false;
        }
        let listeners = &mut self.channels[channel].listeners;
        let before = listeners.len();
        listeners.retain(|e| e.id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self, channel: ChannelId) -> usize {
        self.channels
            .get(channel)
            .map_or(0, |c| c.listeners.len())
    }

    /// Zero every channel without notifying anyone. Listeners stay registered.
    ///
    /// This is a hard reinitialization (level restart), not a logical
    /// transition.
    pub fn reset_all(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.value = 0.0;
        }
        debug!("signal bus reset");
    }
}
