//! Game-logic components that talk to each other only through channels.

use crate::interaction::Interact;
use crate::signal::{ChannelId, ListenerId, SignalBus, SignalListener};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

/// Forwards edges on one channel to its own ordered callbacks.
///
/// Use this when the reaction lives elsewhere and only needs "channel N
/// changed". Components with their own state should implement
/// [`SignalListener`] directly.
pub struct Relay {
    channel: ChannelId,
    callbacks: RefCell<Vec<Box<dyn Fn(&mut SignalBus, ChannelId)>>>,
    registration: Cell<Option<ListenerId>>,
}

impl Relay {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            callbacks: RefCell::new(Vec::new()),
            registration: Cell::new(None),
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Append a callback. Callbacks run in the order they were added.
    pub fn on_received(&self, callback: impl Fn(&mut SignalBus, ChannelId) + 'static) {
        self.callbacks.borrow_mut().push(Box::new(callback));
    }

    pub fn attach(self, bus: &mut SignalBus) -> Rc<Relay> {
        let relay = Rc::new(self);
        relay
            .registration
            .set(bus.add_listener(relay.channel, relay.clone()));
        relay
    }

    pub fn detach(&self, bus: &mut SignalBus) {
        if let Some(id) = self.registration.take() {
            bus.remove_listener(self.channel, id);
        }
    }
}

impl SignalListener for Relay {
    fn on_signal(&self, bus: &mut SignalBus, channel: ChannelId) {
        // Callbacks must not add callbacks to this relay while it fires.
        let callbacks = self.callbacks.borrow();
        for callback in callbacks.iter() {
            callback(bus, channel);
        }
    }
}

/// Two-state switch toggled by interaction.
#[derive(Debug)]
pub struct Lever {
    channel: ChannelId,
    on: Cell<bool>,
}

impl Lever {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            on: Cell::new(false),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on.get()
    }

    /// Flip and publish the new state.
    pub fn toggle(&self, bus: &mut SignalBus) {
        let on = !self.on.get();
        self.on.set(on);
        debug!(channel = self.channel, on, "lever toggled");
        bus.set(self.channel, on);
    }
}

impl Interact for Lever {
    fn begin_interaction(&self, bus: &mut SignalBus) {
        self.toggle(bus);
    }
}

/// Downward force above which a plate counts as pressed.
pub const DEFAULT_PLATE_THRESHOLD: f32 = 50.0;

/// Plate that publishes whether enough weight rests on it.
///
/// The physics layer sums the downward force of bodies on the plate each
/// fixed step and calls [`update`](Self::update). The channel is written only
/// when the pressed state changes.
#[derive(Debug)]
pub struct PressurePlate {
    channel: ChannelId,
    threshold: f32,
    pressed: Cell<bool>,
}

impl PressurePlate {
    pub fn new(channel: ChannelId) -> Self {
        Self::with_threshold(channel, DEFAULT_PLATE_THRESHOLD)
    }

    pub fn with_threshold(channel: ChannelId, threshold: f32) -> Self {
        Self {
            channel,
            threshold,
            pressed: Cell::new(false),
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed.get()
    }

    /// Returns `true` if the pressed state changed.
    pub fn update(&self, bus: &mut SignalBus, downward_force: f32) -> bool {
        let pressed = downward_force > self.threshold;
        if pressed == self.pressed.get() {
            return false;
        }
        self.pressed.set(pressed);
        bus.set(self.channel, pressed);
        true
    }
}

/// Door that opens while its channel is on.
#[derive(Debug)]
pub struct Door {
    channel: ChannelId,
    open: Cell<bool>,
    transitions: Cell<u32>,
    registration: Cell<Option<ListenerId>>,
}

impl Door {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            open: Cell::new(false),
            transitions: Cell::new(0),
            registration: Cell::new(None),
        }
    }

    pub fn attach(self, bus: &mut SignalBus) -> Rc<Door> {
        self.open.set(bus.get(self.channel));
        let door = Rc::new(self);
        door.registration
            .set(bus.add_listener(door.channel, door.clone()));
        door
    }

    pub fn detach(&self, bus: &mut SignalBus) {
        if let Some(id) = self.registration.take() {
            bus.remove_listener(self.channel, id);
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    /// How many times the door has opened or closed.
    pub fn transitions(&self) -> u32 {
        self.transitions.get()
    }
}

impl SignalListener for Door {
    fn on_signal(&self, bus: &mut SignalBus, channel: ChannelId) {
        if channel != self.channel {
            return;
        }
        let open = bus.get(self.channel);
        if open != self.open.get() {
            self.open.set(open);
            self.transitions.set(self.transitions.get() + 1);
            debug!(channel, open, "door moved");
        }
    }
}
