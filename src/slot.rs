//! Player slot state.
//!
//! A slot is one stable player identity. It is either unbound, or bound to
//! exactly one [`DeviceHandle`]. Input from the bound device accumulates in the
//! slot's *live* record; readers see a *latched* copy so that every read
//! between two clears is identical (see [`Slot::latch`]).

use crate::event::DeviceHandle;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

/// 2D vector in cursor units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Primary button record for one read window.
///
/// `pressed`/`released` are edges seen since the last clear; `held` is the
/// level. A quick click inside one window reports `pressed && released`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEdges {
    pub pressed: bool,
    pub held: bool,
    pub released: bool,
}

impl ButtonEdges {
    pub(crate) fn press(&mut self) {
        self.pressed = true;
        self.held = true;
    }

    pub(crate) fn release(&mut self) {
        self.released = true;
        self.held = false;
    }

    fn merge_edges(&mut self, newer: &ButtonEdges) {
        self.pressed |= newer.pressed;
        self.released |= newer.released;
        self.held = newer.held;
    }

    fn clear_edges(&mut self) {
        self.pressed = false;
        self.released = false;
    }
}

/// Accumulated input for a slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotInput {
    /// Free-running absolute position (not tied to any screen).
    pub position: Vec2,
    /// Motion since the last clear.
    pub delta: Vec2,
    /// Primary button.
    pub primary: ButtonEdges,
}

/// One entry in the hub's slot pool.
#[derive(Clone, Debug, Default)]
pub(crate) struct Slot {
    pub binding: Option<DeviceHandle>,
    /// Written by ingestion.
    live: SlotInput,
    /// Handed to readers.
    latched: SlotInput,
    /// Binding as of the last latch.
    latched_binding: Option<DeviceHandle>,
    /// `true` once the current read window has pulled live input in.
    is_latched: bool,
}

impl Slot {
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn bind(&mut self, handle: DeviceHandle) {
        self.binding = Some(handle);
    }

    /// Drop the binding and forget live input.
    ///
    /// A view already latched for this read window stays as it is; the
    /// unbind shows up in the first read after the next [`clear`](Self::clear).
    pub fn unbind(&mut self) -> Option<DeviceHandle> {
        self.live = SlotInput::default();
        self.binding.take()
    }

    /// Relative motion, already scaled.
    pub fn add_motion(&mut self, d: Vec2) {
        self.live.delta += d;
        self.live.position += d;
    }

    /// Absolute motion, already scaled. The delta is the jump from the last
    /// known position.
    pub fn move_to(&mut self, p: Vec2) {
        self.live.delta += p - self.live.position;
        self.live.position = p;
    }

    pub fn primary_mut(&mut self) -> &mut ButtonEdges {
        &mut self.live.primary
    }

    /// Return the frame view, pulling live input in first if this read window
    /// has not latched yet.
    pub fn latch(&mut self) -> (Option<DeviceHandle>, SlotInput) {
        if !self.is_latched {
            self.latched.delta += self.live.delta;
            self.latched.position = self.live.position;
            self.latched.primary.merge_edges(&self.live.primary);
            self.latched_binding = self.binding;

            self.live.delta = Vec2::ZERO;
            self.live.primary.clear_edges();
            self.is_latched = true;
        }
        (self.latched_binding, self.latched)
    }

    /// End the read window: zero the frame's delta and edges and let the next
    /// read pull fresh live input.
    pub fn clear(&mut self) {
        self.latched.delta = Vec2::ZERO;
        self.latched.primary.clear_edges();
        self.is_latched = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_holds_until_clear() {
        let mut slot = Slot::default();
        slot.bind(DeviceHandle::pointer(7));
        slot.add_motion(Vec2::new(3.0, 1.0));

        let (_, first) = slot.latch();
        slot.add_motion(Vec2::new(10.0, 10.0));
        let (_, second) = slot.latch();
        assert_eq!(first, second);
        assert_eq!(first.delta, Vec2::new(3.0, 1.0));

        slot.clear();
        let (_, third) = slot.latch();
        assert_eq!(third.delta, Vec2::new(10.0, 10.0));
        assert_eq!(third.position, Vec2::new(13.0, 11.0));
    }

    #[test]
    fn unbind_keeps_the_current_window() {
        let mut slot = Slot::default();
        slot.bind(DeviceHandle::pointer(1));
        slot.add_motion(Vec2::new(3.0, 4.0));
        slot.primary_mut().press();
        let (device, first) = slot.latch();

        assert_eq!(slot.unbind(), Some(DeviceHandle::pointer(1)));
        slot.bind(DeviceHandle::pointer(2));
        slot.add_motion(Vec2::new(9.0, 9.0));
        assert_eq!(slot.latch(), (device, first));

        // Next window: the old device's input and level are gone.
        slot.clear();
        let (device, view) = slot.latch();
        assert_eq!(device, Some(DeviceHandle::pointer(2)));
        assert_eq!(view.delta, Vec2::new(9.0, 9.0));
        assert_eq!(view.position, Vec2::new(9.0, 9.0));
        assert!(!view.primary.held);
    }

    #[test]
    fn absolute_motion_derives_delta() {
        let mut slot = Slot::default();
        slot.move_to(Vec2::new(100.0, 50.0));
        slot.move_to(Vec2::new(110.0, 45.0));
        let (_, view) = slot.latch();
        assert_eq!(view.delta, Vec2::new(110.0, 45.0));
        assert_eq!(view.position, Vec2::new(110.0, 45.0));

        slot.clear();
        slot.move_to(Vec2::new(100.0, 40.0));
        let (_, view) = slot.latch();
        assert_eq!(view.delta, Vec2::new(-10.0, -5.0));
    }

    #[test]
    fn click_within_one_window_keeps_both_edges() {
        let mut slot = Slot::default();
        slot.primary_mut().press();
        slot.primary_mut().release();
        let (_, view) = slot.latch();
        assert!(view.primary.pressed);
        assert!(view.primary.released);
        assert!(!view.primary.held);

        slot.clear();
        let (_, view) = slot.latch();
        assert_eq!(view.primary, ButtonEdges::default());
    }
}
