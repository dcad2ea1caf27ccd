//! What a cursor can click on.
//!
//! The physics layer answers "what is near this point" with opaque
//! [`ObjectHandle`]s and distances ([`SpatialQuery`]). What each object *can
//! do* is looked up in a [`CapabilityTable`]; there is no runtime type
//! probing.
//!
//! Two capabilities exist:
//! - [`Capability::Host`]: an avatar a cursor can possess.
//! - [`Capability::Interactable`]: something a possessed host can operate
//!   (levers, buttons). Clicking one without a host does nothing.

use crate::signal::SignalBus;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Opaque id of a world object, issued by the host simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

/// An object near the query point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub handle: ObjectHandle,
    /// Distance from the query point to the object's closest point.
    pub distance: f32,
}

/// Overlap query supplied by the physics layer.
pub trait SpatialQuery {
    /// Objects overlapping the sphere at `origin` with `radius`.
    fn overlap(&self, origin: [f32; 3], radius: f32) -> Vec<Candidate>;
}

impl<F> SpatialQuery for F
where
    F: Fn([f32; 3], f32) -> Vec<Candidate>,
{
    fn overlap(&self, origin: [f32; 3], radius: f32) -> Vec<Candidate> {
        self(origin, radius)
    }
}

/// Something a host can operate.
pub trait Interact {
    fn begin_interaction(&self, bus: &mut SignalBus);
}

#[derive(Clone)]
pub enum Capability {
    Host,
    Interactable(Rc<dyn Interact>),
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Host => f.write_str("Host"),
            Capability::Interactable(_) => f.write_str("Interactable"),
        }
    }
}

/// Capability records by object.
#[derive(Default, Debug)]
pub struct CapabilityTable {
    entries: HashMap<ObjectHandle, Capability>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_host(&mut self, handle: ObjectHandle) {
        self.entries.insert(handle, Capability::Host);
    }

    pub fn register_interactable(&mut self, handle: ObjectHandle, target: Rc<dyn Interact>) {
        self.entries
            .insert(handle, Capability::Interactable(target));
    }

    pub fn remove(&mut self, handle: ObjectHandle) -> Option<Capability> {
        self.entries.remove(&handle)
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&Capability> {
        self.entries.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Closest candidate strictly within `range` that has a capability and is not
/// in `exclude`. Candidates without a capability are skipped before the
/// distance comparison, so an inert object cannot shadow a clickable one.
pub fn pick_target(
    candidates: &[Candidate],
    table: &CapabilityTable,
    range: f32,
    exclude: &[ObjectHandle],
) -> Option<Candidate> {
    candidates
        .iter()
        .filter(|c| c.distance < range)
        .filter(|c| !exclude.contains(&c.handle))
        .filter(|c| table.get(c.handle).is_some())
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
        .copied()
}

/// Result of a cursor click.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The cursor took a host, releasing `previous` if it had one.
    Possessed {
        host: ObjectHandle,
        previous: Option<ObjectHandle>,
    },
    /// The cursor's host operated an interactable.
    Interacted(ObjectHandle),
    /// An interactable was clicked with no host.
    NeedsHost(ObjectHandle),
    /// Nothing clickable in range, or the host belongs to someone else.
    Nothing,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;
    impl Interact for Inert {
        fn begin_interaction(&self, _: &mut SignalBus) {}
    }

    fn c(h: u64, d: f32) -> Candidate {
        Candidate {
            handle: ObjectHandle(h),
            distance: d,
        }
    }

    #[test]
    fn filters_before_choosing_closest() {
        let mut table = CapabilityTable::new();
        table.register_host(ObjectHandle(2));
        table.register_interactable(ObjectHandle(3), Rc::new(Inert));

        // 1 is closest but has no capability.
        let picked = pick_target(&[c(1, 0.1), c(3, 0.8), c(2, 0.5)], &table, 1.0, &[]);
        assert_eq!(picked.map(|p| p.handle), Some(ObjectHandle(2)));

        let picked = pick_target(&[c(2, 0.5), c(3, 0.8)], &table, 1.0, &[ObjectHandle(2)]);
        assert_eq!(picked.map(|p| p.handle), Some(ObjectHandle(3)));

        assert_eq!(pick_target(&[c(2, 1.5)], &table, 1.0, &[]), None);
    }
}
