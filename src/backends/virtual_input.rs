//! Software devices for tests, demos and replays.
//!
//! - [`VirtualDevice`] is a polled [`Device`]: events fed through its
//!   [`VirtualFeed`] queue up until the next poll.
//! - [`VirtualFeed::direct`] skips the queue and pushes straight into a hub,
//!   which is what synchronous tests want.

use crate::device::Device;
use crate::event::{ButtonId, DeviceEvent, DeviceHandle, PRIMARY_BUTTON};
use crate::hub::HubIngest;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

type Queue = Arc<Mutex<VecDeque<DeviceEvent>>>;

#[derive(Clone)]
enum Target {
    Queue(Queue),
    Hub(HubIngest),
}

/// Scripted input for one virtual device. Cheap to clone.
#[derive(Clone)]
pub struct VirtualFeed {
    handle: DeviceHandle,
    target: Target,
}

impl VirtualFeed {
    /// Feed that delivers into `ingest` immediately.
    pub fn direct(handle: DeviceHandle, ingest: HubIngest) -> Self {
        Self {
            handle,
            target: Target::Hub(ingest),
        }
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    /// Inject a raw event.
    pub fn feed(&self, event: DeviceEvent) {
        match &self.target {
            Target::Queue(queue) => queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(event),
            Target::Hub(ingest) => ingest.ingest(event),
        }
    }

    pub fn move_by(&self, dx: f32, dy: f32) {
        self.feed(DeviceEvent::motion(self.handle, dx, dy));
    }

    pub fn move_to(&self, x: f32, y: f32) {
        self.feed(DeviceEvent::absolute(self.handle, x, y));
    }

    pub fn press(&self, button: ButtonId) {
        self.feed(DeviceEvent::button(self.handle, button, true));
    }

    pub fn release(&self, button: ButtonId) {
        self.feed(DeviceEvent::button(self.handle, button, false));
    }

    /// Primary press and release.
    pub fn click(&self) {
        self.press(PRIMARY_BUTTON);
        self.release(PRIMARY_BUTTON);
    }

    pub fn connect(&self) {
        self.feed(DeviceEvent::connected(self.handle));
    }

    pub fn disconnect(&self) {
        self.feed(DeviceEvent::disconnected(self.handle));
    }
}

/// Polled virtual device.
pub struct VirtualDevice {
    id: String,
    name: String,
    handle: DeviceHandle,
    queue: Queue,
}

impl VirtualDevice {
    pub fn new(handle: DeviceHandle, name: &str) -> Self {
        Self {
            id: format!("virtual:{handle}"),
            name: name.to_string(),
            handle,
            queue: Queue::default(),
        }
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    /// Feed that queues into this device.
    pub fn feeder(&self) -> VirtualFeed {
        VirtualFeed {
            handle: self.handle,
            target: Target::Queue(Arc::clone(&self.queue)),
        }
    }
}

impl Device for VirtualDevice {
    fn poll(&mut self) -> Vec<DeviceEvent> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DeviceEventKind;

    #[test]
    fn poll_drains_in_order() {
        let mut dev = VirtualDevice::new(DeviceHandle::pointer(9), "virtual mouse");
        let feed = dev.feeder();
        feed.move_by(1.0, 2.0);
        feed.click();

        let events = dev.poll();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0].kind, DeviceEventKind::Motion { absolute: false, .. }));
        assert_eq!(events[2], DeviceEvent::button(DeviceHandle::pointer(9), 0, false));
        assert!(dev.poll().is_empty());
        assert_eq!(dev.id(), "virtual:pointer:0x9");
    }
}
