//! Poll a set of [`Device`]s on a worker thread.

use crate::device::{Device, InputBackend};
use crate::error::BackendError;
use crate::hub::HubIngest;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Drives polled devices at a fixed interval and forwards their events.
pub struct PollingBackend {
    name: &'static str,
    devices: Vec<Box<dyn Device>>,
    interval: Duration,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<Vec<Box<dyn Device>>>>,
}

impl PollingBackend {
    pub fn new(name: &'static str, devices: Vec<Box<dyn Device>>, interval: Duration) -> Self {
        Self {
            name,
            devices,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Number of devices owned (0 while the worker holds them).
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

impl InputBackend for PollingBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn start(&mut self, sink: HubIngest) -> Result<(), BackendError> {
        if self.thread.is_some() {
            return Ok(());
        }
        let mut devices = std::mem::take(&mut self.devices);
        for dev in &devices {
            debug!(backend = self.name, id = dev.id(), name = dev.name(), "polling device");
        }
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::Release);
        let interval = self.interval;

        let thread = thread::Builder::new()
            .name(format!("{}-poll", self.name))
            .spawn(move || {
                while running.load(Ordering::Acquire) {
                    for dev in devices.iter_mut() {
                        sink.ingest_all(dev.poll());
                    }
                    thread::sleep(interval);
                }
                // Hand the devices back so a restart keeps their state.
                devices
            })
            .map_err(|source| BackendError::Thread {
                backend: self.name,
                source,
            })?;

        self.thread = Some(thread);
        info!(backend = self.name, interval_ms = interval.as_millis() as u64, "polling started");
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(devices) => self.devices = devices,
                Err(_) => tracing::error!(backend = self.name, "poll thread panicked"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_input::VirtualDevice;
    use crate::event::DeviceHandle;
    use crate::hub::{DeviceHub, HubSettings};
    use std::time::Instant;

    #[test]
    fn forwards_events_and_returns_devices_on_stop() {
        let mut hub = DeviceHub::new(HubSettings::default());
        let pad = VirtualDevice::new(DeviceHandle::controller(0), "virtual pad");
        let feed = pad.feeder();

        let mut backend = PollingBackend::new("virtual", vec![Box::new(pad)], Duration::from_millis(1));
        backend.start(hub.ingest_handle()).expect("start");
        assert!(backend.is_running());
        assert_eq!(backend.device_count(), 0);

        feed.press(0);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !hub.is_bound(0) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(hub.is_bound(0));

        backend.stop();
        backend.stop();
        assert!(!backend.is_running());
        assert_eq!(backend.device_count(), 1);
        assert_eq!(hub.dispatch_notices().len(), 1);
    }
}
