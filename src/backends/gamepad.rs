//! Cross-platform gamepads through `gilrs`.
//!
//! `Gilrs` is not `Send`, so it is created on the pump thread itself; the
//! outcome of `Gilrs::new()` is reported back before [`start`](InputBackend::start)
//! returns. Handles are `DeviceHandle::controller(GILRS_HANDLE_BASE + id)` so
//! they cannot collide with XInput user slots.

use crate::backends::stick_motion;
use crate::device::InputBackend;
use crate::error::BackendError;
use crate::event::{ButtonId, DeviceEvent, DeviceHandle};
use crate::hub::HubIngest;

use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// Offset added to gilrs ids.
pub const GILRS_HANDLE_BASE: u64 = 0x100;

fn handle_of(id: GamepadId) -> DeviceHandle {
    DeviceHandle::controller(GILRS_HANDLE_BASE + usize::from(id) as u64)
}

fn map_button(button: Button) -> Option<ButtonId> {
    match button {
        Button::South => Some(0),
        Button::East => Some(1),
        Button::West => Some(2),
        Button::North => Some(3),
        Button::LeftTrigger => Some(4),
        Button::RightTrigger => Some(5),
        Button::Select => Some(6),
        Button::Start => Some(7),
        _ => None,
    }
}

pub struct GamepadBackend {
    deadzone: f32,
    interval: Duration,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl GamepadBackend {
    pub fn new(deadzone: f32, interval: Duration) -> Self {
        Self {
            deadzone,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

impl InputBackend for GamepadBackend {
    fn name(&self) -> &'static str {
        "gamepad"
    }

    fn start(&mut self, sink: HubIngest) -> Result<(), BackendError> {
        if self.thread.is_some() {
            return Ok(());
        }
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::Release);
        let (deadzone, interval) = (self.deadzone, self.interval);

        let thread = thread::Builder::new()
            .name("gilrs".to_string())
            .spawn(move || {
                let gilrs = match Gilrs::new() {
                    Ok(g) => g,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                pump(gilrs, sink, &running, deadzone, interval);
            })
            .map_err(|source| BackendError::Thread {
                backend: "gamepad",
                source,
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("gilrs initialized");
                self.thread = Some(thread);
                Ok(())
            }
            Ok(Err(reason)) => {
                self.running.store(false, Ordering::Release);
                let _ = thread.join();
                Err(BackendError::Init {
                    backend: "gamepad",
                    reason,
                })
            }
            Err(_) => {
                self.running.store(false, Ordering::Release);
                let _ = thread.join();
                Err(BackendError::Init {
                    backend: "gamepad",
                    reason: "gilrs thread exited before reporting".into(),
                })
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("gilrs thread panicked");
            }
        }
    }
}

fn pump(mut gilrs: Gilrs, sink: HubIngest, running: &AtomicBool, deadzone: f32, interval: Duration) {
    // Last raw left-stick position per pad.
    let mut sticks: HashMap<GamepadId, (f32, f32)> = HashMap::new();

    for (id, pad) in gilrs.gamepads() {
        debug!(id = usize::from(id), name = pad.name(), "gamepad present");
        sink.ingest(DeviceEvent::connected(handle_of(id)));
    }

    while running.load(Ordering::Acquire) {
        while let Some(Event { id, event, .. }) = gilrs.next_event() {
            let handle = handle_of(id);
            match event {
                EventType::Connected => sink.ingest(DeviceEvent::connected(handle)),
                EventType::Disconnected => {
                    sticks.remove(&id);
                    sink.ingest(DeviceEvent::disconnected(handle));
                }
                EventType::ButtonPressed(button, _) => {
                    if let Some(b) = map_button(button) {
                        sink.ingest(DeviceEvent::button(handle, b, true));
                    }
                }
                EventType::ButtonReleased(button, _) => {
                    if let Some(b) = map_button(button) {
                        sink.ingest(DeviceEvent::button(handle, b, false));
                    }
                }
                EventType::AxisChanged(Axis::LeftStickX, value, _) => {
                    sticks.entry(id).or_default().0 = value;
                }
                EventType::AxisChanged(Axis::LeftStickY, value, _) => {
                    sticks.entry(id).or_default().1 = value;
                }
                _ => {}
            }
        }

        // A held stick keeps moving the cursor.
        for (&id, &(x, y)) in &sticks {
            if let Some((dx, dy)) = stick_motion(x, y, deadzone) {
                sink.ingest(DeviceEvent::motion(handle_of(id), dx, dy));
            }
        }

        thread::sleep(interval);
    }
    info!("gilrs thread exiting");
}
