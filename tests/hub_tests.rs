//! Integration tests for the device hub.
//!
//! Events go in through `HubIngest` exactly as a backend thread would push
//! them; assertions read the tick side.

use multimouse::backends::virtual_input::VirtualFeed;
use multimouse::{DeviceEvent, DeviceHandle, DeviceHub, HubError, HubSettings, SlotNotice, Vec2};
use std::cell::RefCell;
use std::rc::Rc;
use std::thread;

fn hub_with(slots: usize) -> DeviceHub {
    DeviceHub::new(HubSettings {
        slot_count: slots,
        ..Default::default()
    })
}

fn mouse(hub: &DeviceHub, raw: u64) -> VirtualFeed {
    VirtualFeed::direct(DeviceHandle::pointer(raw), hub.ingest_handle())
}

#[test]
fn unbound_device_is_ignored_until_primary_press() {
    let mut hub = hub_with(2);
    let m = mouse(&hub, 1);

    m.move_by(5.0, 5.0);
    m.press(1);
    m.release(1);
    assert!(!hub.is_bound(0));
    assert!(hub.dispatch_notices().is_empty());

    m.press(0);
    assert!(hub.is_bound(0));
    assert_eq!(hub.device(0), Some(DeviceHandle::pointer(1)));
    assert_eq!(hub.dispatch_notices(), vec![SlotNotice::Bound(0)]);

    // Motion from before pairing was dropped.
    let snap = hub.snapshot(0);
    assert_eq!(snap.delta(), Vec2::ZERO);
    assert!(snap.primary().pressed);
}

#[test]
fn snapshot_is_frame_coherent_until_clear() {
    let hub = hub_with(1);
    let m = mouse(&hub, 1);
    m.press(0);
    m.move_by(3.0, -2.0);

    let first = hub.snapshot(0);
    m.move_by(100.0, 100.0);
    m.release(0);
    let second = hub.snapshot(0);
    assert_eq!(first, second);
    assert_eq!(first.delta(), Vec2::new(3.0, -2.0));

    hub.clear(0);
    let next = hub.snapshot(0);
    assert_eq!(next.delta(), Vec2::new(100.0, 100.0));
    assert!(!next.primary().pressed);
    assert!(next.primary().released);
    assert!(!next.primary().held);

    hub.clear(0);
    let idle = hub.snapshot(0);
    assert_eq!(idle.delta(), Vec2::ZERO);
    assert!(!idle.primary().released);
}

#[test]
fn devices_take_distinct_slots_and_never_two() {
    let mut hub = hub_with(2);
    let a = mouse(&hub, 10);
    let b = mouse(&hub, 20);
    let c = mouse(&hub, 30);

    a.press(0);
    a.release(0);
    a.press(0);
    b.press(0);
    c.press(0);

    assert_eq!(hub.slot_of(DeviceHandle::pointer(10)), Some(0));
    assert_eq!(hub.slot_of(DeviceHandle::pointer(20)), Some(1));
    assert_eq!(hub.slot_of(DeviceHandle::pointer(30)), None);
    assert_eq!(
        hub.dispatch_notices(),
        vec![SlotNotice::Bound(0), SlotNotice::Bound(1)]
    );

    // Slot 1 input belongs to b only.
    a.move_by(1.0, 0.0);
    b.move_by(0.0, 7.0);
    assert_eq!(hub.snapshot(0).delta(), Vec2::new(1.0, 0.0));
    assert_eq!(hub.snapshot(1).delta(), Vec2::new(0.0, 7.0));
}

#[test]
fn disconnect_resets_slot_and_frees_it_for_the_next_device() {
    let mut hub = hub_with(1);
    let a = mouse(&hub, 1);
    let b = mouse(&hub, 2);

    a.press(0);
    a.move_by(4.0, 4.0);
    a.disconnect();

    assert!(!hub.is_bound(0));
    let snap = hub.snapshot(0);
    assert_eq!(snap.device, None);
    assert_eq!(snap.delta(), Vec2::ZERO);
    assert_eq!(snap.position(), Vec2::ZERO);
    assert!(!snap.primary().held);
    hub.clear(0);

    b.press(0);
    assert_eq!(hub.device(0), Some(DeviceHandle::pointer(2)));
    assert_eq!(
        hub.dispatch_notices(),
        vec![
            SlotNotice::Bound(0),
            SlotNotice::Unbound(0),
            SlotNotice::Bound(0)
        ]
    );
}

#[test]
fn disconnect_and_repair_wait_for_the_next_window() {
    let mut hub = hub_with(1);
    let a = mouse(&hub, 1);
    let b = mouse(&hub, 2);

    a.press(0);
    a.move_by(3.0, 4.0);
    let first = hub.snapshot(0);
    a.disconnect();
    b.press(0);
    b.move_by(1.0, 1.0);
    let second = hub.snapshot(0);
    assert_eq!(first, second);
    assert_eq!(second.device, Some(DeviceHandle::pointer(1)));
    assert_eq!(second.delta(), Vec2::new(3.0, 4.0));

    hub.clear(0);
    let next = hub.snapshot(0);
    assert_eq!(next.device, Some(DeviceHandle::pointer(2)));
    assert_eq!(next.delta(), Vec2::new(1.0, 1.0));
    assert_eq!(next.position(), Vec2::new(1.0, 1.0));
    assert!(next.primary().pressed);
    assert_eq!(
        hub.dispatch_notices(),
        vec![
            SlotNotice::Bound(0),
            SlotNotice::Unbound(0),
            SlotNotice::Bound(0)
        ]
    );
}

#[test]
fn non_finite_motion_is_dropped() {
    let hub = hub_with(1);
    let m = mouse(&hub, 1);
    m.press(0);
    m.move_by(f32::NAN, 2.0);
    m.move_by(1.0, f32::INFINITY);
    m.move_to(f32::NAN, f32::NAN);
    m.move_by(1.0, 1.0);

    let snap = hub.snapshot(0);
    assert_eq!(snap.delta(), Vec2::new(1.0, 1.0));
    assert_eq!(snap.position(), Vec2::new(1.0, 1.0));
}

#[test]
fn connect_does_not_pair() {
    let hub = hub_with(1);
    let m = mouse(&hub, 1);
    m.connect();
    assert!(!hub.is_bound(0));

    // Disconnect of a device that never paired is a no-op.
    m.disconnect();
    assert!(!hub.is_bound(0));
}

#[test]
fn motion_is_scaled_by_device_kind() {
    let hub = DeviceHub::new(HubSettings {
        slot_count: 2,
        pointer_scale: 2.0,
        controller_scale: 10.0,
        ..Default::default()
    });
    let m = mouse(&hub, 1);
    let pad = VirtualFeed::direct(DeviceHandle::controller(0), hub.ingest_handle());

    m.press(0);
    pad.press(0);
    m.move_by(1.0, -1.0);
    pad.move_by(0.5, 0.0);

    assert_eq!(hub.snapshot(0).delta(), Vec2::new(2.0, -2.0));
    assert_eq!(hub.snapshot(1).delta(), Vec2::new(5.0, 0.0));
}

#[test]
fn absolute_motion_accumulates_position() {
    let hub = hub_with(1);
    let tablet = mouse(&hub, 1);
    tablet.press(0);
    tablet.move_to(10.0, 10.0);
    hub.snapshot(0);
    hub.clear(0);

    tablet.move_to(12.0, 7.0);
    let snap = hub.snapshot(0);
    assert_eq!(snap.delta(), Vec2::new(2.0, -3.0));
    assert_eq!(snap.position(), Vec2::new(12.0, 7.0));
}

#[test]
fn out_of_range_reads_are_zeroed() {
    let hub = hub_with(2);
    assert!(matches!(
        hub.try_snapshot(5),
        Err(HubError::OutOfRange { index: 5, len: 2 })
    ));
    let snap = hub.snapshot(5);
    assert!(!snap.is_bound());
    assert_eq!(snap.delta(), Vec2::ZERO);
    assert!(!hub.is_bound(5));
    hub.clear(5);
    assert!(hub.try_clear(5).is_err());
}

#[test]
fn explicit_bind_and_release() {
    let mut hub = hub_with(2);
    let pad = DeviceHandle::controller(3);

    hub.try_bind(1, pad).expect("free slot");
    assert!(matches!(hub.try_bind(0, pad), Err(HubError::AlreadyBound(1))));
    assert!(!hub.bind(1, DeviceHandle::pointer(9)));

    assert_eq!(hub.release(1), Some(pad));
    assert!(matches!(hub.try_release(1), Err(HubError::Unbound(1))));
    assert_eq!(
        hub.dispatch_notices(),
        vec![SlotNotice::Bound(1), SlotNotice::Unbound(1)]
    );
}

#[test]
fn observers_run_in_order_on_dispatch_only() {
    let mut hub = hub_with(1);
    let log = Rc::new(RefCell::new(Vec::new()));

    let first = log.clone();
    let id = hub.subscribe(move |n| first.borrow_mut().push(("first", n)));
    let second = log.clone();
    hub.subscribe(move |n| second.borrow_mut().push(("second", n)));

    let m = mouse(&hub, 1);
    m.press(0);
    assert!(log.borrow().is_empty(), "observers must not run on ingestion");

    hub.dispatch_notices();
    assert_eq!(
        *log.borrow(),
        vec![("first", SlotNotice::Bound(0)), ("second", SlotNotice::Bound(0))]
    );

    assert!(hub.unsubscribe(id));
    assert!(!hub.unsubscribe(id));
    m.disconnect();
    hub.dispatch_notices();
    assert_eq!(log.borrow().last(), Some(&("second", SlotNotice::Unbound(0))));
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn ingestion_from_other_threads() {
    let hub = hub_with(4);
    let workers: Vec<_> = (0..4u64)
        .map(|i| {
            let ingest = hub.ingest_handle();
            thread::spawn(move || {
                let handle = DeviceHandle::pointer(100 + i);
                ingest.ingest(DeviceEvent::button(handle, 0, true));
                for _ in 0..50 {
                    ingest.ingest(DeviceEvent::motion(handle, 1.0, 0.0));
                }
            })
        })
        .collect();
    for w in workers {
        w.join().expect("worker");
    }

    let all = hub.snapshot_all();
    assert_eq!(all.bound_count(), 4);
    for snap in all.iter() {
        assert_eq!(snap.delta(), Vec2::new(50.0, 0.0));
    }
}
