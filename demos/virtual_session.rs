//! Two virtual mice playing a tiny level: each pairs with a slot, possesses a
//! host, and one of them pulls a lever that opens a door through an AND gate
//! with a pressure plate.

use multimouse::backends::virtual_input::VirtualFeed;
use multimouse::{
    Candidate, Config, DeviceHandle, Door, GateKind, GateSpec, Lever, ObjectHandle, PressurePlate,
    Session, SignalLogger,
};
use std::rc::Rc;

const HOST_A: ObjectHandle = ObjectHandle(1);
const HOST_B: ObjectHandle = ObjectHandle(2);
const LEVER: ObjectHandle = ObjectHandle(3);

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut config = Config::default();
    config.gates.push(GateSpec {
        kind: GateKind::And,
        inverted: false,
        inputs: vec![1, 2],
        output: 3,
    });

    let mut session = Session::new(config);
    let lever = Rc::new(Lever::new(1));
    let plate = PressurePlate::new(2);
    let door = Door::new(3).attach(session.bus_mut());
    SignalLogger::new("demo").watch(session.bus_mut(), [1, 2, 3]);

    let caps = session.capabilities_mut();
    caps.register_host(HOST_A);
    caps.register_host(HOST_B);
    caps.register_interactable(LEVER, lever.clone());

    let alice = VirtualFeed::direct(DeviceHandle::pointer(0xA), session.hub().ingest_handle());
    let bob = VirtualFeed::direct(DeviceHandle::pointer(0xB), session.hub().ingest_handle());

    // Everyone stands next to everything; slot 1 is a bit closer to host B.
    let world = |origin: [f32; 3], _radius: f32| {
        let bias = origin[0];
        vec![
            Candidate {
                handle: HOST_A,
                distance: 0.2 + bias,
            },
            Candidate {
                handle: HOST_B,
                distance: 0.6 - bias,
            },
            Candidate {
                handle: LEVER,
                distance: 0.3,
            },
        ]
    };
    let origin_of = |slot: usize| [slot as f32 * 0.5, 0.0, 0.0];

    alice.click();
    bob.click();
    let report = session.step(&world, origin_of);
    println!("tick 1: {report:?}");

    // Bob stands on the plate, Alice pulls the lever.
    plate.update(session.bus_mut(), 80.0);
    alice.move_by(12.0, -3.0);
    alice.click();
    let report = session.step(&world, origin_of);
    println!("tick 2: {report:?}");
    println!("alice moved {:?}", session.take_motion(0));
    println!("door open: {}", door.is_open());

    bob.disconnect();
    let report = session.step(&world, origin_of);
    println!("tick 3: {report:?}");
    for cursor in session.cursors() {
        println!("{cursor:?}");
    }
}
