use std::collections::HashSet;

use crate::config::{SimulationSettings, TRAIN_ONE_WAY_SIGNAL_TIMEOUT};
use crate::objects::{PASSENGER_COACH, STEAM_LOCOMOTIVE};
use crate::test_harness::TestNetwork;
use crate::vehicles::{Status, VehicleManager};
use crate::world::{Pos3, SignalSides};

/// One one-way signal on the third straight of every side of a side-6 loop,
/// as (origin, rotation).
const LOOP_SIGNALS: [((i32, i32), u8); 4] = [
    ((-64, 0), 0),
    ((-192, 96), 1),
    ((-96, 224), 2),
    ((32, 128), 3),
];

fn signalled_loop() -> TestNetwork {
    LOOP_SIGNALS.iter().fold(
        TestNetwork::new().with_loop(Pos3::new(0, 0, 0), 6),
        |net, &((x, y), rotation)| net.with_signal(Pos3::new(x, y, 0), rotation, SignalSides::ONE_WAY),
    )
}

fn occupied_loop_signals(net: &TestNetwork) -> usize {
    LOOP_SIGNALS
        .iter()
        .filter(|&&((x, y), rotation)| net.signal_occupied(Pos3::new(x, y, 0), rotation))
        .count()
}

// ====================================================================
// Loops
// ====================================================================

#[test]
fn test_lone_train_never_held_by_its_own_blocks() {
    let mut net = signalled_loop().with_train(
        &[STEAM_LOCOMOTIVE, PASSENGER_COACH],
        Pos3::new(-128, 0, 0),
        0,
    );
    let train = net.vehicle(0);

    for _ in 0..3000 {
        net.tick(1);
        assert_ne!(net.status(train), Status::WaitingAtSignal);
        net.assert_claims_occupied();
        assert_eq!(
            occupied_loop_signals(&net),
            net.train(train).head.signal_claims.len(),
            "only the blocks the train holds are occupied"
        );
    }
    net.assert_travelled_at_least(train, 2 * 24 * 256);
}

#[test]
fn test_two_trains_never_share_a_block() {
    let mut net = signalled_loop()
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-128, 0, 0), 0)
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 224, 0), 2);

    for _ in 0..4000 {
        net.tick(1);
        net.assert_claims_occupied();
        let mut seen = HashSet::new();
        for train in &net.resource::<VehicleManager>().trains {
            for claim in &train.head.signal_claims {
                assert!(
                    seen.insert(claim.signal),
                    "{:?} entered a block someone else holds",
                    train.head.id
                );
            }
        }
    }

    net.assert_none_stuck();
    for index in 0..2 {
        net.assert_travelled_at_least(net.vehicle(index), 2 * 24 * 256);
    }
}

// ====================================================================
// Held signals
// ====================================================================

/// A blocker parked just past the signal at (-160, 0) and a follower at the
/// head of the line that has run up to the signal and is waiting there.
fn held_follower(pieces: i32, settings: SimulationSettings) -> TestNetwork {
    let mut net = TestNetwork::new()
        .with_settings(settings)
        .with_straight_line(Pos3::new(0, 0, 0), pieces)
        .with_signal(Pos3::new(-160, 0, 0), 0, SignalSides::ONE_WAY)
        .with_train(&[STEAM_LOCOMOTIVE], Pos3::new(-96, 0, 0), 0)
        .with_stopped_train(&[STEAM_LOCOMOTIVE], Pos3::new(0, 0, 0), 0);
    let (blocker, follower) = (net.vehicle(0), net.vehicle(1));

    net.tick_until(300, |n| n.train(blocker).head.entry.x <= -192);
    net.stop_vehicle(blocker);
    net.tick(20);
    net.assert_status(blocker, Status::Stopped);
    net.assert_signal_occupied(Pos3::new(-160, 0, 0), 0, true);

    net.start_vehicle(follower);
    net.tick_until(400, |n| n.status(follower) == Status::WaitingAtSignal);
    net
}

#[test]
fn test_held_train_reverses_after_one_way_timeout() {
    let mut net = held_follower(12, SimulationSettings::default());
    let follower = net.vehicle(1);
    let facing = net.train(follower).direction().expect("placed").reversed;

    net.tick(TRAIN_ONE_WAY_SIGNAL_TIMEOUT as u32 - 20);
    net.assert_status(follower, Status::WaitingAtSignal);
    assert_eq!(net.train(follower).veh1.speed, 0);

    net.tick(30);
    assert_ne!(net.status(follower), Status::WaitingAtSignal);
    assert_ne!(
        net.train(follower).direction().expect("placed").reversed,
        facing,
        "the follower should have turned back"
    );
    net.assert_signal_occupied(Pos3::new(-160, 0, 0), 0, true);
}

#[test]
fn test_held_train_waits_forever_without_reversing() {
    let mut net = held_follower(
        12,
        SimulationSettings {
            trains_reverse_at_signals: false,
            ..SimulationSettings::default()
        },
    );
    let follower = net.vehicle(1);
    let held_at = net.odometer(follower);

    net.tick(2 * TRAIN_ONE_WAY_SIGNAL_TIMEOUT as u32);

    net.assert_status(follower, Status::WaitingAtSignal);
    assert_eq!(net.odometer(follower), held_at);
}

#[test]
fn test_held_train_proceeds_once_block_clears() {
    let mut net = held_follower(16, SimulationSettings::default());
    // Closes the block ahead of the blocker so it can leave the first one.
    net = net.with_signal(Pos3::new(-288, 0, 0), 0, SignalSides::ONE_WAY);
    let (blocker, follower) = (net.vehicle(0), net.vehicle(1));

    net.start_vehicle(blocker);
    let waited = net.tick_until(600, |n| n.status(follower) != Status::WaitingAtSignal);

    assert!(waited < TRAIN_ONE_WAY_SIGNAL_TIMEOUT as u32);
    net.assert_status(follower, Status::Travelling);
    net.tick(40);
    assert!(net.train(follower).head.entry.x <= -160, "the follower entered the freed block");
    net.assert_claims_occupied();
}
