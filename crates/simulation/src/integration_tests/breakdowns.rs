use crate::config::SimulationSettings;
use crate::objects::{PASSENGER_COACH, STEAM_LOCOMOTIVE};
use crate::test_harness::TestNetwork;
use crate::vehicles::{Breakdown, Status, VehicleManager};
use crate::world::Pos3;

fn looping_train() -> TestNetwork {
    TestNetwork::new()
        .with_loop(Pos3::new(0, 0, 0), 6)
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 0, 0), 0)
}

fn arm_loco_breakdown(net: &mut TestNetwork, days: u16) {
    let id = net.vehicle(0);
    let mut vehicles = net.resource_mut::<VehicleManager>();
    let train = vehicles.get_mut(id).expect("train exists");
    train.cars[0].front.breakdown_timer = days;
}

#[test]
fn test_broken_down_loco_halts_then_recovers() {
    let mut net = looping_train();
    let train = net.vehicle(0);
    arm_loco_breakdown(&mut net, 2);

    // Pending after day 2, broken down on day 3.
    net.tick_days(3);
    net.tick(1);
    net.assert_status(train, Status::BrokenDown);
    assert_eq!(net.train(train).veh1.speed, 0);
    let halted_at = net.odometer(train);

    net.tick_days(2);
    assert_eq!(net.odometer(train), halted_at, "a broken-down loco cannot move");

    // Five days after striking, on day 8.
    net.tick_days(3);
    assert_eq!(net.train(train).cars[0].front.breakdown, Breakdown::None);
    net.tick(60);
    net.assert_status(train, Status::Travelling);
    assert!(net.odometer(train) > halted_at);
}

#[test]
fn test_disabled_breakdowns_never_strike() {
    let mut net = TestNetwork::new()
        .with_settings(SimulationSettings {
            breakdowns_enabled: false,
            ..SimulationSettings::default()
        })
        .with_loop(Pos3::new(0, 0, 0), 6)
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 0, 0), 0);
    let train = net.vehicle(0);
    arm_loco_breakdown(&mut net, 2);

    net.tick_days(10);

    let loco = &net.train(train).cars[0].front;
    assert_eq!(loco.breakdown, Breakdown::None);
    assert_eq!(loco.breakdown_timer, 2, "the timer is frozen while disabled");
    net.assert_status(train, Status::Travelling);
}

#[test]
fn test_reliability_wears_down_daily() {
    let mut net = looping_train();
    let train = net.vehicle(0);
    let before = net.train(train).cars[0].front.reliability;

    net.tick_days(10);

    let after = net.train(train).cars[0].front.reliability;
    assert!(after < before, "reliability should decay: {before} -> {after}");
}
