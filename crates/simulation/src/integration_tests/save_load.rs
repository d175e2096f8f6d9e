use crate::objects::{CARGO_PASSENGERS, PASSENGER_COACH, STEAM_LOCOMOTIVE};
use crate::orders::Order;
use crate::test_harness::TestNetwork;
use crate::vehicles::VehicleManager;
use crate::world::{Pos3, SignalSides};

fn delivery_loop() -> TestNetwork {
    let net = TestNetwork::new()
        .with_seed(5)
        .with_loop(Pos3::new(0, 0, 0), 6)
        .with_signal(Pos3::new(-192, 96, 0), 1, SignalSides::ONE_WAY)
        .with_station("A", Pos3::new(0, 0, 0), 0)
        .with_station("B", Pos3::new(-64, 224, 0), 2)
        .with_remote_station("Far", Pos3::new(3200, 0, 0))
        .with_stock("A", CARGO_PASSENGERS, 120, "Far")
        .with_acceptance("B", CARGO_PASSENGERS);
    let (a, b) = (net.station("A"), net.station("B"));
    net.with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 0, 0), 0)
        .with_orders(&[Order::StopAt(a), Order::WaitFor(CARGO_PASSENGERS), Order::StopAt(b)])
}

#[test]
fn test_loaded_game_continues_identically() {
    let mut original = delivery_loop();
    original.tick(1000);
    let blobs = original.save();

    let mut restored = TestNetwork::new();
    restored.load(&blobs);
    assert_eq!(restored.save(), blobs, "loading then saving is lossless");

    original.tick(1000);
    restored.tick(1000);
    assert_eq!(
        serde_json::to_value(restored.resource::<VehicleManager>()).expect("serialize"),
        serde_json::to_value(original.resource::<VehicleManager>()).expect("serialize"),
    );
    assert_eq!(restored.save(), original.save());
}

#[test]
fn test_load_restores_signal_claims() {
    let mut net = delivery_loop();
    let train = net.vehicle(0);
    net.tick_until(2000, |n| !n.train(train).head.signal_claims.is_empty());
    let blobs = net.save();

    let mut restored = TestNetwork::new();
    restored.load(&blobs);

    restored.assert_claims_occupied();
    restored.assert_signal_occupied(Pos3::new(-192, 96, 0), 1, true);
    assert_eq!(restored.odometer(train), net.odometer(train));
}
