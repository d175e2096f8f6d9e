use crate::cargo::loading_modifier;
use crate::config::MIN_PAST_STATION_PENALTY;
use crate::ids::StationId;
use crate::objects::{VehicleType, CARGO_PASSENGERS, PASSENGER_COACH, STEAM_LOCOMOTIVE};
use crate::orders::Order;
use crate::stations::StationManager;
use crate::test_harness::TestNetwork;
use crate::vehicles::{Status, TransferSlot};
use crate::world::Pos3;

/// A side-6 loop with station A at its start and B halfway round. A holds
/// passengers that came from a far-off town; B pays for them.
fn two_station_loop(stock: u16) -> TestNetwork {
    TestNetwork::new()
        .with_loop(Pos3::new(0, 0, 0), 6)
        .with_station("A", Pos3::new(0, 0, 0), 0)
        .with_station("B", Pos3::new(-64, 224, 0), 2)
        .with_remote_station("Far", Pos3::new(3200, 0, 0))
        .with_stock("A", CARGO_PASSENGERS, stock, "Far")
        .with_acceptance("B", CARGO_PASSENGERS)
}

fn loading_at(net: &TestNetwork, index: usize, station: StationId) -> bool {
    let train = net.train(net.vehicle(index));
    train.head.status == Status::Loading && train.head.station == Some(station)
}

fn coach_load(net: &TestNetwork, index: usize) -> u8 {
    let train = net.train(net.vehicle(index));
    train.cargo(TransferSlot::Body(1)).map_or(0, |c| c.qty)
}

#[test]
fn test_passengers_carried_and_paid_for() {
    let mut net = two_station_loop(60);
    let (a, b) = (net.station("A"), net.station("B"));
    net = net
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 0, 0), 0)
        .with_orders(&[Order::StopAt(a), Order::StopAt(b)]);
    let train = net.vehicle(0);
    let cash_before = net.cash();

    net.tick_until(2000, |n| loading_at(n, 0, a));
    net.tick_until(2000, |n| n.cash() > cash_before);

    assert_eq!(net.station_stock("A", CARGO_PASSENGERS), 20, "a full coach left A");
    assert_eq!(coach_load(&net, 0), 0, "everything was dropped at B");
    let stations = net.resource::<StationManager>();
    assert!(stations.get(b).expect("B exists").has_been_visited_by(VehicleType::Train));
    assert!(net.train(train).veh2.cur_month_revenue > 0);
}

#[test]
fn test_wait_for_order_holds_train_until_full() {
    let mut net = two_station_loop(20);
    let (a, b) = (net.station("A"), net.station("B"));
    net = net
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 0, 0), 0)
        .with_orders(&[
            Order::StopAt(a),
            Order::WaitFor(CARGO_PASSENGERS),
            Order::StopAt(b),
        ]);
    let train = net.vehicle(0);

    net.tick_until(2000, |n| loading_at(n, 0, a));
    net.tick(600);
    net.assert_status(train, Status::Loading);
    assert_eq!(coach_load(&net, 0), 20);
    let parked = net.odometer(train);

    let far = net.station("Far");
    net.resource_mut::<StationManager>()
        .add_stock(a, CARGO_PASSENGERS, 30, far);
    net.tick_until(600, |n| n.status(train) != Status::Loading);

    assert_eq!(coach_load(&net, 0), 40);
    assert_eq!(net.station_stock("A", CARGO_PASSENGERS), 10);
    net.tick(100);
    assert!(net.odometer(train) > parked, "the full train left A");
}

#[test]
fn test_train_without_orders_calls_at_each_station() {
    let mut net = two_station_loop(60)
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 0, 0), 0);
    let (a, b) = (net.station("A"), net.station("B"));
    let cash_before = net.cash();

    net.tick_until(1000, |n| loading_at(n, 0, b));
    net.tick_until(1000, |n| loading_at(n, 0, a));
    net.tick_until(1000, |n| n.status(n.vehicle(0)) == Status::Travelling);
    assert_eq!(net.station_stock("A", CARGO_PASSENGERS), 20, "the coach filled up at A");

    net.tick_until(1000, |n| n.cash() > cash_before);
    assert_eq!(coach_load(&net, 0), 0, "B took the passengers");
}

#[test]
fn test_train_does_not_call_again_at_the_station_it_left() {
    let mut net = TestNetwork::new()
        .with_loop(Pos3::new(0, 0, 0), 6)
        .with_station("A", Pos3::new(0, 0, 0), 0)
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 0, 0), 0);
    let a = net.station("A");
    let train = net.vehicle(0);

    net.tick_until(1000, |n| loading_at(n, 0, a));
    net.tick_until(1000, |n| n.status(train) == Status::Travelling);
    let left_at = net.odometer(train);
    for _ in 0..1500 {
        net.tick(1);
        assert!(!matches!(net.status(train), Status::Loading | Status::Unloading));
    }
    net.assert_travelled_at_least(train, left_at + 2 * 24 * 256);
}

#[test]
fn test_express_train_passes_stations_without_orders() {
    let mut net = two_station_loop(60)
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 0, 0), 0);
    let train = net.vehicle(0);
    net.set_express_mode(train, true);

    for _ in 0..1500 {
        net.tick(1);
        assert!(!matches!(net.status(train), Status::Loading | Status::Unloading));
    }
    assert_eq!(net.station_stock("A", CARGO_PASSENGERS), 60);
}

#[test]
fn test_train_pulls_up_to_far_end_of_platform() {
    let mut net = TestNetwork::new()
        .with_loop(Pos3::new(0, 0, 0), 6)
        .with_station("A", Pos3::new(0, 0, 0), 0)
        .with_platform("A", Pos3::new(-32, 0, 0), 0)
        .with_platform("A", Pos3::new(-64, 0, 0), 0);
    let a = net.station("A");
    net = net
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 224, 0), 2)
        .with_orders(&[Order::StopAt(a)]);
    let train = net.vehicle(0);

    net.tick_until(1000, |n| n.status(train) == Status::Unloading);

    let t = net.train(train);
    assert_eq!(t.head.entry, Pos3::new(-64, 0, 0), "stopped on the last platform piece");
    assert_eq!(t.head.station, Some(a));
    let modifier = loading_modifier(net.resource(), t, TransferSlot::Body(1));
    assert_eq!(modifier, MIN_PAST_STATION_PENALTY, "the coach stands on the platform");
}

#[test]
fn test_lap_visits_both_stations_and_wraps_orders() {
    let mut net = two_station_loop(0);
    let (a, b) = (net.station("A"), net.station("B"));
    net = net
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 224, 0), 2)
        .with_orders(&[Order::StopAt(a), Order::StopAt(b)]);
    let train = net.vehicle(0);
    let first = net.train(train).head.orders.current_order;

    net.tick_until(1000, |n| n.train(n.vehicle(0)).head.last_stop == Some(a));
    assert_ne!(net.train(train).head.orders.current_order, first, "A's order is done");
    net.tick_until(1000, |n| n.train(n.vehicle(0)).head.last_stop == Some(b));

    assert_eq!(net.train(train).head.orders.current_order, 0, "back at StopAt A");
    let stations = net.resource::<StationManager>();
    for station in [a, b] {
        assert!(stations
            .get(station)
            .expect("station exists")
            .has_been_visited_by(VehicleType::Train));
    }
}
