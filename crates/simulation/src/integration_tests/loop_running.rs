use crate::companies::{AiThought, CompanyManager};
use crate::objects::{PASSENGER_COACH, STEAM_LOCOMOTIVE};
use crate::test_harness::TestNetwork;
use crate::vehicles::Status;
use crate::world::Pos3;

/// Distance over the straights of one lap of a side-6 loop. Curves add a
/// little on top, so this undercounts a lap.
const LAP_STRAIGHTS: u64 = 24 * 256;

#[test]
fn test_train_laps_a_loop() {
    let mut net = TestNetwork::new()
        .with_loop(Pos3::new(0, 0, 0), 6)
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 0, 0), 0);
    let train = net.vehicle(0);

    net.tick(1500);

    net.assert_travelled_at_least(train, 3 * LAP_STRAIGHTS);
    net.assert_status(train, Status::Travelling);
    assert_eq!(net.train(train).veh1.speed, 24, "cruising at the loco's top speed");
}

#[test]
fn test_train_occupies_pieces_it_spans() {
    let mut net = TestNetwork::new()
        .with_loop(Pos3::new(0, 0, 0), 6)
        .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(-64, 0, 0), 0);
    let id = net.vehicle(0);

    for _ in 0..40 {
        net.tick(25);
        let train = net.train(id);
        let pieces = train.occupied_pieces();
        assert!(!pieces.is_empty());
        assert!(
            pieces.len() <= 4,
            "a two-car train spans at most four pieces, got {}",
            pieces.len()
        );
        assert_eq!(pieces[0], (train.head.entry, train.head.connection));
    }
}

#[test]
fn test_train_shuttles_on_dead_end_line() {
    let mut net = TestNetwork::new()
        .with_straight_line(Pos3::new(0, 0, 0), 8)
        .with_train(&[STEAM_LOCOMOTIVE], Pos3::new(-96, 0, 0), 0);
    let train = net.vehicle(0);
    let start = net.train(train).direction().expect("placed").reversed;

    net.tick_until(400, |n| {
        n.train(train).direction().expect("placed").reversed != start
    });

    net.tick(2000);
    net.assert_none_stuck();
    net.assert_travelled_at_least(train, 4 * 8 * 256);
}

#[test]
fn test_train_on_lone_piece_gets_stuck_and_stays() {
    let mut net = TestNetwork::new()
        .with_straight_line(Pos3::new(0, 0, 0), 1)
        .with_train(&[STEAM_LOCOMOTIVE], Pos3::new(0, 0, 0), 0);
    let train = net.vehicle(0);

    net.tick_until(500, |n| n.status(train) == Status::Stuck);

    net.tick_days(20);
    net.assert_status(train, Status::Stuck);
    assert_eq!(net.vehicle_count(), 1, "player vehicles are never auto-sold");
}

#[test]
fn test_stop_command_brings_train_to_rest() {
    let mut net = TestNetwork::new()
        .with_loop(Pos3::new(0, 0, 0), 6)
        .with_train(&[STEAM_LOCOMOTIVE], Pos3::new(-64, 0, 0), 0);
    let train = net.vehicle(0);
    net.tick(200);

    net.stop_vehicle(train);
    net.tick(10);
    net.assert_status(train, Status::Stopped);
    let parked = net.odometer(train);

    net.tick(100);
    assert_eq!(net.odometer(train), parked);

    net.start_vehicle(train);
    net.tick(50);
    net.assert_status(train, Status::Travelling);
    assert!(net.odometer(train) > parked);
}

#[test]
fn test_stuck_ai_train_is_sold_off() {
    let mut net = TestNetwork::new()
        .with_company("Rival Rail", false, 1_000_000)
        .with_straight_line(Pos3::new(0, 0, 0), 1)
        .with_train(&[STEAM_LOCOMOTIVE], Pos3::new(0, 0, 0), 0);
    let (train, rival) = (net.vehicle(0), net.company());
    net.resource_mut::<CompanyManager>()
        .get_mut(rival)
        .expect("rival exists")
        .ai_thoughts
        .push(AiThought {
            vehicles: vec![train],
            revenue: 0,
        });
    net.tick_until(500, |n| n.status(train) == Status::Stuck);
    let cash_when_stuck = net.cash();

    net.tick_days(16);

    assert_eq!(net.vehicle_count(), 0, "AI owners sell vehicles stuck for 14 days");
    assert!(net.cash() > cash_when_stuck, "the sale refunded the rival");
    let companies = net.resource::<CompanyManager>();
    assert!(companies.get(rival).expect("rival").ai_thoughts[0].vehicles.is_empty());
}
