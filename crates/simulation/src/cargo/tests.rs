use crate::companies::CompanyManager;
use crate::config::*;
use crate::errors::LastErrorText;
use crate::ids::{CompanyId, StationId, VehicleId};
use crate::objects::*;
use crate::orders::{Order, OrderTable};
use crate::sim_rng::SimRng;
use crate::stations::StationManager;
use crate::track::geometry::STRAIGHT;
use crate::track::PieceDirection;
use crate::vehicles::{SimContext, Status, TransferSlot, Train, VehicleManager};
use crate::world::{
    apply_mutation, Mutation, MutationFlags, NetworkKind, PiecePlacement, PieceRef, Pos3, TileWorld,
};

use super::*;

const WESTBOUND: PieceDirection = PieceDirection {
    id: STRAIGHT,
    reversed: false,
    rotation: 0,
};

/// A short line with a station on its first piece and a second station
/// 20 tiles away as the cargo origin, plus one purchased train standing in
/// the station.
struct Fixture {
    world: TileWorld,
    companies: CompanyManager,
    stations: StationManager,
    objects: ObjectRegistry,
    orders: OrderTable,
    rng: SimRng,
    settings: SimulationSettings,
    vehicles: VehicleManager,
    company: CompanyId,
    here: StationId,
    origin: StationId,
    train: VehicleId,
}

impl Fixture {
    fn new(cars: &[u16]) -> Self {
        let mut world = TileWorld::default();
        let mut companies = CompanyManager::default();
        let mut stations = StationManager::default();
        let objects = ObjectRegistry::default();
        let mut orders = OrderTable::default();
        let mut rng = SimRng::from_seed_u64(3);
        let mut vehicles = VehicleManager::default();

        let company = companies.add("Rail Co", true, 1_000_000);
        for i in 0..4 {
            world.place_piece(
                NetworkKind::Track,
                Pos3::new(-32 * i, 0, 0),
                PiecePlacement::new(STRAIGHT, 0, company, STANDARD_GAUGE),
            );
        }
        let here = stations.add("Here", company, Pos3::new(0, 0, 0));
        let origin = stations.add("Origin", company, Pos3::new(640, 0, 0));
        apply_mutation(
            &mut world,
            &mut companies,
            &objects,
            &Mutation::PlaceStation {
                kind: NetworkKind::Track,
                piece: PieceRef {
                    origin: Pos3::new(0, 0, 0),
                    piece_id: STRAIGHT,
                    rotation: 0,
                },
                station: here,
                company,
            },
            MutationFlags::APPLY,
            &mut LastErrorText::default(),
        )
        .expect("station placed");

        let train = vehicles
            .purchase(&objects, &mut companies, &mut orders, &mut rng, company, cars)
            .expect("train purchased");
        vehicles
            .place_on_network(&world, train, Pos3::new(0, 0, 0), WESTBOUND)
            .expect("train placed");

        Self {
            world,
            companies,
            stations,
            objects,
            orders,
            rng,
            settings: SimulationSettings::default(),
            vehicles,
            company,
            here,
            origin,
            train,
        }
    }

    fn run<R>(&mut self, f: impl FnOnce(&mut Train, &mut SimContext) -> R) -> R {
        let mut ctx = SimContext {
            world: &mut self.world,
            orders: &self.orders,
            stations: &mut self.stations,
            companies: &mut self.companies,
            objects: &self.objects,
            rng: &mut self.rng,
            settings: &self.settings,
            tick: 0,
            year: STARTING_YEAR,
        };
        let train = self.vehicles.get_mut(self.train).expect("train exists");
        f(train, &mut ctx)
    }

    fn train(&self) -> &Train {
        self.vehicles.get(self.train).expect("train exists")
    }

    fn train_mut(&mut self) -> &mut Train {
        self.vehicles.get_mut(self.train).expect("train exists")
    }

    fn cash(&self) -> i64 {
        self.companies.get(self.company).expect("company exists").cash
    }

    fn add_order(&mut self, order: Order) {
        let end = self.orders.ring(&self.train().head.orders).expect("ring").end_offset();
        self.vehicles
            .insert_order(&mut self.orders, self.train, self.company, end, order)
            .expect("order inserted");
    }

    /// Coach body carrying 40 passengers from `origin`, two days old.
    fn load_passengers(&mut self) {
        let origin = self.origin;
        let hold = &mut self.train_mut().cars[1].body.primary_cargo;
        hold.cargo_type = Some(CARGO_PASSENGERS);
        hold.qty = 40;
        hold.town_from = Some(origin);
        hold.num_days = 2;
    }

    fn unload_fully(&mut self) {
        self.run(|train, _| begin_unloading(train));
        for _ in 0..10_000 {
            if self.train().head.status != Status::Unloading {
                return;
            }
            self.run(update_unloading);
        }
        panic!("unloading never finished");
    }

    fn load_for(&mut self, ticks: u32) {
        self.run(|train, _| begin_loading(train));
        for _ in 0..ticks {
            if self.train().head.status != Status::Loading {
                return;
            }
            self.run(update_loading);
        }
    }
}

// =============================================================================
// Payment and timeouts
// =============================================================================

#[test]
fn test_payment_full_rate_while_fresh() {
    let objects = ObjectRegistry::default();
    let paid = calculate_delivered_cargo_payment(&objects, CARGO_PASSENGERS, 100, 100, 2);
    assert_eq!(paid, 120 * 100 * 100 / 4096, "fresh cargo pays the full factor");
}

#[test]
fn test_payment_never_rises_with_age_and_never_negative() {
    let objects = ObjectRegistry::default();
    let mut previous = i64::MAX;
    for days in 0..=255u8 {
        let paid = calculate_delivered_cargo_payment(&objects, CARGO_COAL, 50, 80, days);
        assert!(paid >= 0, "payment went negative at {days} days");
        assert!(paid <= previous, "payment rose at {days} days");
        previous = paid;
    }
    let fresh = calculate_delivered_cargo_payment(&objects, CARGO_COAL, 50, 80, 0);
    let stale = calculate_delivered_cargo_payment(&objects, CARGO_COAL, 50, 80, 200);
    assert!(stale < fresh, "old cargo should pay less");
}

#[test]
fn test_payment_for_unknown_cargo_is_zero() {
    let objects = ObjectRegistry::default();
    assert_eq!(calculate_delivered_cargo_payment(&objects, 31, 10, 10, 0), 0);
}

#[test]
fn test_transfer_timeout_zero_only_when_nothing_moved() {
    assert_eq!(transfer_timeout(32, 0, RAIL_PAST_STATION_PENALTY), 0);
    assert_eq!(transfer_timeout(1, 1, 1), 1, "a moved unit always takes a tick");
    let mut previous = 0;
    for qty in 1..=255u16 {
        let t = transfer_timeout(64, qty, RAIL_PAST_STATION_PENALTY);
        assert!(t >= previous, "timeout shrank at qty {qty}");
        previous = t;
    }
    assert_eq!(transfer_timeout(u16::MAX, u16::MAX, 12), u16::MAX, "timeout saturates");
}

#[test]
fn test_cars_past_the_platform_load_slower() {
    let mut fx = Fixture::new(&[STEAM_LOCOMOTIVE, PASSENGER_COACH]);
    assert_eq!(fx.train().head.station, Some(fx.here), "placed on the station piece");
    let on_platform = loading_modifier(&fx.world, fx.train(), TransferSlot::Body(1));
    assert_eq!(on_platform, MIN_PAST_STATION_PENALTY);

    fx.vehicles
        .place_on_network(&fx.world, fx.train, Pos3::new(-64, 0, 0), WESTBOUND)
        .expect("placed");
    let here = fx.here;
    fx.train_mut().head.station = Some(here);
    let past = loading_modifier(&fx.world, fx.train(), TransferSlot::Body(1));
    assert_eq!(past, RAIL_PAST_STATION_PENALTY);

    let t_on_platform = transfer_timeout(64, 20, on_platform);
    let t_past = transfer_timeout(64, 20, past);
    assert!(
        t_past > t_on_platform,
        "past the platform {t_past} should exceed on the platform {t_on_platform}"
    );
}

// =============================================================================
// Unloading
// =============================================================================

#[test]
fn test_unloading_pays_for_accepted_cargo() {
    let mut fx = Fixture::new(&[STEAM_LOCOMOTIVE, PASSENGER_COACH]);
    fx.stations.set_accepted(fx.here, CARGO_PASSENGERS, true);
    fx.load_passengers();
    let cash_before = fx.cash();

    fx.unload_fully();

    let expected = calculate_delivered_cargo_payment(&fx.objects, CARGO_PASSENGERS, 40, 20, 2);
    assert!(expected > 0);
    assert_eq!(fx.cash(), cash_before + expected, "revenue credited on completion");
    assert_eq!(fx.train().veh2.cur_month_revenue, expected);
    assert_eq!(fx.train().veh2.visit_revenue, 0, "visit revenue settled");
    assert_eq!(fx.train().cars[1].body.primary_cargo.qty, 0);
    let company = fx.companies.get(fx.company).expect("company");
    assert_eq!(company.cargo_units_delivered, 40);
    assert_eq!(company.cargo_income[CARGO_PASSENGERS as usize], expected);
    assert_eq!(fx.train().head.status, Status::Loading, "loading follows unloading");
}

#[test]
fn test_unaccepted_cargo_stays_aboard() {
    let mut fx = Fixture::new(&[STEAM_LOCOMOTIVE, PASSENGER_COACH]);
    fx.load_passengers();
    let cash_before = fx.cash();

    fx.unload_fully();

    assert_eq!(fx.train().cars[1].body.primary_cargo.qty, 40, "nobody wants it here");
    assert_eq!(fx.stations.get(fx.here).expect("station").stock(CARGO_PASSENGERS), 0);
    assert_eq!(fx.cash(), cash_before);
}

#[test]
fn test_unload_all_drops_cargo_into_station_stock() {
    let mut fx = Fixture::new(&[STEAM_LOCOMOTIVE, PASSENGER_COACH]);
    fx.add_order(Order::UnloadAll(CARGO_PASSENGERS));
    fx.load_passengers();

    fx.unload_fully();

    let stats = fx
        .stations
        .get(fx.here)
        .and_then(|s| s.cargo_stats(CARGO_PASSENGERS))
        .expect("stats")
        .clone();
    assert_eq!(stats.quantity, 40);
    assert_eq!(stats.origin, Some(fx.origin));
    assert_eq!(stats.enroute_age, 2, "first delivery keeps its age");
    assert_eq!(fx.train().cars[1].body.primary_cargo.qty, 0);
}

#[test]
fn test_unload_all_blends_age_with_existing_stock() {
    let mut fx = Fixture::new(&[STEAM_LOCOMOTIVE, PASSENGER_COACH]);
    fx.add_order(Order::UnloadAll(CARGO_PASSENGERS));
    {
        let stats = fx
            .stations
            .get_mut(fx.here)
            .and_then(|s| s.cargo_stats_mut(CARGO_PASSENGERS))
            .expect("stats");
        stats.quantity = 40;
        stats.enroute_age = 10;
    }
    fx.load_passengers();

    fx.unload_fully();

    let stats = fx
        .stations
        .get(fx.here)
        .and_then(|s| s.cargo_stats(CARGO_PASSENGERS))
        .expect("stats");
    assert_eq!(stats.quantity, 80);
    // (10 + 2) scaled by the share of old stock in the new total.
    assert_eq!(stats.enroute_age, 6);
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_loading_takes_station_stock_and_departs() {
    let mut fx = Fixture::new(&[STEAM_LOCOMOTIVE, PASSENGER_COACH]);
    fx.stations.add_stock(fx.here, CARGO_PASSENGERS, 25, fx.origin);
    if let Some(stats) = fx.stations.get_mut(fx.here).and_then(|s| s.cargo_stats_mut(CARGO_PASSENGERS)) {
        stats.enroute_age = 3;
    }

    fx.load_for(5_000);

    let hold = &fx.train().cars[1].body.primary_cargo;
    assert_eq!(hold.qty, 25);
    assert_eq!(hold.town_from, Some(fx.origin));
    assert_eq!(hold.num_days, 3, "picks up the stock's age");
    assert_eq!(fx.stations.get(fx.here).expect("station").stock(CARGO_PASSENGERS), 0);
    assert_eq!(fx.train().head.status, Status::Stopped, "departs once loaded");
}

#[test]
fn test_loading_picks_type_with_most_stock() {
    let mut fx = Fixture::new(&[STEAM_LOCOMOTIVE, GOODS_WAGON]);
    fx.stations.add_stock(fx.here, CARGO_COAL, 5, fx.origin);
    fx.stations.add_stock(fx.here, CARGO_GOODS, 12, fx.origin);

    fx.load_for(5_000);

    let hold = &fx.train().cars[1].body.primary_cargo;
    assert_eq!(hold.cargo_type, Some(CARGO_GOODS));
    assert_eq!(hold.qty, 12);
    assert_eq!(fx.stations.get(fx.here).expect("station").stock(CARGO_COAL), 5);
}

#[test]
fn test_wait_for_keeps_loading_until_full() {
    let mut fx = Fixture::new(&[STEAM_LOCOMOTIVE, PASSENGER_COACH]);
    fx.add_order(Order::WaitFor(CARGO_PASSENGERS));
    fx.stations.add_stock(fx.here, CARGO_PASSENGERS, 10, fx.origin);

    fx.load_for(3_000);

    assert_eq!(fx.train().head.status, Status::Loading, "still waiting for a full load");
    assert_eq!(fx.train().cars[1].body.primary_cargo.qty, 10);

    fx.stations.add_stock(fx.here, CARGO_PASSENGERS, 30, fx.origin);
    for _ in 0..5_000 {
        if fx.train().head.status != Status::Loading {
            break;
        }
        fx.run(update_loading);
    }
    assert_eq!(fx.train().cars[1].body.primary_cargo.qty, 40);
    assert_eq!(fx.train().head.status, Status::Stopped, "full, so it leaves");
}

#[test]
fn test_unload_all_suppresses_loading_that_type() {
    let mut fx = Fixture::new(&[STEAM_LOCOMOTIVE, PASSENGER_COACH]);
    fx.add_order(Order::UnloadAll(CARGO_PASSENGERS));
    fx.stations.add_stock(fx.here, CARGO_PASSENGERS, 25, fx.origin);

    fx.load_for(5_000);

    assert_eq!(fx.train().cars[1].body.primary_cargo.qty, 0);
    assert_eq!(fx.stations.get(fx.here).expect("station").stock(CARGO_PASSENGERS), 25);
}
