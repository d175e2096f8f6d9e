//! Builder methods for track, station, signal and vehicle setup in
//! integration tests.

use bevy::ecs::system::SystemState;
use bevy::prelude::*;

use crate::companies::CompanyManager;
use crate::config::SimulationSettings;
use crate::errors::LastErrorText;
use crate::ids::{CargoId, Money, StationId, VehicleId};
use crate::objects::{ObjectRegistry, STANDARD_GAUGE};
use crate::orders::{Order, OrderTable};
use crate::sim_rng::SimRng;
use crate::stations::StationManager;
use crate::track::geometry::{SMALL_RIGHT_CURVE, STRAIGHT};
use crate::track::{connection_end, PieceDirection};
use crate::vehicles::VehicleManager;
use crate::world::{
    apply_mutation, Mutation, MutationFlags, NetworkKind, PiecePlacement, PieceRef, Pos3,
    SignalSides, TileWorld,
};

use super::TestNetwork;

type MutationParams<'w> = (
    ResMut<'w, TileWorld>,
    ResMut<'w, CompanyManager>,
    Res<'w, ObjectRegistry>,
    ResMut<'w, LastErrorText>,
);

type PurchaseParams<'w> = (
    ResMut<'w, VehicleManager>,
    Res<'w, TileWorld>,
    Res<'w, ObjectRegistry>,
    ResMut<'w, CompanyManager>,
    ResMut<'w, OrderTable>,
    ResMut<'w, SimRng>,
);

fn forward(id: u8, rotation: u8) -> PieceDirection {
    PieceDirection {
        id,
        reversed: false,
        rotation,
    }
}

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Reseed the simulation RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.app.world_mut().insert_resource(SimRng::from_seed_u64(seed));
        self
    }

    pub fn with_settings(mut self, settings: SimulationSettings) -> Self {
        self.app.world_mut().insert_resource(settings);
        self
    }

    /// Add a company and make it the owner of everything built after this.
    pub fn with_company(mut self, name: &str, is_player: bool, cash: Money) -> Self {
        self.company = self
            .app
            .world_mut()
            .resource_mut::<CompanyManager>()
            .add(name, is_player, cash);
        self
    }

    // -----------------------------------------------------------------------
    // Track
    // -----------------------------------------------------------------------

    /// Lay `pieces` straights heading west (rotation 0) from `origin`.
    pub fn with_straight_line(mut self, origin: Pos3, pieces: i32) -> Self {
        let company = self.company;
        let mut world = self.app.world_mut().resource_mut::<TileWorld>();
        for i in 0..pieces {
            world.place_piece(
                NetworkKind::Track,
                Pos3::new(origin.x - 32 * i, origin.y, origin.z),
                PiecePlacement::new(STRAIGHT, 0, company, STANDARD_GAUGE),
            );
        }
        self
    }

    /// Lay a clockwise loop starting at `origin` heading west: four sides of
    /// `side` straights, each followed by a small right curve.
    pub fn with_loop(mut self, origin: Pos3, side: u32) -> Self {
        let company = self.company;
        let mut world = self.app.world_mut().resource_mut::<TileWorld>();
        let mut at = origin;
        for rotation in 0..4u8 {
            let pieces = std::iter::repeat(STRAIGHT)
                .take(side as usize)
                .chain(std::iter::once(SMALL_RIGHT_CURVE));
            for id in pieces {
                world.place_piece(
                    NetworkKind::Track,
                    at,
                    PiecePlacement::new(id, rotation, company, STANDARD_GAUGE),
                );
                at = connection_end(at, forward(id, rotation))
                    .expect("loop pieces have geometry")
                    .0;
            }
        }
        assert_eq!(at, origin, "loop should close on itself");
        self
    }

    // -----------------------------------------------------------------------
    // Stations and signals
    // -----------------------------------------------------------------------

    /// Register a station and put it on the straight at `origin`.
    pub fn with_station(mut self, name: &str, origin: Pos3, rotation: u8) -> Self {
        let company = self.company;
        self.app
            .world_mut()
            .resource_mut::<StationManager>()
            .add(name, company, origin);
        self.with_platform(name, origin, rotation)
    }

    /// Extend station `name` onto the straight at `origin`.
    pub fn with_platform(mut self, name: &str, origin: Pos3, rotation: u8) -> Self {
        let company = self.company;
        let station = self.station(name);
        self.mutate(Mutation::PlaceStation {
            kind: NetworkKind::Track,
            piece: PieceRef {
                origin,
                piece_id: STRAIGHT,
                rotation,
            },
            station,
            company,
        });
        self
    }

    /// Register a station with no track of its own, e.g. a far-away origin
    /// for stock.
    pub fn with_remote_station(mut self, name: &str, pos: Pos3) -> Self {
        let company = self.company;
        self.app
            .world_mut()
            .resource_mut::<StationManager>()
            .add(name, company, pos);
        self
    }

    /// Make station `name` accept `cargo` for payment.
    pub fn with_acceptance(mut self, name: &str, cargo: CargoId) -> Self {
        let station = self.station(name);
        self.app
            .world_mut()
            .resource_mut::<StationManager>()
            .set_accepted(station, cargo, true);
        self
    }

    /// Put `qty` units of `cargo` that came from `from` into `name`'s stock.
    pub fn with_stock(mut self, name: &str, cargo: CargoId, qty: u16, from: &str) -> Self {
        let (station, origin) = (self.station(name), self.station(from));
        self.app
            .world_mut()
            .resource_mut::<StationManager>()
            .add_stock(station, cargo, qty, origin);
        self
    }

    /// Signal the straight at `origin`.
    pub fn with_signal(mut self, origin: Pos3, rotation: u8, sides: SignalSides) -> Self {
        let company = self.company;
        self.mutate(Mutation::PlaceSignal {
            piece: PieceRef {
                origin,
                piece_id: STRAIGHT,
                rotation,
            },
            sides,
            object_id: STANDARD_GAUGE,
            company,
        });
        self
    }

    fn mutate(&mut self, mutation: Mutation) {
        let world = self.app.world_mut();
        let mut state: SystemState<MutationParams> = SystemState::new(world);
        let (mut tiles, mut companies, objects, mut last_error) = state.get_mut(world);
        apply_mutation(
            &mut tiles,
            &mut companies,
            &objects,
            &mutation,
            MutationFlags::APPLY,
            &mut last_error,
        )
        .unwrap_or_else(|e| panic!("{mutation:?} failed: {e:?}"));
    }

    // -----------------------------------------------------------------------
    // Vehicles
    // -----------------------------------------------------------------------

    /// Buy a train of `cars`, put it on the straight entered at `entry` with
    /// `rotation`, and start it.
    pub fn with_train(mut self, cars: &[u16], entry: Pos3, rotation: u8) -> Self {
        let id = self.buy_and_place(cars, entry, rotation);
        self.start_vehicle(id);
        self
    }

    /// Like `with_train` but the train is left standing with its stop
    /// command set.
    pub fn with_stopped_train(mut self, cars: &[u16], entry: Pos3, rotation: u8) -> Self {
        self.buy_and_place(cars, entry, rotation);
        self
    }

    fn buy_and_place(&mut self, cars: &[u16], entry: Pos3, rotation: u8) -> VehicleId {
        let company = self.company;
        let world = self.app.world_mut();
        let mut state: SystemState<PurchaseParams> = SystemState::new(world);
        let (mut vehicles, tiles, objects, mut companies, mut orders, mut rng) = state.get_mut(world);

        let id = vehicles
            .purchase(&objects, &mut companies, &mut orders, &mut rng, company, cars)
            .expect("test company can afford the train");
        vehicles
            .place_on_network(&tiles, id, entry, forward(STRAIGHT, rotation))
            .expect("train placed on track");
        self.vehicles.push(id);
        id
    }

    /// Append `orders` to the most recently added vehicle.
    pub fn with_orders(mut self, orders: &[Order]) -> Self {
        let company = self.company;
        let id = *self.vehicles.last().expect("add a train before its orders");
        let world = self.app.world_mut();
        let mut state: SystemState<(ResMut<VehicleManager>, ResMut<OrderTable>)> = SystemState::new(world);
        let (mut vehicles, mut table) = state.get_mut(world);

        let mut offset = 0u16;
        for order in orders {
            vehicles
                .insert_order(&mut table, id, company, offset, *order)
                .unwrap_or_else(|e| panic!("inserting {order:?} failed: {e:?}"));
            offset += order.size() as u16;
        }
        table.advance_to_next_routable_order(
            &mut vehicles.get_mut(id).expect("vehicle exists").head.orders,
        );
        self
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    pub fn start_vehicle(&mut self, id: VehicleId) {
        let company = self.company;
        self.resource_mut::<VehicleManager>()
            .start(id, company)
            .unwrap_or_else(|e| panic!("starting {id:?} failed: {e:?}"));
    }

    pub fn set_express_mode(&mut self, id: VehicleId, express: bool) {
        let company = self.company;
        self.resource_mut::<VehicleManager>()
            .set_express_mode(id, company, express)
            .unwrap_or_else(|e| panic!("setting express mode on {id:?} failed: {e:?}"));
    }

    pub fn stop_vehicle(&mut self, id: VehicleId) {
        let company = self.company;
        self.resource_mut::<VehicleManager>()
            .stop(id, company)
            .unwrap_or_else(|e| panic!("stopping {id:?} failed: {e:?}"));
    }

    /// Look up a station id by name.
    pub fn station(&self, name: &str) -> StationId {
        self.resource::<StationManager>()
            .stations
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .unwrap_or_else(|| panic!("no station named {name}"))
    }
}
