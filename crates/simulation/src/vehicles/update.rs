//! Per-tick entry point shared by every transport mode: the context a
//! vehicle update runs in, the view of the other vehicles it may consult,
//! arrival handling and journey bookkeeping.

use bevy::prelude::*;

use crate::cargo;
use crate::companies::CompanyManager;
use crate::config::*;
use crate::ids::StationId;
use crate::objects::{ObjectRegistry, TransportMode};
use crate::orders::{Order, OrderCursor, OrderTable};
use crate::signals::{Blocker, Traffic};
use crate::sim_rng::SimRng;
use crate::stations::StationManager;
use crate::track::connections::decode;
use crate::track::{PieceKey, RoadAndDirection, BASIC_RAD_MASK, BASIC_TAD_MASK};
use crate::world::{NetworkKind, Pos3, TilePos, TileWorld};

use super::train::Train;
use super::types::*;
use super::{air, movement};

/// Everything outside the vehicle list a vehicle update may touch.
pub struct SimContext<'a> {
    pub world: &'a mut TileWorld,
    pub orders: &'a OrderTable,
    pub stations: &'a mut StationManager,
    pub companies: &'a mut CompanyManager,
    pub objects: &'a ObjectRegistry,
    pub rng: &'a mut SimRng,
    pub settings: &'a SimulationSettings,
    pub tick: u64,
    pub year: u16,
}

// =============================================================================
// Other vehicles
// =============================================================================

/// The vehicle list around the one being updated, split so the current
/// vehicle can be borrowed mutably.
pub struct OtherVehicles<'a> {
    pub before: &'a [Train],
    pub after: &'a [Train],
    /// Network of the vehicle being updated; vehicles on the other network
    /// never block it.
    pub kind: Option<NetworkKind>,
}

impl<'a> OtherVehicles<'a> {
    pub fn new(before: &'a [Train], after: &'a [Train], kind: Option<NetworkKind>) -> Self {
        Self { before, after, kind }
    }

    fn same_network(&self) -> impl Iterator<Item = &'a Train> + '_ {
        self.before
            .iter()
            .chain(self.after.iter())
            .filter(move |t| t.head.placed && self.kind.is_some() && t.network_kind() == self.kind)
    }
}

impl Traffic for OtherVehicles<'_> {
    fn is_piece_occupied(&self, key: PieceKey) -> bool {
        self.same_network().any(|t| t.occupied_keys().contains(&key))
    }

    fn head_at(&self, entry: Pos3, tad: u16) -> bool {
        let mask = match self.kind {
            Some(NetworkKind::Road) => BASIC_RAD_MASK,
            _ => BASIC_TAD_MASK,
        };
        self.same_network()
            .any(|t| t.head.entry == entry && t.head.connection & mask == tad & mask)
    }

    fn road_blocker(&self, key: PieceKey, reversed: bool, overtaking: bool) -> Option<Blocker> {
        self.same_network().find_map(|t| {
            let dir = decode(NetworkKind::Road, t.head.connection);
            let lane = RoadAndDirection(t.head.connection).is_overtaking();
            let on_piece = PieceKey::new(t.head.entry, dir) == Some(key);
            (on_piece && dir.reversed == reversed && lane == overtaking).then_some(Blocker {
                stationary: t.veh1.speed == 0,
                waiting: t.head.status == Status::WaitingAtSignal,
            })
        })
    }

    fn train_on_tile(&self, tile: TilePos) -> bool {
        self.before
            .iter()
            .chain(self.after.iter())
            .filter(|t| t.head.placed && t.network_kind() == Some(NetworkKind::Track))
            .any(|t| t.occupied_keys().iter().any(|k| k.origin.tile() == tile))
    }
}

// =============================================================================
// Update
// =============================================================================

impl Train {
    /// Advance this vehicle by one tick.
    pub fn update(&mut self, ctx: &mut SimContext, traffic: &OtherVehicles) -> Flow {
        if !self.head.placed {
            if self.cars.is_empty() {
                self.tail.dangling_timeout = self.tail.dangling_timeout.saturating_add(1);
                if self.tail.dangling_timeout >= DANGLING_TRAIN_TIMEOUT {
                    info!("deleting dangling vehicle {:?}", self.head.id);
                    return Flow::Removed;
                }
            }
            return Flow::Continue;
        }
        if self.head.status.is_terminal() {
            return Flow::Continue;
        }

        match self.head.status {
            Status::Unloading => cargo::update_unloading(self, ctx),
            Status::Loading => cargo::update_loading(self, ctx),
            _ => match self.head.mode {
                TransportMode::Rail | TransportMode::Road => movement::update_land(self, ctx, traffic),
                TransportMode::Air => air::update_air(self, ctx),
                TransportMode::Water => air::update_water(self, ctx),
            },
        }
        Flow::Continue
    }

    /// Where the vehicle is, for journey and distance bookkeeping.
    pub fn world_position(&self) -> Pos3 {
        match self.head.mode {
            TransportMode::Rail | TransportMode::Road => self.head.entry,
            TransportMode::Air | TransportMode::Water => self.head.position,
        }
    }

    pub fn begin_new_journey(&mut self, tick: u64) {
        self.head.journey_start = self.world_position();
        self.head.journey_start_tick = tick;
    }

    /// Display status plus an optional second line.
    pub fn get_status(&self, orders: &OrderTable) -> (DisplayStatus, Option<DisplayStatus>) {
        let target = orders.target_station(&self.head.orders);
        let here = self.head.station;
        let primary = match self.head.status {
            Status::Stopped => DisplayStatus::Stopped,
            Status::Travelling if self.head.command_stop => DisplayStatus::Stopping,
            Status::Travelling => target.map_or(DisplayStatus::Travelling, DisplayStatus::TravellingTo),
            Status::Approaching => target.map_or(DisplayStatus::Travelling, DisplayStatus::ApproachingStation),
            Status::WaitingAtSignal => DisplayStatus::WaitingAtSignal,
            Status::Unloading => here.map_or(DisplayStatus::Stopped, DisplayStatus::UnloadingAt),
            Status::Loading => here.map_or(DisplayStatus::Stopped, DisplayStatus::LoadingAt),
            Status::BrokenDown => DisplayStatus::BrokenDown,
            Status::Crashed => DisplayStatus::Crashed,
            Status::Stuck => DisplayStatus::Stuck,
            Status::Landing => DisplayStatus::Landing,
            Status::Taxiing1 | Status::Taxiing2 => DisplayStatus::Taxiing,
            Status::TakingOff => DisplayStatus::TakingOff,
        };

        let secondary = match self.head.status {
            Status::Loading => leading_cargo_orders(orders, &self.head.orders)
                .into_iter()
                .find_map(|o| match o {
                    Order::WaitFor(cargo) => Some(DisplayStatus::WaitingForCargo(cargo)),
                    _ => None,
                }),
            Status::Travelling | Status::Approaching if self.veh2.is_broken_down => {
                Some(DisplayStatus::BrokenDown)
            }
            _ => None,
        };
        (primary, secondary)
    }
}

/// The cargo orders (`UnloadAll`/`WaitFor`) starting at the current order,
/// up to the first order of another kind.
pub fn leading_cargo_orders(orders: &OrderTable, cursor: &OrderCursor) -> Vec<Order> {
    let Ok(ring) = orders.ring(cursor) else {
        return Vec::new();
    };
    ring.iter()
        .map(|e| e.order)
        .take_while(|o| o.cargo().is_some())
        .collect()
}

/// Move the cursor past the current order.
pub fn skip_current_order(orders: &OrderTable, cursor: &mut OrderCursor) {
    let Ok(ring) = orders.ring(cursor) else {
        return;
    };
    let next = ring
        .current()
        .and_then(|current| ring.next_after(current.offset))
        .map(|e| e.offset);
    if let Some(next) = next {
        cursor.current_order = next;
    }
}

// =============================================================================
// Arrival
// =============================================================================

/// The vehicle has come to a halt at `station`.
pub fn arrive(train: &mut Train, ctx: &mut SimContext, station: StationId) {
    if let Some(st) = ctx.stations.get_mut(station) {
        st.mark_visited(train.head.vehicle_type);
    }
    ctx.orders.check_if_at_order_station(&mut train.head.orders, station);
    update_last_journey_average_speed(train, ctx);
    train.head.station = Some(station);
    train.head.last_stop = Some(station);
    train.veh1.speed = 0;
    cargo::begin_unloading(train);
}

/// Average speed over the journey just finished, weighted by transport mode
/// and capped at the vehicle's top speed. Feeds the owner's speed record.
pub fn update_last_journey_average_speed(train: &Train, ctx: &mut SimContext) {
    let mut ticks = ctx.tick.saturating_sub(train.head.journey_start_tick);
    if ticks == 0 {
        return;
    }
    let modifier = match train.head.mode {
        TransportMode::Rail | TransportMode::Road => AVERAGE_SPEED_MODIFIER_LAND,
        TransportMode::Air => AVERAGE_SPEED_MODIFIER_AIR,
        TransportMode::Water => AVERAGE_SPEED_MODIFIER_WATER,
    };
    let distance = train
        .head
        .journey_start
        .xy()
        .manhattan_distance(train.world_position().xy()) as u64;
    let mut scaled = distance * modifier as u64;
    while scaled > u32::MAX as u64 {
        scaled /= 2;
        ticks = (ticks / 2).max(1);
    }
    let speed = (scaled / ticks).min(train.veh2.max_speed as u64) as u16;
    if let Some(company) = ctx.companies.get_mut(train.head.owner) {
        if company.record_speed(train.head.mode, speed) {
            debug!("{:?} set a {:?} speed record of {}", train.head.id, train.head.mode, speed);
        }
    }
}
