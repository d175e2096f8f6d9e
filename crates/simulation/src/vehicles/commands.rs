//! Player and AI commands on vehicles: purchase, placement, sale, cloning,
//! manual reverse, start/stop and order editing.

use bevy::prelude::*;

use crate::companies::CompanyManager;
use crate::config::BREAKDOWN_TIMER_DISABLED;
use crate::errors::{ActionError, ActionResult};
use crate::ids::{CompanyId, Money, VehicleId};
use crate::objects::{ObjectRegistry, TransportMode};
use crate::orders::{Order, OrderTable};
use crate::signals::release_all;
use crate::sim_rng::SimRng;
use crate::track::connections::encode;
use crate::track::{find_entry_element, station_on_piece, PieceDirection};
use crate::world::{Pos3, TileWorld};

use super::lifecycle::next_breakdown_timer;
use super::movement;
use super::state::VehicleManager;
use super::train::Train;
use super::types::*;

impl VehicleManager {
    fn owned_mut(&mut self, id: VehicleId, by: CompanyId) -> ActionResult<&mut Train> {
        let train = self.get_mut(id).ok_or(ActionError::NotFound)?;
        if train.head.owner != by {
            return Err(ActionError::NotOwner);
        }
        Ok(train)
    }

    fn check_owner(&self, id: VehicleId, by: CompanyId) -> ActionResult<()> {
        let train = self.get(id).ok_or(ActionError::NotFound)?;
        if train.head.owner != by {
            return Err(ActionError::NotOwner);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Purchase
    // -------------------------------------------------------------------------

    /// Buy a vehicle made of `object_ids` (one per car, front first). It
    /// starts unplaced, stopped and with an empty order list.
    #[allow(clippy::too_many_arguments)]
    pub fn purchase(
        &mut self,
        objects: &ObjectRegistry,
        companies: &mut CompanyManager,
        orders: &mut OrderTable,
        rng: &mut SimRng,
        owner: CompanyId,
        object_ids: &[u16],
    ) -> ActionResult<VehicleId> {
        let mut defs = Vec::with_capacity(object_ids.len());
        for &object_id in object_ids {
            let def = objects
                .vehicle(object_id)
                .ok_or_else(|| ActionError::InvalidParameter(format!("unknown vehicle object {object_id}")))?;
            defs.push((object_id, def));
        }
        let Some(&(_, lead)) = defs.first() else {
            return Err(ActionError::InvalidParameter("a vehicle needs at least one car".into()));
        };
        if defs.iter().any(|(_, d)| d.mode != lead.mode) {
            return Err(ActionError::InvalidParameter("cars of different transport modes".into()));
        }
        if lead.mode != TransportMode::Rail && defs.len() != 1 {
            return Err(ActionError::InvalidParameter("only trains take more than one car".into()));
        }

        let cost: Money = defs.iter().map(|(_, d)| d.cost).sum();
        companies.can_afford(owner, cost)?;
        let cursor = orders.allocate()?;
        companies.charge(owner, cost)?;

        let id = self.allocate_id();
        let cars = defs
            .iter()
            .map(|&(object_id, def)| {
                let breakdown_timer = if def.base_reliability == 0 {
                    BREAKDOWN_TIMER_DISABLED
                } else {
                    next_breakdown_timer(def.base_reliability, rng.next_u16())
                };
                Car {
                    front: FrontBogie {
                        object_id,
                        reliability: def.base_reliability,
                        breakdown_timer,
                        breakdown: Breakdown::None,
                        refund_cost: def.cost,
                        secondary_cargo: VehicleCargo::with_capacity(def.secondary_cargo),
                        pending_transfer: false,
                    },
                    back: BackBogie::default(),
                    body: Body {
                        object_id,
                        length: def.length,
                        primary_cargo: VehicleCargo::with_capacity(def.primary_cargo),
                        pending_transfer: false,
                    },
                }
            })
            .collect();

        let head = VehicleHead {
            id,
            owner,
            mode: lead.mode,
            vehicle_type: lead.vehicle_type,
            status: Status::Stopped,
            orders: cursor,
            network_object: lead.network_object,
            required_mods: defs.iter().fold(0, |mods, (_, d)| mods | d.required_mods),
            placed: false,
            entry: Pos3::default(),
            connection: 0,
            progress: 0,
            position: Pos3::default(),
            station: None,
            last_stop: None,
            command_stop: true,
            routing: RoutingRing::default(),
            signal_claims: Vec::new(),
            recent_signals: Vec::new(),
            cargo_transfer_timeout: 0,
            air_timer: 0,
            crash_timer: 0,
            stopped_days: 0,
            journey_start: Pos3::default(),
            journey_start_tick: 0,
        };
        let mut train = Train {
            head,
            veh1: Vehicle1::default(),
            veh2: Vehicle2::default(),
            cars,
            tail: Tail::default(),
        };
        train.recompute_totals(objects);
        self.trains.push(train);
        info!("company {:?} bought vehicle {:?} for {}", owner, id, cost);
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Placement
    // -------------------------------------------------------------------------

    /// Put a rail or road vehicle on the piece entered at `entry` with `dir`.
    pub fn place_on_network(
        &mut self,
        world: &TileWorld,
        id: VehicleId,
        entry: Pos3,
        dir: PieceDirection,
    ) -> ActionResult<()> {
        let train = self.get_mut(id).ok_or(ActionError::NotFound)?;
        let kind = train
            .network_kind()
            .ok_or_else(|| ActionError::InvalidParameter("vehicle does not run on a network".into()))?;
        if find_entry_element(world, kind, entry, dir).is_none() {
            return Err(ActionError::NoTrackHere);
        }
        train.place(entry, encode(kind, dir.id, dir.reversed, dir.rotation));
        train.head.position = entry;
        train.head.station = station_on_piece(world, kind, entry, dir);
        Ok(())
    }

    /// Put an aircraft or ship at a free position.
    pub fn place_at(&mut self, id: VehicleId, position: Pos3) -> ActionResult<()> {
        let train = self.get_mut(id).ok_or(ActionError::NotFound)?;
        if train.network_kind().is_some() {
            return Err(ActionError::InvalidParameter("vehicle runs on a network".into()));
        }
        train.head.position = position;
        train.head.journey_start = position;
        train.head.placed = true;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Sale and cloning
    // -------------------------------------------------------------------------

    /// Sell a vehicle: give back its blocks and orders and refund what its
    /// cars are still worth. Returns the refund.
    pub fn sell(
        &mut self,
        world: &mut TileWorld,
        orders: &mut OrderTable,
        companies: &mut CompanyManager,
        id: VehicleId,
        by: CompanyId,
    ) -> ActionResult<Money> {
        self.check_owner(id, by)?;
        orders.free_orders(self, id)?;
        let index = self.index_of(id).ok_or(ActionError::NotFound)?;
        let mut train = self.trains.remove(index);

        release_all(world, &mut train.head.signal_claims, &mut train.head.recent_signals);
        let refund: Money = train.cars.iter().map(|c| c.front.refund_cost).sum();
        companies.apply_payment(train.head.owner, refund);
        if let Some(company) = companies.get_mut(train.head.owner) {
            company.remove_vehicle_from_thoughts(id);
        }
        info!("vehicle {:?} sold for {}", id, refund);
        Ok(refund)
    }

    /// Buy a copy of `source` with the same cars and its own copy of the
    /// orders, placed where the source stands.
    #[allow(clippy::too_many_arguments)]
    pub fn clone_vehicle(
        &mut self,
        world: &TileWorld,
        objects: &ObjectRegistry,
        companies: &mut CompanyManager,
        orders: &mut OrderTable,
        rng: &mut SimRng,
        source: VehicleId,
        by: CompanyId,
    ) -> ActionResult<VehicleId> {
        self.check_owner(source, by)?;
        let (object_ids, placement) = {
            let train = self.get(source).ok_or(ActionError::NotFound)?;
            let object_ids: Vec<u16> = train.cars.iter().map(|c| c.body.object_id).collect();
            let placement = train
                .head
                .placed
                .then(|| (train.head.entry, train.direction(), train.head.position));
            (object_ids, placement)
        };

        let id = self.purchase(objects, companies, orders, rng, by, &object_ids)?;
        orders.clone_orders(self, source, id)?;
        match placement {
            Some((entry, Some(dir), _)) => self.place_on_network(world, id, entry, dir)?,
            Some((_, None, position)) => self.place_at(id, position)?,
            None => {}
        }
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Driving commands
    // -------------------------------------------------------------------------

    /// Turn a rail or road vehicle around on the spot. Clears a stuck state.
    pub fn reverse(&mut self, world: &mut TileWorld, id: VehicleId, by: CompanyId) -> ActionResult<()> {
        let train = self.owned_mut(id, by)?;
        if !train.head.placed {
            return Err(ActionError::VehicleNotPlaced);
        }
        if train.network_kind().is_none() {
            return Err(ActionError::InvalidParameter("only rail and road vehicles reverse".into()));
        }
        if matches!(train.head.status, Status::Stuck | Status::WaitingAtSignal) {
            train.head.status = Status::Travelling;
        }
        train.veh1.reversals_without_progress = 0;
        if !movement::reverse(train, world) {
            return Err(ActionError::NoTrackHere);
        }
        train.veh1.reversals_without_progress = 0;
        Ok(())
    }

    pub fn start(&mut self, id: VehicleId, by: CompanyId) -> ActionResult<()> {
        let train = self.owned_mut(id, by)?;
        if train.head.status == Status::Stuck {
            return Err(ActionError::VehicleStuck);
        }
        train.head.command_stop = false;
        train.head.stopped_days = 0;
        Ok(())
    }

    pub fn stop(&mut self, id: VehicleId, by: CompanyId) -> ActionResult<()> {
        self.owned_mut(id, by)?.head.command_stop = true;
        Ok(())
    }

    /// With express mode on the vehicle passes every station it has no
    /// order for.
    pub fn set_express_mode(&mut self, id: VehicleId, by: CompanyId, express: bool) -> ActionResult<()> {
        self.owned_mut(id, by)?.veh1.express_mode = express;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    pub fn insert_order(
        &mut self,
        orders: &mut OrderTable,
        id: VehicleId,
        by: CompanyId,
        offset: u16,
        order: Order,
    ) -> ActionResult<()> {
        self.check_owner(id, by)?;
        let result = orders.insert_order(self, id, offset, order);
        if let Err(e) = &result {
            warn!("rejected order insertion for {:?}: {:?}", id, e);
        }
        result
    }

    pub fn delete_order(
        &mut self,
        orders: &mut OrderTable,
        id: VehicleId,
        by: CompanyId,
        offset: u16,
    ) -> ActionResult<()> {
        self.check_owner(id, by)?;
        orders.delete_order(self, id, offset)
    }

    pub fn swap_orders(
        &mut self,
        orders: &mut OrderTable,
        id: VehicleId,
        by: CompanyId,
        offset: u16,
    ) -> ActionResult<u16> {
        self.check_owner(id, by)?;
        orders.swap_adjacent_orders(self, id, offset)
    }
}
