//! Query and simulation-tick methods for `TestNetwork`.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::calendar::TickCounter;
use crate::companies::CompanyManager;
use crate::config::TICKS_PER_DAY;
use crate::ids::{CargoId, CompanyId, Money, VehicleId};
use crate::signals::{signal_state, SignalRef, SignalStateFlags};
use crate::stations::StationManager;
use crate::track::geometry::STRAIGHT;
use crate::track::PieceDirection;
use crate::vehicles::{Status, Train, VehicleManager};
use crate::world::{Pos3, TileWorld};
use crate::SaveableRegistry;

use super::TestNetwork;

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run N fixed-update ticks by directly executing the `FixedUpdate`
    /// schedule. This bypasses Bevy's time system entirely, so `MinimalPlugins`
    /// never has to advance virtual time between updates.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    /// Tick until `done` holds, at most `limit` ticks. Returns the ticks run.
    pub fn tick_until(&mut self, limit: u32, done: impl Fn(&TestNetwork) -> bool) -> u32 {
        for ran in 0..limit {
            if done(self) {
                return ran;
            }
            self.tick(1);
        }
        assert!(done(self), "condition not reached within {limit} ticks");
        limit
    }

    pub fn tick_days(&mut self, days: u32) {
        self.tick(days * TICKS_PER_DAY);
    }

    pub fn current_tick(&self) -> u64 {
        self.resource::<TickCounter>().0
    }

    // -----------------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn resource_mut<T: Resource>(&mut self) -> Mut<'_, T> {
        self.app.world_mut().resource_mut::<T>()
    }

    // -----------------------------------------------------------------------
    // Companies and stations
    // -----------------------------------------------------------------------

    pub fn company(&self) -> CompanyId {
        self.company
    }

    pub fn cash(&self) -> Money {
        self.resource::<CompanyManager>()
            .get(self.company)
            .map_or(0, |c| c.cash)
    }

    pub fn station_stock(&self, name: &str, cargo: CargoId) -> u16 {
        let id = self.station(name);
        self.resource::<StationManager>()
            .get(id)
            .map_or(0, |s| s.stock(cargo))
    }

    /// Whether the signal guarding entry into the straight at `origin`
    /// (travelling with `rotation`) is occupied.
    pub fn signal_occupied(&self, origin: Pos3, rotation: u8) -> bool {
        let world = self.resource::<TileWorld>();
        let dir = PieceDirection {
            id: STRAIGHT,
            reversed: false,
            rotation,
        };
        let signal = SignalRef::on_piece(world, origin, dir)
            .unwrap_or_else(|| panic!("no signal on the straight at {origin:?}"));
        signal_state(world, &signal).contains(SignalStateFlags::OCCUPIED)
    }

    // -----------------------------------------------------------------------
    // Vehicles
    // -----------------------------------------------------------------------

    /// Id of the `index`-th vehicle bought through the builder.
    pub fn vehicle(&self, index: usize) -> VehicleId {
        self.vehicles[index]
    }

    pub fn vehicle_count(&self) -> usize {
        self.resource::<VehicleManager>().len()
    }

    pub fn train(&self, id: VehicleId) -> &Train {
        self.resource::<VehicleManager>()
            .get(id)
            .unwrap_or_else(|| panic!("vehicle {id:?} no longer exists"))
    }

    pub fn status(&self, id: VehicleId) -> Status {
        self.train(id).head.status
    }

    pub fn odometer(&self, id: VehicleId) -> u64 {
        self.train(id).veh1.odometer
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Every saveable resource as its blob.
    pub fn save(&mut self) -> BTreeMap<String, Vec<u8>> {
        self.app
            .world_mut()
            .resource_scope(|world, registry: Mut<SaveableRegistry>| registry.save_all(world))
    }

    /// Reset every saveable resource, then restore from `blobs`.
    pub fn load(&mut self, blobs: &BTreeMap<String, Vec<u8>>) {
        self.app
            .world_mut()
            .resource_scope(|world, registry: Mut<SaveableRegistry>| {
                registry.reset_all(world);
                registry.load_all(world, blobs);
            });
    }
}
