//! Stations: per-cargo stock and acceptance, plus the vehicle types that
//! have called there.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::MAX_CARGO_TYPES;
use crate::ids::{CargoId, CompanyId, StationId};
use crate::objects::VehicleType;
use crate::world::Pos3;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct StationCargoStats {
    pub quantity: u16,
    pub origin: Option<StationId>,
    /// Average days in transit of the stock.
    pub enroute_age: u8,
    pub accepted: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub owner: CompanyId,
    /// Centre of the station in world units.
    pub pos: Pos3,
    pub cargo: Vec<StationCargoStats>,
    /// Bit per `VehicleType` that has arrived here.
    pub visited_types: u8,
}

impl Station {
    pub fn cargo_stats(&self, cargo: CargoId) -> Option<&StationCargoStats> {
        self.cargo.get(cargo as usize)
    }

    pub fn cargo_stats_mut(&mut self, cargo: CargoId) -> Option<&mut StationCargoStats> {
        self.cargo.get_mut(cargo as usize)
    }

    pub fn accepts(&self, cargo: CargoId) -> bool {
        self.cargo_stats(cargo).is_some_and(|s| s.accepted)
    }

    pub fn stock(&self, cargo: CargoId) -> u16 {
        self.cargo_stats(cargo).map_or(0, |s| s.quantity)
    }

    pub fn mark_visited(&mut self, vehicle_type: VehicleType) {
        self.visited_types |= 1 << vehicle_type as u8;
    }

    pub fn has_been_visited_by(&self, vehicle_type: VehicleType) -> bool {
        self.visited_types & (1 << vehicle_type as u8) != 0
    }
}

#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct StationManager {
    pub stations: Vec<Station>,
}

impl StationManager {
    pub fn add(&mut self, name: &str, owner: CompanyId, pos: Pos3) -> StationId {
        let id = StationId(self.stations.len() as u16);
        self.stations.push(Station {
            id,
            name: name.to_string(),
            owner,
            pos,
            cargo: vec![StationCargoStats::default(); MAX_CARGO_TYPES],
            visited_types: 0,
        });
        id
    }

    pub fn get(&self, id: StationId) -> Option<&Station> {
        self.stations.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: StationId) -> Option<&mut Station> {
        self.stations.get_mut(id.0 as usize)
    }

    /// Ground-plane distance between two stations in world units.
    pub fn distance(&self, a: StationId, b: StationId) -> Option<i32> {
        Some(self.get(a)?.pos.xy().manhattan_distance(self.get(b)?.pos.xy()))
    }

    pub fn set_accepted(&mut self, id: StationId, cargo: CargoId, accepted: bool) {
        if let Some(stats) = self.get_mut(id).and_then(|s| s.cargo_stats_mut(cargo)) {
            stats.accepted = accepted;
        }
    }

    pub fn add_stock(&mut self, id: StationId, cargo: CargoId, qty: u16, origin: StationId) {
        if let Some(stats) = self.get_mut(id).and_then(|s| s.cargo_stats_mut(cargo)) {
            stats.quantity = stats.quantity.saturating_add(qty);
            stats.origin.get_or_insert(origin);
        }
    }
}

impl crate::Saveable for StationManager {
    const SAVE_KEY: &'static str = "station_manager";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.stations.is_empty() {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}

pub struct StationsPlugin;

impl Plugin for StationsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StationManager>();
        crate::register_saveable::<StationManager>(app);
    }
}
