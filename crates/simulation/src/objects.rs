//! Read-only object definitions: vehicle, cargo, track and road capability
//! tables. The vehicle simulation only ever reads these.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::ids::{CargoId, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum TransportMode {
    Rail,
    Road,
    Air,
    Water,
}

impl TransportMode {
    pub fn index(self) -> usize {
        match self {
            TransportMode::Rail => 0,
            TransportMode::Road => 1,
            TransportMode::Air => 2,
            TransportMode::Water => 3,
        }
    }
}

/// Finer vehicle classification; its discriminant is the bit a station
/// records when visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum VehicleType {
    Train = 0,
    Bus = 1,
    Truck = 2,
    Tram = 3,
    Aircraft = 4,
    Ship = 5,
}

/// Cargo a vehicle component can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct CargoCapacity {
    /// Bit `n` set means cargo type `n` is accepted.
    pub accepted_types: u32,
    pub max_qty: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleObject {
    pub name: String,
    pub mode: TransportMode,
    pub vehicle_type: VehicleType,
    /// Zero for unpowered wagons.
    pub power: u16,
    pub weight: u16,
    /// Maximum speed in distance units per tick.
    pub speed: u16,
    /// Length in distance units.
    pub length: u32,
    /// Carried on the body.
    pub primary_cargo: Option<CargoCapacity>,
    /// Carried on the front bogie.
    pub secondary_cargo: Option<CargoCapacity>,
    pub obsolete_year: u16,
    pub cost: Money,
    /// Charged monthly.
    pub running_cost: Money,
    pub base_reliability: u16,
    /// Track or road object the vehicle runs on.
    pub network_object: u8,
    pub required_mods: u8,
}

impl VehicleObject {
    pub fn is_powered(&self) -> bool {
        self.power > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CargoObject {
    pub name: String,
    /// Base ticks per 256 units moved.
    pub transfer_time: u16,
    pub payment_factor: i32,
    pub premium_days: u8,
    pub max_non_premium_days: u8,
    /// Payment reduction per non-premium day, out of 65536.
    pub non_premium_rate: u16,
    /// Payment reduction per penalty day, out of 65536.
    pub penalty_rate: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackObject {
    pub name: String,
    pub build_cost: Money,
    pub signal_cost: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadObject {
    pub name: String,
    pub build_cost: Money,
    /// Usable by every company regardless of owner.
    pub is_global: bool,
    pub is_tram: bool,
}

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRegistry {
    pub vehicles: Vec<VehicleObject>,
    pub cargo: Vec<CargoObject>,
    pub tracks: Vec<TrackObject>,
    pub roads: Vec<RoadObject>,
    pub station_cost: Money,
}

impl ObjectRegistry {
    pub fn vehicle(&self, id: u16) -> Option<&VehicleObject> {
        self.vehicles.get(id as usize)
    }

    pub fn cargo(&self, id: CargoId) -> Option<&CargoObject> {
        self.cargo.get(id as usize)
    }

    pub fn track(&self, id: u8) -> Option<&TrackObject> {
        self.tracks.get(id as usize)
    }

    pub fn road(&self, id: u8) -> Option<&RoadObject> {
        self.roads.get(id as usize)
    }
}

// -----------------------------------------------------------------------------
// Standard catalogue
// -----------------------------------------------------------------------------

pub const STEAM_LOCOMOTIVE: u16 = 0;
pub const PASSENGER_COACH: u16 = 1;
pub const GOODS_WAGON: u16 = 2;
pub const BUS: u16 = 3;
pub const TRAM: u16 = 4;
pub const CARGO_SHIP: u16 = 5;
pub const BIPLANE: u16 = 6;

pub const CARGO_PASSENGERS: CargoId = 0;
pub const CARGO_MAIL: CargoId = 1;
pub const CARGO_COAL: CargoId = 2;
pub const CARGO_GOODS: CargoId = 3;

pub const STANDARD_GAUGE: u8 = 0;
pub const PUBLIC_ROAD: u8 = 0;
pub const TRAM_TRACK: u8 = 1;

fn capacity(types: &[CargoId], max_qty: u8) -> Option<CargoCapacity> {
    let accepted_types = types.iter().fold(0u32, |mask, &t| mask | (1 << t));
    Some(CargoCapacity {
        accepted_types,
        max_qty,
    })
}

fn cargo(name: &str, transfer_time: u16, payment_factor: i32, premium_days: u8) -> CargoObject {
    CargoObject {
        name: name.to_string(),
        transfer_time,
        payment_factor,
        premium_days,
        max_non_premium_days: 40,
        non_premium_rate: 256,
        penalty_rate: 512,
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        let vehicle = |name: &str, mode, vehicle_type, power, weight, speed, length| VehicleObject {
            name: name.to_string(),
            mode,
            vehicle_type,
            power,
            weight,
            speed,
            length,
            primary_cargo: None,
            secondary_cargo: None,
            obsolete_year: 1960,
            cost: 10_000,
            running_cost: 400,
            base_reliability: 60_000,
            network_object: 0,
            required_mods: 0,
        };

        let steam = vehicle("Steam Locomotive", TransportMode::Rail, VehicleType::Train, 600, 80, 24, 384);
        let coach = VehicleObject {
            primary_cargo: capacity(&[CARGO_PASSENGERS], 40),
            secondary_cargo: capacity(&[CARGO_MAIL], 8),
            ..vehicle("Passenger Coach", TransportMode::Rail, VehicleType::Train, 0, 30, 32, 320)
        };
        let wagon = VehicleObject {
            primary_cargo: capacity(&[CARGO_COAL, CARGO_GOODS], 30),
            ..vehicle("Goods Wagon", TransportMode::Rail, VehicleType::Train, 0, 20, 28, 256)
        };
        let bus = VehicleObject {
            primary_cargo: capacity(&[CARGO_PASSENGERS], 30),
            network_object: PUBLIC_ROAD,
            ..vehicle("Bus", TransportMode::Road, VehicleType::Bus, 120, 8, 20, 192)
        };
        let tram = VehicleObject {
            primary_cargo: capacity(&[CARGO_PASSENGERS], 50),
            network_object: TRAM_TRACK,
            ..vehicle("Tram", TransportMode::Road, VehicleType::Tram, 160, 16, 18, 256)
        };
        let ship = VehicleObject {
            primary_cargo: capacity(&[CARGO_COAL, CARGO_GOODS], 200),
            ..vehicle("Cargo Ship", TransportMode::Water, VehicleType::Ship, 400, 500, 10, 512)
        };
        let plane = VehicleObject {
            primary_cargo: capacity(&[CARGO_PASSENGERS], 20),
            secondary_cargo: capacity(&[CARGO_MAIL], 10),
            ..vehicle("Biplane", TransportMode::Air, VehicleType::Aircraft, 300, 4, 48, 128)
        };

        Self {
            vehicles: vec![steam, coach, wagon, bus, tram, ship, plane],
            cargo: vec![
                cargo("Passengers", 32, 120, 4),
                cargo("Mail", 16, 150, 3),
                cargo("Coal", 64, 60, 20),
                cargo("Goods", 48, 100, 10),
            ],
            tracks: vec![TrackObject {
                name: "Standard Gauge".to_string(),
                build_cost: 100,
                signal_cost: 50,
            }],
            roads: vec![
                RoadObject {
                    name: "Public Road".to_string(),
                    build_cost: 60,
                    is_global: true,
                    is_tram: false,
                },
                RoadObject {
                    name: "Tram Track".to_string(),
                    build_cost: 80,
                    is_global: false,
                    is_tram: true,
                },
            ],
            station_cost: 500,
        }
    }
}

pub struct ObjectsPlugin;

impl Plugin for ObjectsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ObjectRegistry>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_ids_resolve() {
        let objects = ObjectRegistry::default();
        assert_eq!(
            objects.vehicle(STEAM_LOCOMOTIVE).map(|v| v.mode),
            Some(TransportMode::Rail)
        );
        assert!(objects.vehicle(BUS).is_some_and(|v| v.vehicle_type == VehicleType::Bus));
        assert!(objects.cargo(CARGO_GOODS).is_some());
        assert!(objects.road(PUBLIC_ROAD).is_some_and(|r| r.is_global));
        assert!(objects.road(TRAM_TRACK).is_some_and(|r| r.is_tram && !r.is_global));
    }

    #[test]
    fn test_capacity_mask_covers_listed_cargo() {
        let objects = ObjectRegistry::default();
        let wagon = objects.vehicle(GOODS_WAGON).and_then(|v| v.primary_cargo);
        let mask = wagon.map(|c| c.accepted_types).unwrap_or(0);
        assert_eq!(mask, (1 << CARGO_COAL) | (1 << CARGO_GOODS));
    }
}
