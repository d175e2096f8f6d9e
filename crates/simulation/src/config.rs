use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// World geometry
// ---------------------------------------------------------------------------

/// Edge length of one tile in world units.
pub const TILE_SIZE: i32 = 32;
/// World z units per stored element height unit.
pub const SMALL_Z_STEP: i32 = 4;
/// Movement distance units covered by one tile-long piece segment.
pub const DISTANCE_PER_SEGMENT: u32 = 256;
/// Cruising altitude of aircraft in world z units.
pub const CRUISE_ALTITUDE: i32 = 960;

// ---------------------------------------------------------------------------
// Connection graph
// ---------------------------------------------------------------------------

pub const MAX_CONNECTIONS: usize = 16;
/// Upper bound on nodes expanded when routing through a junction.
pub const JUNCTION_SEARCH_LIMIT: usize = 256;

// ---------------------------------------------------------------------------
// Orders and routing
// ---------------------------------------------------------------------------

/// Capacity of the shared order table in bytes.
pub const MAX_ORDER_TABLE_BYTES: usize = 256_000;
pub const MAX_ORDERS_PER_VEHICLE: usize = 63;
pub const ROUTING_RING_SIZE: usize = 64;

// ---------------------------------------------------------------------------
// Signal and obstruction timeouts (ticks)
// ---------------------------------------------------------------------------

pub const TRAIN_ONE_WAY_SIGNAL_TIMEOUT: u16 = 1920;
pub const TRAIN_TWO_WAY_SIGNAL_TIMEOUT: u16 = 640;
/// Two-way signals re-run the lookahead when `time_at_signal & mask == 0`.
pub const SIGNAL_LOOKAHEAD_MASK: u16 = 0x3F;
/// Ticks a train keeps the right to pass a held signal after the timeout grants it.
pub const SIGNAL_PASS_GRACE_TICKS: u8 = 2;

pub const BUS_FIRST_THRESHOLD: u16 = 160;
pub const BUS_SIGNAL_TIMEOUT: u16 = 960;
pub const BUS_OVERTAKING_FIRST_THRESHOLD: u16 = 128;
pub const BUS_OVERTAKING_SIGNAL_TIMEOUT: u16 = 544;
pub const TRAM_FIRST_THRESHOLD: u16 = 160;
pub const TRAM_SIGNAL_TIMEOUT: u16 = 2880;
pub const TRAM_OVERTAKING_FIRST_THRESHOLD: u16 = 64;
pub const TRAM_OVERTAKING_SIGNAL_TIMEOUT: u16 = 128;

// ---------------------------------------------------------------------------
// Calendar and lifecycle
// ---------------------------------------------------------------------------

pub const TICKS_PER_DAY: u32 = 128;
pub const DAYS_PER_MONTH: u32 = 30;
pub const MONTHS_PER_YEAR: u32 = 12;
pub const STARTING_YEAR: u16 = 1900;

pub const AI_SELL_CRASHED_VEHICLE_DAYS: u8 = 14;
pub const RESTART_STOPPED_ROAD_VEHICLE_DAYS: u8 = 20;
/// A train with no cars that was never placed is deleted after this many ticks.
pub const DANGLING_TRAIN_TIMEOUT: u16 = 960;

// ---------------------------------------------------------------------------
// Reliability and breakdowns
// ---------------------------------------------------------------------------

pub const RELIABILITY_LOSS_PER_DAY: u16 = 4;
pub const RELIABILITY_LOSS_PER_DAY_OBSOLETE: u16 = 10;
/// Daily decay never leaves reliability below this value.
pub const RELIABILITY_FLOOR: u16 = 100;
pub const BREAKDOWN_DURATION_DAYS: u8 = 5;
/// Sentinel for "no breakdown scheduled".
pub const BREAKDOWN_TIMER_DISABLED: u16 = 0xFFFF;
pub const MIN_BREAKDOWN_TIMER: u16 = 4;

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// Speed below which a train starting on an upward slope may slip.
pub const WHEEL_SLIP_SPEED: u16 = 8;
pub const WHEEL_SLIP_TICKS: u8 = 12;
/// Out of 65536; scaled down by the train's power-to-weight ratio.
pub const WHEEL_SLIP_BASE_CHANCE: u32 = 8192;
/// Speed cap while a road or rail vehicle is approaching a station.
pub const APPROACH_SPEED: u16 = 12;
/// Upper bound on speed gained per tick; the actual gain is power / weight.
pub const MAX_ACCELERATION: u16 = 4;
pub const BRAKE_RATE: u16 = 4;
/// Air and water vehicles cover `speed / MOVE_DIVISOR` world units per tick.
pub const MOVE_DIVISOR: u32 = 8;
pub const WATER_APPROACH_RADIUS: i32 = 96;
pub const AIR_LANDING_RADIUS: i32 = 512;
pub const AIR_CLIMB_RATE: i32 = 8;
pub const AIR_TAXI_TICKS: u16 = 64;

// ---------------------------------------------------------------------------
// Cargo
// ---------------------------------------------------------------------------

/// Transfer-time multiplier for a car standing past the end of its
/// station's pieces.
pub const RAIL_PAST_STATION_PENALTY: u32 = 12;
pub const ROAD_PAST_STATION_PENALTY: u32 = 2;
/// Multiplier on the platform itself, and for air and water vehicles.
pub const MIN_PAST_STATION_PENALTY: u32 = 1;
/// Timeout set when a vehicle begins unloading or loading.
pub const BEGIN_TRANSFER_TIMEOUT: u16 = 10;

pub const AVERAGE_SPEED_MODIFIER_LAND: u32 = 21;
pub const AVERAGE_SPEED_MODIFIER_AIR: u32 = 36;
pub const AVERAGE_SPEED_MODIFIER_WATER: u32 = 31;

pub const MAX_CARGO_TYPES: usize = 32;

// ---------------------------------------------------------------------------
// Runtime settings
// ---------------------------------------------------------------------------

/// Player-facing switches consulted by the vehicle update.
#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// When false, trains wait at a held signal forever instead of reversing.
    pub trains_reverse_at_signals: bool,
    pub breakdowns_enabled: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            trains_reverse_at_signals: true,
            breakdowns_enabled: true,
        }
    }
}
