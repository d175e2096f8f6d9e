use crate::config::*;
use crate::ids::{CargoId, Money};
use crate::objects::{ObjectRegistry, TransportMode};
use crate::track::connections::decode;
use crate::track::station_on_piece;
use crate::vehicles::{TransferSlot, Train};
use crate::world::TileWorld;

/// Payment for delivering `qty` units of `cargo` over `distance` tiles after
/// `days` in transit. Full rate while the cargo is fresh, then a reduced
/// rate per late day, then a steeper penalty, never below zero.
pub fn calculate_delivered_cargo_payment(
    objects: &ObjectRegistry,
    cargo: CargoId,
    qty: u16,
    distance: u32,
    days: u8,
) -> Money {
    let Some(def) = objects.cargo(cargo) else {
        return 0;
    };
    let payment_factor = def.payment_factor as i64;
    let mut factor = payment_factor << 16;

    let late = days as i64 - def.premium_days as i64;
    if late > 0 {
        let counted = late.min(def.max_non_premium_days as i64);
        factor -= payment_factor * def.non_premium_rate as i64 * counted;
    }
    let penalty = late - def.max_non_premium_days as i64;
    if penalty > 0 {
        factor -= payment_factor * def.penalty_rate as i64 * penalty.min(255);
    }
    let factor = factor.max(0) >> 16;
    factor * qty as i64 * distance as i64 / 4096
}

/// Ticks a transfer step of `qty` units takes. Zero only when nothing moved.
pub fn transfer_timeout(transfer_time: u16, qty: u16, modifier: u32) -> u16 {
    if qty == 0 {
        return 0;
    }
    let ticks = transfer_time as u64 * qty as u64 * modifier as u64 / 256;
    ticks.clamp(1, u16::MAX as u64) as u16
}

/// Slow-down for a transfer step: rail and road cars hanging out past the
/// end of the station's pieces take longer than those on the platform.
pub fn loading_modifier(world: &TileWorld, train: &Train, slot: TransferSlot) -> u32 {
    let past = match train.head.mode {
        TransportMode::Rail => RAIL_PAST_STATION_PENALTY,
        TransportMode::Road => ROAD_PAST_STATION_PENALTY,
        TransportMode::Air | TransportMode::Water => return MIN_PAST_STATION_PENALTY,
    };
    let (Some(kind), Some(station)) = (train.network_kind(), train.head.station) else {
        return past;
    };
    let here = train
        .locate(train.slot_offset(slot))
        .and_then(|at| station_on_piece(world, kind, at.entry, decode(kind, at.connection)));
    if here == Some(station) {
        MIN_PAST_STATION_PENALTY
    } else {
        past
    }
}
