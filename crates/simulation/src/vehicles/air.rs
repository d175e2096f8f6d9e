//! Aircraft and ships. Neither uses the connection graph: they steer
//! straight at the target station's position, x first, then y.

use crate::config::*;
use crate::world::Pos3;

use super::movement::acceleration;
use super::train::Train;
use super::types::Status;
use super::update::{arrive, SimContext};

fn target_position(train: &Train, ctx: &SimContext) -> Option<(crate::ids::StationId, Pos3)> {
    let station = ctx.orders.target_station(&train.head.orders)?;
    Some((station, ctx.stations.get(station)?.pos))
}

fn update_speed(train: &mut Train, cap: u16) {
    let mut target = train.veh2.max_speed.min(cap);
    if train.veh2.is_broken_down {
        target = (target / 4).max(1);
    }
    let speed = train.veh1.speed;
    train.veh1.speed = if speed > target {
        speed.saturating_sub(BRAKE_RATE).max(target)
    } else {
        speed
            .saturating_add(acceleration(train.veh2.power, train.veh2.weight))
            .min(target)
    };
}

/// Whole units the vehicle may move this tick; the fraction carries over.
fn movement_units(train: &mut Train) -> i32 {
    train.veh1.move_remainder += train.veh1.speed as u32;
    let units = train.veh1.move_remainder / MOVE_DIVISOR;
    train.veh1.move_remainder %= MOVE_DIVISOR;
    units as i32
}

/// Step `pos` toward `target` on the ground plane. Returns true once there.
fn step_toward(pos: &mut Pos3, target: Pos3, mut units: i32) -> bool {
    let dx = (target.x - pos.x).clamp(-units, units);
    pos.x += dx;
    units -= dx.abs();
    let dy = (target.y - pos.y).clamp(-units, units);
    pos.y += dy;
    pos.x == target.x && pos.y == target.y
}

fn manhattan(a: Pos3, b: Pos3) -> i32 {
    a.xy().manhattan_distance(b.xy())
}

fn brake_to_stop(train: &mut Train) -> bool {
    if !train.head.command_stop {
        return false;
    }
    train.veh1.speed = train.veh1.speed.saturating_sub(BRAKE_RATE);
    if train.veh1.speed == 0 {
        train.head.status = Status::Stopped;
    }
    true
}

// =============================================================================
// Aircraft
// =============================================================================

pub(crate) fn update_air(train: &mut Train, ctx: &mut SimContext) {
    match train.head.status {
        Status::Stopped => {
            if !train.head.command_stop {
                train.head.status = Status::TakingOff;
            }
        }
        Status::Taxiing1 => {
            train.head.air_timer = train.head.air_timer.saturating_add(1);
            if train.head.air_timer >= AIR_TAXI_TICKS {
                train.head.air_timer = 0;
                if let Some((station, _)) = target_position(train, ctx) {
                    arrive(train, ctx, station);
                } else {
                    train.head.status = Status::Stopped;
                }
            }
        }
        Status::Taxiing2 => {
            train.head.air_timer = train.head.air_timer.saturating_add(1);
            if train.head.air_timer >= AIR_TAXI_TICKS {
                train.head.air_timer = 0;
                train.head.status = if train.head.command_stop {
                    Status::Stopped
                } else {
                    Status::TakingOff
                };
            }
        }
        Status::TakingOff => {
            update_speed(train, u16::MAX);
            train.head.position.z = (train.head.position.z + AIR_CLIMB_RATE).min(CRUISE_ALTITUDE);
            if let Some((_, target)) = target_position(train, ctx) {
                let units = movement_units(train);
                step_toward(&mut train.head.position, target, units);
            }
            if train.head.position.z >= CRUISE_ALTITUDE {
                train.head.status = Status::Travelling;
            }
        }
        Status::Travelling => {
            if brake_to_stop(train) && train.head.status == Status::Stopped {
                return;
            }
            let Some((_, target)) = target_position(train, ctx) else {
                return;
            };
            update_speed(train, u16::MAX);
            let units = movement_units(train);
            step_toward(&mut train.head.position, target, units);
            if manhattan(train.head.position, target) <= AIR_LANDING_RADIUS {
                train.head.status = Status::Landing;
            }
        }
        Status::Landing => {
            let Some((_, target)) = target_position(train, ctx) else {
                train.head.status = Status::Travelling;
                return;
            };
            update_speed(train, u16::MAX);
            let units = movement_units(train);
            let over = step_toward(&mut train.head.position, target, units);
            train.head.position.z = (train.head.position.z - AIR_CLIMB_RATE).max(target.z);
            if over && train.head.position.z == target.z {
                train.veh1.speed = 0;
                train.veh1.move_remainder = 0;
                train.head.air_timer = 0;
                train.head.status = Status::Taxiing1;
            }
        }
        _ => {}
    }
}

// =============================================================================
// Ships
// =============================================================================

pub(crate) fn update_water(train: &mut Train, ctx: &mut SimContext) {
    if brake_to_stop(train) {
        let units = movement_units(train);
        if let Some((_, target)) = target_position(train, ctx) {
            step_toward(&mut train.head.position, target, units);
        }
        return;
    }
    if matches!(train.head.status, Status::Stopped | Status::BrokenDown) {
        train.head.status = Status::Travelling;
    }

    let Some((station, target)) = target_position(train, ctx) else {
        train.veh1.speed = 0;
        return;
    };
    let cap = if train.head.status == Status::Approaching {
        APPROACH_SPEED
    } else {
        u16::MAX
    };
    update_speed(train, cap);
    let units = movement_units(train);
    let reached = step_toward(&mut train.head.position, target, units);

    if reached {
        train.head.status = Status::Approaching;
        train.veh1.move_remainder = 0;
        arrive(train, ctx, station);
    } else if manhattan(train.head.position, target) <= WATER_APPROACH_RADIUS {
        train.head.status = Status::Approaching;
    }
}
