//! Rail and road driving: speed, advancing piece by piece through the
//! connection graph, holding at signals and occupied road pieces, and
//! turning around.

use bevy::prelude::*;

use crate::config::*;
use crate::ids::StationId;
use crate::orders::Order;
use crate::signals::{
    claim_block, lookahead_block_free, opposing_train_at_signal, rail_decision, release_all,
    release_cleared, road_decision, road_thresholds, signal_state, Blocker, RoadDecision,
    SignalDecision, SignalRef, SignalStateFlags, Traffic,
};
use crate::track::connections::{decode, encode};
use crate::track::geometry::{SLOPE_DOWN, SLOPE_UP};
use crate::track::{
    choose_connection, connection_end, get_connections, piece_length, reverse_entry,
    station_on_piece, ConnectionSet, PieceDirection, PieceKey, RoadAndDirection, BASIC_RAD_MASK,
    BASIC_TAD_MASK,
};
use crate::world::{NetworkKind, Pos3, TileWorld};

use super::train::Train;
use super::types::*;
use super::update::{arrive, skip_current_order, OtherVehicles, SimContext};

fn basic_mask(kind: NetworkKind) -> u16 {
    match kind {
        NetworkKind::Track => BASIC_TAD_MASK,
        NetworkKind::Road => BASIC_RAD_MASK,
    }
}

/// What lies past the end of the head's piece.
struct Ahead {
    end: Pos3,
    dir: PieceDirection,
    connection: u16,
    set: ConnectionSet,
}

enum Step {
    Entered,
    Held,
    DeadEnd,
}

pub(crate) fn update_land(train: &mut Train, ctx: &mut SimContext, traffic: &OtherVehicles) {
    let Some(kind) = train.network_kind() else {
        return;
    };

    if train.veh2.is_broken_down && !train.veh2.is_still_powered {
        train.veh1.speed = 0;
        if matches!(train.head.status, Status::Travelling | Status::Approaching) {
            train.head.status = Status::BrokenDown;
        }
        return;
    }
    if train.head.status == Status::BrokenDown {
        train.head.status = Status::Travelling;
    }

    if train.head.command_stop {
        train.veh1.speed = train.veh1.speed.saturating_sub(BRAKE_RATE);
        if train.veh1.speed == 0 {
            train.head.status = Status::Stopped;
            return;
        }
    }

    match train.head.status {
        Status::WaitingAtSignal => {
            wait_at_obstruction(train, ctx, traffic, kind);
            return;
        }
        Status::Stopped => train.head.status = Status::Travelling,
        _ => {}
    }

    if !train.head.command_stop {
        update_speed(train, ctx, kind);
    }
    advance(train, ctx, traffic, kind);

    if kind == NetworkKind::Track {
        let tail = train.veh1.odometer.saturating_sub(train.length() as u64);
        release_cleared(
            ctx.world,
            &mut train.head.signal_claims,
            &train.head.recent_signals,
            tail,
        );
    }
    train.veh1.signal_pass_grace = train.veh1.signal_pass_grace.saturating_sub(1);
}

// =============================================================================
// Speed
// =============================================================================

pub(crate) fn acceleration(power: u32, weight: u32) -> u16 {
    (power / weight.max(1)).clamp(1, MAX_ACCELERATION as u32) as u16
}

fn target_speed(train: &Train) -> u16 {
    let mut target = train.veh2.max_speed;
    if train.veh2.is_broken_down {
        target = (target / 4).max(1);
    }
    if train.head.status == Status::Approaching {
        target = target.min(APPROACH_SPEED);
    }
    target
}

fn on_upward_slope(dir: PieceDirection) -> bool {
    (dir.id == SLOPE_UP && !dir.reversed) || (dir.id == SLOPE_DOWN && dir.reversed)
}

fn update_speed(train: &mut Train, ctx: &mut SimContext, kind: NetworkKind) {
    let target = target_speed(train);
    let speed = train.veh1.speed;
    if speed > target {
        train.veh1.speed = speed.saturating_sub(BRAKE_RATE).max(target);
        return;
    }
    if speed == target {
        return;
    }
    if train.veh1.wheel_slip > 0 {
        train.veh1.wheel_slip -= 1;
        return;
    }
    let climbing = decode(kind, train.head.connection);
    if kind == NetworkKind::Track && speed < WHEEL_SLIP_SPEED && on_upward_slope(climbing) {
        let ratio = (train.veh2.power / train.veh2.weight.max(1)).max(1);
        let chance = WHEEL_SLIP_BASE_CHANCE / ratio;
        if (ctx.rng.next_u16() as u32) < chance {
            train.veh1.wheel_slip = WHEEL_SLIP_TICKS;
            return;
        }
    }
    let gain = acceleration(train.veh2.power, train.veh2.weight);
    train.veh1.speed = speed.saturating_add(gain).min(target);
}

// =============================================================================
// Advancing
// =============================================================================

fn advance(train: &mut Train, ctx: &mut SimContext, traffic: &OtherVehicles, kind: NetworkKind) {
    let mut remaining = train.veh1.speed as u32;
    while remaining > 0 {
        let dir = decode(kind, train.head.connection);
        let length = piece_length(dir.id);
        let room = length.saturating_sub(train.head.progress);
        if remaining < room {
            train.head.progress += remaining;
            train.veh1.odometer += remaining as u64;
            return;
        }
        train.head.progress = length;
        train.veh1.odometer += room as u64;
        remaining -= room;

        if train.head.status == Status::Approaching {
            if let Some(station) = train.head.station {
                arrive(train, ctx, station);
                return;
            }
        }

        match enter_next_piece(train, ctx, traffic, kind) {
            Step::Entered => {}
            Step::Held => {
                train.veh1.speed = 0;
                train.veh1.time_at_signal = 0;
                train.head.status = Status::WaitingAtSignal;
                return;
            }
            Step::DeadEnd => {
                reverse(train, ctx.world);
                return;
            }
        }
    }
}

fn look_ahead(train: &Train, ctx: &SimContext, kind: NetworkKind) -> Option<Ahead> {
    let (end, rotation) = connection_end(train.head.entry, decode(kind, train.head.connection))?;
    let filter = train.connection_filter(ctx.objects);
    let world: &TileWorld = &*ctx.world;
    let set = get_connections(world, kind, end, rotation, &filter);
    let choice = if set.len() > 1 {
        let target = ctx.orders.target_station(&train.head.orders);
        choose_connection(world, kind, end, &set, &filter, target)
    } else {
        set.connections.first().copied()
    }?;
    let connection = choice & basic_mask(kind);
    Some(Ahead {
        end,
        dir: decode(kind, connection),
        connection,
        set,
    })
}

/// Signal on the piece ahead and whether this train holds it already (a
/// short train lapping a loop with a single signal).
enum SignalCheck {
    Clear(Option<(SignalRef, bool)>),
    Held,
    NoRoute,
}

fn check_signal(train: &Train, world: &TileWorld, end: Pos3, dir: PieceDirection) -> SignalCheck {
    let Some(signal) = SignalRef::on_piece(world, end, dir) else {
        return SignalCheck::Clear(None);
    };
    let state = signal_state(world, &signal);
    if state.contains(SignalStateFlags::BLOCKED_NO_ROUTE) {
        return SignalCheck::NoRoute;
    }
    if train.head.signal_claims.iter().any(|c| c.signal == signal) {
        return SignalCheck::Clear(Some((signal, false)));
    }
    if state.contains(SignalStateFlags::OCCUPIED) {
        if train.veh1.signal_pass_grace > 0 {
            return SignalCheck::Clear(Some((signal, true)));
        }
        return SignalCheck::Held;
    }
    SignalCheck::Clear(Some((signal, false)))
}

fn road_blocker_ahead(ahead: &Ahead, traffic: &OtherVehicles, overtaking: bool) -> Option<Blocker> {
    PieceKey::new(ahead.end, ahead.dir)
        .and_then(|key| traffic.road_blocker(key, ahead.dir.reversed, overtaking))
}

fn road_held(ahead: &Ahead, traffic: &OtherVehicles, overtaking: bool) -> bool {
    road_blocker_ahead(ahead, traffic, overtaking).is_some()
        || (ahead.set.has_level_crossing && traffic.train_on_tile(ahead.end.tile()))
}

fn enter_next_piece(
    train: &mut Train,
    ctx: &mut SimContext,
    traffic: &OtherVehicles,
    kind: NetworkKind,
) -> Step {
    let Some(ahead) = look_ahead(train, ctx, kind) else {
        return Step::DeadEnd;
    };

    let mut claim = None;
    let mut connection = ahead.connection;
    match kind {
        NetworkKind::Track => match check_signal(train, ctx.world, ahead.end, ahead.dir) {
            SignalCheck::Clear(signal) => claim = signal,
            SignalCheck::Held => return Step::Held,
            SignalCheck::NoRoute => return Step::DeadEnd,
        },
        NetworkKind::Road => {
            let overtaking = RoadAndDirection(train.head.connection).is_overtaking();
            if road_held(&ahead, traffic, overtaking) {
                return Step::Held;
            }
            // Stay in the passing lane while still alongside someone.
            if overtaking && road_blocker_ahead(&ahead, traffic, false).is_some() {
                connection = RoadAndDirection(connection).with_overtaking(true).0;
            }
        }
    }

    train.head.routing.push(connection);
    train.head.entry = ahead.end;
    train.head.connection = connection;
    train.head.progress = 0;
    train.veh1.reversals_without_progress = 0;

    if let Some((signal, forced)) = claim {
        claim_block(
            ctx.world,
            &mut train.head.signal_claims,
            &mut train.head.recent_signals,
            signal,
            train.veh1.odometer,
            forced,
        );
        if forced {
            debug!("{:?} passed an occupied signal", train.head.id);
        }
        train.veh1.signal_pass_grace = 0;
    }

    on_piece_entered(train, ctx, kind, ahead.end, ahead.dir);
    Step::Entered
}

/// Station on the pieces just past the end of the head's piece.
fn station_ahead(train: &Train, ctx: &SimContext, kind: NetworkKind) -> Option<StationId> {
    let (end, rotation) = connection_end(train.head.entry, decode(kind, train.head.connection))?;
    let filter = train.connection_filter(ctx.objects);
    get_connections(&*ctx.world, kind, end, rotation, &filter).station_id
}

/// Station and order bookkeeping for the piece the head just entered. A
/// station is acted on at the last of its pieces, so a stopping vehicle
/// pulls up to the far end of the platform.
fn on_piece_entered(train: &mut Train, ctx: &mut SimContext, kind: NetworkKind, entry: Pos3, dir: PieceDirection) {
    let station = station_on_piece(ctx.world, kind, entry, dir);
    train.head.station = station;
    if train.head.status == Status::Approaching {
        train.head.status = Status::Travelling;
    }

    let current = ctx.orders.current_order(&train.head.orders);
    if let Some(Order::RouteWaypoint(waypoint)) = current {
        if waypoint.matches(entry.tile(), dir) {
            skip_current_order(ctx.orders, &mut train.head.orders);
            ctx.orders.advance_to_next_routable_order(&mut train.head.orders);
        }
    }

    let Some(here) = station else {
        return;
    };
    if station_ahead(train, ctx, kind) == Some(here) {
        return;
    }
    match current {
        Some(Order::StopAt(target)) if target == here => {
            train.head.status = Status::Approaching;
            return;
        }
        Some(Order::RouteThrough(through)) if through == here => {
            ctx.orders.check_if_at_order_station(&mut train.head.orders, through);
            ctx.orders.advance_to_next_routable_order(&mut train.head.orders);
            return;
        }
        _ => {}
    }

    // Road vehicles only call at their own company's stations.
    let may_call = kind == NetworkKind::Track
        || ctx.stations.get(here).is_some_and(|s| s.owner == train.head.owner);
    if !train.veh1.express_mode && train.head.last_stop != Some(here) && may_call {
        train.head.status = Status::Approaching;
    }
}

// =============================================================================
// Holding
// =============================================================================

fn wait_at_obstruction(train: &mut Train, ctx: &mut SimContext, traffic: &OtherVehicles, kind: NetworkKind) {
    train.veh1.speed = 0;
    train.veh1.time_at_signal = train.veh1.time_at_signal.saturating_add(1);
    let Some(ahead) = look_ahead(train, ctx, kind) else {
        reverse(train, ctx.world);
        return;
    };
    let time = train.veh1.time_at_signal;

    match kind {
        NetworkKind::Track => {
            let Some(signal) = SignalRef::on_piece(ctx.world, ahead.end, ahead.dir) else {
                resume(train);
                return;
            };
            let state = signal_state(ctx.world, &signal);
            let own = train.head.signal_claims.iter().any(|c| c.signal == signal);
            if own || !state.contains(SignalStateFlags::OCCUPIED) {
                resume(train);
                return;
            }
            let filter = train.connection_filter(ctx.objects);
            let world: &TileWorld = &*ctx.world;
            let decision = rail_decision(
                time,
                state.contains(SignalStateFlags::OCCUPIED_ONE_WAY),
                ctx.settings.trains_reverse_at_signals,
                || lookahead_block_free(world, &filter, ahead.end, ahead.dir, traffic),
                || opposing_train_at_signal(world, &filter, ahead.end, ahead.dir, traffic),
            );
            match decision {
                SignalDecision::Proceed => {
                    debug!("{:?} passing held signal after {} ticks", train.head.id, time);
                    train.veh1.signal_pass_grace = SIGNAL_PASS_GRACE_TICKS;
                    resume(train);
                }
                SignalDecision::Reverse => {
                    debug!("{:?} reversing at signal after {} ticks", train.head.id, time);
                    reverse(train, ctx.world);
                }
                SignalDecision::Wait => {}
            }
        }
        NetworkKind::Road => {
            let overtaking = RoadAndDirection(train.head.connection).is_overtaking();
            if !road_held(&ahead, traffic, overtaking) {
                resume(train);
                return;
            }
            let blocker = road_blocker_ahead(&ahead, traffic, overtaking);
            let thresholds = road_thresholds(train.head.vehicle_type, overtaking);
            match road_decision(time, thresholds, overtaking, blocker) {
                RoadDecision::Overtake => {
                    debug!("{:?} overtaking", train.head.id);
                    train.head.connection = RoadAndDirection(train.head.connection).with_overtaking(true).0;
                    resume(train);
                }
                RoadDecision::Reverse => {
                    debug!("{:?} turning around after {} ticks", train.head.id, time);
                    reverse(train, ctx.world);
                }
                RoadDecision::Wait => {}
            }
        }
    }
}

fn resume(train: &mut Train) {
    train.veh1.time_at_signal = 0;
    train.head.status = Status::Travelling;
}

// =============================================================================
// Reversing
// =============================================================================

/// Turn the vehicle around: the tail becomes the head, every block held is
/// given back, and the routing ring is rebuilt for the new direction. Two
/// reversals without entering a new piece in between leave it stuck.
pub(crate) fn reverse(train: &mut Train, world: &mut TileWorld) -> bool {
    let Some(kind) = train.network_kind() else {
        return false;
    };
    if kind == NetworkKind::Track {
        release_all(world, &mut train.head.signal_claims, &mut train.head.recent_signals);
    }

    let pieces = train.occupied_pieces();
    let Some(tail) = train.locate(train.length()) else {
        return false;
    };
    let mut reversed = Vec::with_capacity(pieces.len());
    for (entry, connection) in &pieces {
        let Some((back_entry, back_dir)) = reverse_entry(*entry, decode(kind, *connection)) else {
            return false;
        };
        reversed.push((back_entry, encode(kind, back_dir.id, back_dir.reversed, back_dir.rotation)));
    }
    let Some(&(new_entry, new_connection)) = reversed.last() else {
        return false;
    };

    train.head.routing.clear();
    for (_, connection) in &reversed {
        train.head.routing.push(*connection);
    }
    let tail_length = piece_length(decode(kind, tail.connection).id);
    train.head.entry = new_entry;
    train.head.connection = new_connection;
    train.head.progress = tail_length.saturating_sub(tail.sub_position);
    train.head.station = station_on_piece(world, kind, new_entry, decode(kind, new_connection));

    train.veh1.speed = 0;
    train.veh1.time_at_signal = 0;
    train.veh1.signal_pass_grace = 0;
    train.veh1.reversals_without_progress = train.veh1.reversals_without_progress.saturating_add(1);

    if train.veh1.reversals_without_progress >= 2 {
        info!("{:?} is stuck", train.head.id);
        train.head.status = Status::Stuck;
    } else if !matches!(train.head.status, Status::Stopped) {
        train.head.status = Status::Travelling;
    }
    true
}
