use crate::config::*;
use crate::objects::VehicleType;
use crate::track::{
    connection_end, get_track_connections, reverse_entry, ConnectionFilter, PieceDirection,
    PieceKey, TrackAndDirection,
};
use crate::world::{Pos3, TilePos, TileWorld};

use super::types::*;

/// Read access to where the other vehicles are, as seen by the vehicle
/// being updated.
pub trait Traffic {
    /// Any component of another vehicle stands on the piece.
    fn is_piece_occupied(&self, key: PieceKey) -> bool;
    /// Another vehicle's head entered exactly here with exactly this
    /// track-and-direction.
    fn head_at(&self, entry: Pos3, tad: u16) -> bool;
    /// A road vehicle on the piece travelling the same way in the same lane.
    fn road_blocker(&self, key: PieceKey, reversed: bool, overtaking: bool) -> Option<Blocker>;
    /// A train stands on the tile (level crossings).
    fn train_on_tile(&self, tile: TilePos) -> bool;
}

// =============================================================================
// Lookahead
// =============================================================================

/// Two-tile lookahead past the signalled piece: is any train standing on a
/// piece two connections ahead, facing back toward us? Only a plain line
/// ahead is looked through; past a junction nothing is seen.
pub fn opposing_train_at_signal(
    world: &TileWorld,
    filter: &ConnectionFilter,
    signal_entry: Pos3,
    signal_dir: PieceDirection,
    traffic: &impl Traffic,
) -> bool {
    let Some((next, rotation)) = connection_end(signal_entry, signal_dir) else {
        return false;
    };
    let ahead = get_track_connections(world, next, rotation, filter);
    let &[first] = ahead.connections.as_slice() else {
        return false;
    };
    let first_dir = TrackAndDirection::from_connection(first).direction();
    let Some((beyond, beyond_rotation)) = connection_end(next, first_dir) else {
        return false;
    };
    get_track_connections(world, beyond, beyond_rotation, filter)
        .connections
        .iter()
        .filter_map(|&second| {
            let second_dir = TrackAndDirection::from_connection(second).direction();
            reverse_entry(beyond, second_dir)
        })
        .any(|(entry, dir)| {
            let opposing = TrackAndDirection::new(dir.id, dir.reversed, dir.rotation);
            traffic.head_at(entry, opposing.0)
        })
}

/// Whether the block one piece past the signalled piece can be entered:
/// exactly one connection leads on, it is unoccupied, and no opposing train
/// waits beyond it.
pub fn lookahead_block_free(
    world: &TileWorld,
    filter: &ConnectionFilter,
    signal_entry: Pos3,
    signal_dir: PieceDirection,
    traffic: &impl Traffic,
) -> bool {
    let Some((next, rotation)) = connection_end(signal_entry, signal_dir) else {
        return false;
    };
    let ahead = get_track_connections(world, next, rotation, filter);
    let &[only] = ahead.connections.as_slice() else {
        return false;
    };
    let dir = TrackAndDirection::from_connection(only).direction();
    if PieceKey::new(next, dir).is_some_and(|key| traffic.is_piece_occupied(key)) {
        return false;
    }
    !opposing_train_at_signal(world, filter, signal_entry, signal_dir, traffic)
}

// =============================================================================
// Wait / pass / reverse
// =============================================================================

/// Decision for a train that has waited `time_at_signal` ticks in front of
/// an occupied block. The lookahead closures only run on the ticks that
/// need them.
pub fn rail_decision(
    time_at_signal: u16,
    one_way: bool,
    reverse_enabled: bool,
    block_free: impl FnOnce() -> bool,
    opposing_train: impl FnOnce() -> bool,
) -> SignalDecision {
    if !reverse_enabled {
        return SignalDecision::Wait;
    }
    if one_way {
        if time_at_signal < TRAIN_ONE_WAY_SIGNAL_TIMEOUT {
            return SignalDecision::Wait;
        }
        return if block_free() {
            SignalDecision::Proceed
        } else {
            SignalDecision::Reverse
        };
    }

    // The cadence check comes first, so a block found free on the tick of
    // the timeout is still entered.
    if time_at_signal != 0 && time_at_signal & SIGNAL_LOOKAHEAD_MASK == 0 {
        if opposing_train() {
            return SignalDecision::Reverse;
        }
        if block_free() {
            return SignalDecision::Proceed;
        }
    }
    if time_at_signal >= TRAIN_TWO_WAY_SIGNAL_TIMEOUT {
        SignalDecision::Reverse
    } else {
        SignalDecision::Wait
    }
}

pub fn road_thresholds(vehicle_type: VehicleType, overtaking: bool) -> RoadThresholds {
    match (vehicle_type, overtaking) {
        (VehicleType::Tram, false) => RoadThresholds {
            first: TRAM_FIRST_THRESHOLD,
            reverse: TRAM_SIGNAL_TIMEOUT,
        },
        (VehicleType::Tram, true) => RoadThresholds {
            first: TRAM_OVERTAKING_FIRST_THRESHOLD,
            reverse: TRAM_OVERTAKING_SIGNAL_TIMEOUT,
        },
        (_, false) => RoadThresholds {
            first: BUS_FIRST_THRESHOLD,
            reverse: BUS_SIGNAL_TIMEOUT,
        },
        (_, true) => RoadThresholds {
            first: BUS_OVERTAKING_FIRST_THRESHOLD,
            reverse: BUS_OVERTAKING_SIGNAL_TIMEOUT,
        },
    }
}

/// Decision for a road vehicle held for `time_waiting` ticks. Overtaking is
/// only tried once, at the first threshold, and only past a blocker that
/// has stopped for good rather than queueing itself.
pub fn road_decision(
    time_waiting: u16,
    thresholds: RoadThresholds,
    already_overtaking: bool,
    blocker: Option<Blocker>,
) -> RoadDecision {
    if time_waiting >= thresholds.reverse {
        return RoadDecision::Reverse;
    }
    if time_waiting == thresholds.first && !already_overtaking {
        if let Some(blocker) = blocker {
            if blocker.stationary && !blocker.waiting {
                return RoadDecision::Overtake;
            }
        }
    }
    RoadDecision::Wait
}
