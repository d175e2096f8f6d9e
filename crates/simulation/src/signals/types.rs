use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::track::PieceDirection;
use crate::world::{NetworkKind, Pos3, TilePos, TileWorld};

// =============================================================================
// Signal state
// =============================================================================

/// What a train about to enter a signalled piece sees on its side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SignalStateFlags(pub u8);

impl SignalStateFlags {
    pub const NONE: SignalStateFlags = SignalStateFlags(0);
    /// The block beyond the signal is claimed.
    pub const OCCUPIED: SignalStateFlags = SignalStateFlags(1);
    /// No signal faces this direction of travel: the piece cannot be entered.
    pub const BLOCKED_NO_ROUTE: SignalStateFlags = SignalStateFlags(2);
    /// No signal faces the opposite direction.
    pub const OCCUPIED_ONE_WAY: SignalStateFlags = SignalStateFlags(4);

    pub fn contains(self, other: SignalStateFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: SignalStateFlags) {
        self.0 |= other.0;
    }
}

/// Aspects a signal side shows.
pub const ASPECT_CLEAR: u8 = 0;
pub const ASPECT_RED: u8 = 1;
pub const ASPECT_YELLOW: u8 = 2;
pub const ASPECT_DOUBLE_YELLOW: u8 = 3;
/// Shown after a train was let through an occupied block.
pub const ASPECT_FORCED_RED: u8 = 8;

// =============================================================================
// Signal addressing
// =============================================================================

/// Stable address of one side of a signal: the single-segment track piece
/// it is layered on plus the travel direction it guards. Element indices
/// shift as tiles are edited, so the piece is looked up again on use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct SignalRef {
    pub tile: TilePos,
    pub base_z: i32,
    pub piece_id: u8,
    pub rotation: u8,
    pub reversed: bool,
}

impl SignalRef {
    /// The signal a train entering at `entry` with `dir` would pass, if the
    /// piece carries a signal element at all.
    pub fn on_piece(world: &TileWorld, entry: Pos3, dir: PieceDirection) -> Option<SignalRef> {
        let (tile, index) = crate::track::find_entry_element(world, NetworkKind::Track, entry, dir)?;
        world.layered_signal(tile, index)?;
        let base_z = world.tile(tile).get(index)?.as_track()?.base_z;
        Some(SignalRef {
            tile,
            base_z,
            piece_id: dir.id,
            rotation: dir.rotation,
            reversed: dir.reversed,
        })
    }

    pub(crate) fn element_index(&self, world: &TileWorld) -> Option<usize> {
        world.find_piece(
            NetworkKind::Track,
            self.tile,
            self.piece_id,
            self.rotation,
            0,
            self.base_z,
        )
    }
}

/// A block a train holds, with the odometer reading at which its head
/// entered the signalled piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SignalClaim {
    pub signal: SignalRef,
    pub odometer: u64,
}

// =============================================================================
// Decisions
// =============================================================================

/// Outcome of arbitration for a vehicle held in front of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDecision {
    Proceed,
    Wait,
    Reverse,
}

/// Outcome for a road vehicle held behind an occupied piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadDecision {
    Wait,
    Overtake,
    Reverse,
}

/// Waiting times (ticks) for a road vehicle: when it first tries to get
/// past, and when it gives up and turns around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadThresholds {
    pub first: u16,
    pub reverse: u16,
}

/// A stopped vehicle found on the piece ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blocker {
    pub stationary: bool,
    pub waiting: bool,
}
