use std::ops::{Add, Sub};

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{SMALL_Z_STEP, TILE_SIZE};
use crate::ids::{CompanyId, StationId};

// =============================================================================
// Positions
// =============================================================================

/// A point in world units on the ground plane.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct Pos2 {
    pub x: i32,
    pub y: i32,
}

impl Pos2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance in world units.
    pub fn manhattan_distance(self, other: Pos2) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// A point in world units including height.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct Pos3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Pos3 {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn xy(self) -> Pos2 {
        Pos2::new(self.x, self.y)
    }

    pub fn tile(self) -> TilePos {
        TilePos::from_world(self.x, self.y)
    }

    /// Height expressed in element units (`base_z`).
    pub fn small_z(self) -> i32 {
        self.z.div_euclid(SMALL_Z_STEP)
    }
}

impl Add for Pos3 {
    type Output = Pos3;

    fn add(self, rhs: Pos3) -> Pos3 {
        Pos3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Pos3 {
    type Output = Pos3;

    fn sub(self, rhs: Pos3) -> Pos3 {
        Pos3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Tile coordinates (world units / `TILE_SIZE`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn from_world(x: i32, y: i32) -> Self {
        Self::new(x.div_euclid(TILE_SIZE), y.div_euclid(TILE_SIZE))
    }

    /// World position of the tile's corner at the given height.
    pub fn to_world(self, z: i32) -> Pos3 {
        Pos3::new(self.x * TILE_SIZE, self.y * TILE_SIZE, z)
    }
}

// =============================================================================
// Tile elements
// =============================================================================

/// Which network a piece element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum NetworkKind {
    Track,
    Road,
}

/// One tile's worth of a (possibly multi-tile) track or road piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct PieceElement {
    pub piece_id: u8,
    /// Placement rotation of the whole piece (its begin rotation).
    pub rotation: u8,
    /// Index of this segment within the piece.
    pub sequence: u8,
    pub base_z: i32,
    pub owner: CompanyId,
    pub object_id: u8,
    pub mods: u8,
    pub ghost: bool,
    /// Reserved by an AI plan or still under construction.
    pub ai_allocated: bool,
    pub has_bridge: bool,
    /// Set on the final segment; reversed traversal enters the piece here.
    pub is_last_segment: bool,
}

/// What to lay down when placing a whole piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct PiecePlacement {
    pub piece_id: u8,
    pub rotation: u8,
    pub owner: CompanyId,
    pub object_id: u8,
    pub mods: u8,
    pub ghost: bool,
}

impl PiecePlacement {
    pub fn new(piece_id: u8, rotation: u8, owner: CompanyId, object_id: u8) -> Self {
        Self {
            piece_id,
            rotation,
            owner,
            object_id,
            mods: 0,
            ghost: false,
        }
    }
}

impl PieceElement {
    /// Placed and usable by vehicles.
    pub fn is_live(&self) -> bool {
        !self.ghost && !self.ai_allocated
    }
}

/// One direction of a signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SignalSide {
    pub has_signal: bool,
    pub object_id: u8,
    pub occupied: bool,
    /// Trains holding the block. Above one only after a forced pass.
    pub holders: u8,
    /// 0 clear, 1 red, 2 yellow, 3 double yellow, 8 forced red.
    pub aspect: u8,
}

/// Signal layered on top of a track element. `left` guards forward travel
/// over the piece, `right` guards reversed travel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SignalElement {
    pub left: SignalSide,
    pub right: SignalSide,
    pub left_ghost: bool,
    pub right_ghost: bool,
}

impl SignalElement {
    pub fn side(&self, reversed: bool) -> &SignalSide {
        if reversed {
            &self.right
        } else {
            &self.left
        }
    }

    pub fn side_mut(&mut self, reversed: bool) -> &mut SignalSide {
        if reversed {
            &mut self.right
        } else {
            &mut self.left
        }
    }

    pub fn is_side_ghost(&self, reversed: bool) -> bool {
        if reversed {
            self.right_ghost
        } else {
            self.left_ghost
        }
    }

    /// A side a vehicle must obey: present and not a placement preview.
    pub fn has_live_signal(&self, reversed: bool) -> bool {
        self.side(reversed).has_signal && !self.is_side_ghost(reversed)
    }
}

/// Station platform/stop layered on top of a track or road element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct StationElement {
    pub station_id: StationId,
    pub ghost: bool,
    pub ai_allocated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SurfaceElement {
    pub base_z: i32,
}

/// Tagged element stored in a tile's fixed element sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum TileElement {
    Surface(SurfaceElement),
    Track(PieceElement),
    Road(PieceElement),
    Signal(SignalElement),
    Station(StationElement),
}

impl TileElement {
    pub fn as_track(&self) -> Option<&PieceElement> {
        match self {
            TileElement::Track(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_road(&self) -> Option<&PieceElement> {
        match self {
            TileElement::Road(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_piece(&self, kind: NetworkKind) -> Option<&PieceElement> {
        match kind {
            NetworkKind::Track => self.as_track(),
            NetworkKind::Road => self.as_road(),
        }
    }

    pub fn as_signal(&self) -> Option<&SignalElement> {
        match self {
            TileElement::Signal(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_signal_mut(&mut self) -> Option<&mut SignalElement> {
        match self {
            TileElement::Signal(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_station(&self) -> Option<&StationElement> {
        match self {
            TileElement::Station(el) => Some(el),
            _ => None,
        }
    }
}
