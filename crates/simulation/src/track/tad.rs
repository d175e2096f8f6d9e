use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

// =============================================================================
// Connection descriptor bits
// =============================================================================

/// Piece id, reversed bit and rotation of a track descriptor.
pub const BASIC_TAD_MASK: u16 = 0x1FF;
/// Piece id, reversed bit and rotation of a road descriptor (no lane bits).
pub const BASIC_RAD_MASK: u16 = 0x7F;
pub const HAS_BRIDGE: u16 = 1 << 9;
pub const HAS_MODS: u16 = 1 << 10;
/// Marks a routing slot where the vehicle chose between several connections.
pub const JUNCTION_CHOICE: u16 = 1 << 14;
pub const HAS_SIGNAL: u16 = 1 << 15;

/// Decoded {piece id, reversed, rotation} used by the geometry code for
/// both networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceDirection {
    pub id: u8,
    pub reversed: bool,
    pub rotation: u8,
}

impl PieceDirection {
    pub fn flipped(self) -> Self {
        Self {
            reversed: !self.reversed,
            ..self
        }
    }
}

// =============================================================================
// Track
// =============================================================================

/// Rail track-and-direction: `(id << 3) | (reversed << 2) | rotation`, id is
/// 6 bits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct TrackAndDirection(pub u16);

impl TrackAndDirection {
    pub fn new(id: u8, reversed: bool, rotation: u8) -> Self {
        Self((((id & 0x3F) as u16) << 3) | ((reversed as u16) << 2) | (rotation & 3) as u16)
    }

    /// Strip descriptor flags from a connection value.
    pub fn from_connection(connection: u16) -> Self {
        Self(connection & BASIC_TAD_MASK)
    }

    pub fn id(self) -> u8 {
        ((self.0 >> 3) & 0x3F) as u8
    }

    pub fn is_reversed(self) -> bool {
        self.0 & (1 << 2) != 0
    }

    pub fn rotation(self) -> u8 {
        (self.0 & 3) as u8
    }

    pub fn reversed(self) -> Self {
        Self(self.0 ^ (1 << 2))
    }

    pub fn direction(self) -> PieceDirection {
        PieceDirection {
            id: self.id(),
            reversed: self.is_reversed(),
            rotation: self.rotation(),
        }
    }
}

// =============================================================================
// Road
// =============================================================================

/// Road-and-direction: 4-bit id plus the overtaking (bit 7) and
/// changing-lane (bit 8) flags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct RoadAndDirection(pub u16);

impl RoadAndDirection {
    const OVERTAKING: u16 = 1 << 7;
    const CHANGING_LANE: u16 = 1 << 8;

    pub fn new(id: u8, reversed: bool, rotation: u8) -> Self {
        Self((((id & 0x0F) as u16) << 3) | ((reversed as u16) << 2) | (rotation & 3) as u16)
    }

    pub fn from_connection(connection: u16) -> Self {
        Self(connection & BASIC_RAD_MASK)
    }

    pub fn id(self) -> u8 {
        ((self.0 >> 3) & 0x0F) as u8
    }

    pub fn is_reversed(self) -> bool {
        self.0 & (1 << 2) != 0
    }

    pub fn rotation(self) -> u8 {
        (self.0 & 3) as u8
    }

    pub fn reversed(self) -> Self {
        Self(self.0 ^ (1 << 2))
    }

    pub fn is_overtaking(self) -> bool {
        self.0 & Self::OVERTAKING != 0
    }

    pub fn with_overtaking(self, overtaking: bool) -> Self {
        if overtaking {
            Self(self.0 | Self::OVERTAKING)
        } else {
            Self(self.0 & !Self::OVERTAKING)
        }
    }

    pub fn is_changing_lane(self) -> bool {
        self.0 & Self::CHANGING_LANE != 0
    }

    pub fn with_changing_lane(self, changing: bool) -> Self {
        if changing {
            Self(self.0 | Self::CHANGING_LANE)
        } else {
            Self(self.0 & !Self::CHANGING_LANE)
        }
    }

    /// Id, reversed bit and rotation only.
    pub fn basic(self) -> u16 {
        self.0 & BASIC_RAD_MASK
    }

    pub fn direction(self) -> PieceDirection {
        PieceDirection {
            id: self.id(),
            reversed: self.is_reversed(),
            rotation: self.rotation(),
        }
    }
}
