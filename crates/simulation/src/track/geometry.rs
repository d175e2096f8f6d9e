//! Piece geometry table and the coordinate maths built on it.
//!
//! Every piece is described once at rotation 0; placed pieces are rotated
//! a quarter turn at a time with `(x, y) -> (y, -x)`.

use crate::config::TILE_SIZE;
use crate::world::{Pos3, TilePos};

use super::tad::PieceDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentOffset {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

const fn seg(x: i32, y: i32, z: i32) -> SegmentOffset {
    SegmentOffset { x, y, z }
}

#[derive(Debug, Clone, Copy)]
pub struct PieceGeometry {
    pub name: &'static str,
    pub segments: &'static [SegmentOffset],
    /// Rotation a vehicle has when leaving the piece (at placement rotation 0).
    pub rotation_end: u8,
    /// Offset from the piece origin to the next piece's origin.
    pub exit: SegmentOffset,
}

impl PieceGeometry {
    pub fn last_segment(&self) -> SegmentOffset {
        self.segments[self.segments.len() - 1]
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

pub const PIECES: [PieceGeometry; 7] = [
    PieceGeometry {
        name: "straight",
        segments: &[seg(0, 0, 0)],
        rotation_end: 0,
        exit: seg(-32, 0, 0),
    },
    PieceGeometry {
        name: "small left curve",
        segments: &[seg(0, 0, 0)],
        rotation_end: 3,
        exit: seg(0, -32, 0),
    },
    PieceGeometry {
        name: "small right curve",
        segments: &[seg(0, 0, 0)],
        rotation_end: 1,
        exit: seg(0, 32, 0),
    },
    PieceGeometry {
        name: "large left curve",
        segments: &[seg(0, 0, 0), seg(0, -32, 0), seg(-32, 0, 0), seg(-32, -32, 0)],
        rotation_end: 3,
        exit: seg(-32, -64, 0),
    },
    PieceGeometry {
        name: "large right curve",
        segments: &[seg(0, 0, 0), seg(0, 32, 0), seg(-32, 0, 0), seg(-32, 32, 0)],
        rotation_end: 1,
        exit: seg(-32, 64, 0),
    },
    PieceGeometry {
        name: "slope up",
        segments: &[seg(0, 0, 0), seg(-32, 0, 0)],
        rotation_end: 0,
        exit: seg(-64, 0, 16),
    },
    PieceGeometry {
        name: "slope down",
        segments: &[seg(0, 0, -16), seg(-32, 0, -16)],
        rotation_end: 0,
        exit: seg(-64, 0, -16),
    },
];

pub const STRAIGHT: u8 = 0;
pub const SMALL_LEFT_CURVE: u8 = 1;
pub const SMALL_RIGHT_CURVE: u8 = 2;
pub const LARGE_LEFT_CURVE: u8 = 3;
pub const LARGE_RIGHT_CURVE: u8 = 4;
pub const SLOPE_UP: u8 = 5;
pub const SLOPE_DOWN: u8 = 6;

pub fn piece(id: u8) -> Option<&'static PieceGeometry> {
    PIECES.get(id as usize)
}

/// One tile step in each of the four rotations.
pub const ROTATION_STEPS: [(i32, i32); 4] = [
    (-TILE_SIZE, 0),
    (0, TILE_SIZE),
    (TILE_SIZE, 0),
    (0, -TILE_SIZE),
];

pub fn step(rotation: u8) -> Pos3 {
    let (x, y) = ROTATION_STEPS[(rotation & 3) as usize];
    Pos3::new(x, y, 0)
}

pub fn reverse_rotation(rotation: u8) -> u8 {
    (rotation + 2) & 3
}

pub fn rotate(x: i32, y: i32, rotation: u8) -> (i32, i32) {
    match rotation & 3 {
        0 => (x, y),
        1 => (y, -x),
        2 => (-x, -y),
        _ => (-y, x),
    }
}

fn rotated(offset: SegmentOffset, rotation: u8) -> Pos3 {
    let (x, y) = rotate(offset.x, offset.y, rotation);
    Pos3::new(x, y, offset.z)
}

/// Rotation a vehicle leaves the piece with, in placed coordinates.
pub fn placed_rotation_end(geometry: &PieceGeometry, rotation: u8) -> u8 {
    (geometry.rotation_end + rotation) & 3
}

/// Origin (segment 0 corner, travel height) of the piece a vehicle entered
/// at `entry` with direction `dir`.
pub fn piece_origin(entry: Pos3, dir: PieceDirection) -> Option<Pos3> {
    let geometry = piece(dir.id)?;
    if !dir.reversed {
        return Some(entry);
    }
    let last = rotated(geometry.last_segment(), dir.rotation);
    Some(Pos3::new(
        entry.x - last.x,
        entry.y - last.y,
        entry.z - geometry.exit.z,
    ))
}

/// Where the vehicle ends up after traversing the piece: the position to run
/// the next connection query at, and the rotation to query with.
pub fn connection_end(entry: Pos3, dir: PieceDirection) -> Option<(Pos3, u8)> {
    let geometry = piece(dir.id)?;
    if !dir.reversed {
        let exit = rotated(geometry.exit, dir.rotation);
        return Some((entry + exit, placed_rotation_end(geometry, dir.rotation)));
    }
    let origin = piece_origin(entry, dir)?;
    Some((origin - step(dir.rotation), reverse_rotation(dir.rotation)))
}

/// Inverse of `connection_end`: where a vehicle entered the piece `dir`
/// given the position it leaves that piece at.
pub fn connection_start(end: Pos3, dir: PieceDirection) -> Option<Pos3> {
    let geometry = piece(dir.id)?;
    if !dir.reversed {
        let exit = rotated(geometry.exit, dir.rotation);
        return Some(end - exit);
    }
    let origin = end + step(dir.rotation);
    let last = rotated(geometry.last_segment(), dir.rotation);
    Some(Pos3::new(
        origin.x + last.x,
        origin.y + last.y,
        origin.z + geometry.exit.z,
    ))
}

/// Direction-independent identity of a placed piece: its origin and
/// placement. Two vehicles on the same piece share a key whichever way they
/// travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceKey {
    pub origin: Pos3,
    pub id: u8,
    pub rotation: u8,
}

impl PieceKey {
    pub fn new(entry: Pos3, dir: PieceDirection) -> Option<Self> {
        Some(Self {
            origin: piece_origin(entry, dir)?,
            id: dir.id,
            rotation: dir.rotation,
        })
    }
}

/// Entry position and direction for traversing the same piece the other way.
pub fn reverse_entry(entry: Pos3, dir: PieceDirection) -> Option<(Pos3, PieceDirection)> {
    let (end, end_rotation) = connection_end(entry, dir)?;
    Some((end - step(end_rotation), dir.flipped()))
}

/// Tile and element height of every segment of a piece placed at `origin`.
pub fn segment_tiles(origin: Pos3, piece_id: u8, rotation: u8) -> Option<Vec<(TilePos, i32, u8)>> {
    let geometry = piece(piece_id)?;
    Some(
        geometry
            .segments
            .iter()
            .enumerate()
            .map(|(seq, offset)| {
                let at = origin + rotated(*offset, rotation);
                (at.tile(), at.small_z(), seq as u8)
            })
            .collect(),
    )
}

/// Movement distance of a piece.
pub fn piece_length(piece_id: u8) -> u32 {
    piece(piece_id)
        .map(|g| g.segment_count() as u32 * crate::config::DISTANCE_PER_SEGMENT)
        .unwrap_or(crate::config::DISTANCE_PER_SEGMENT)
}
