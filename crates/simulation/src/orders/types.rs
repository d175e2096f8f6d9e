use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::errors::StructuralError;
use crate::ids::{CargoId, StationId};
use crate::track::PieceDirection;
use crate::world::TilePos;

// =============================================================================
// Order kinds
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum OrderKind {
    End = 0,
    StopAt = 1,
    RouteThrough = 2,
    RouteWaypoint = 3,
    UnloadAll = 4,
    WaitFor = 5,
}

/// Record length in bytes, indexed by kind.
const ORDER_SIZES: [usize; 6] = [1, 2, 2, 6, 2, 2];

pub const HAS_NUMBER: u8 = 1 << 0;
pub const HAS_STATION: u8 = 1 << 1;
pub const HAS_CARGO: u8 = 1 << 2;
pub const IS_ROUTABLE: u8 = 1 << 3;

impl OrderKind {
    pub fn from_byte(byte: u8) -> Result<Self, StructuralError> {
        match byte & 0x07 {
            0 => Ok(OrderKind::End),
            1 => Ok(OrderKind::StopAt),
            2 => Ok(OrderKind::RouteThrough),
            3 => Ok(OrderKind::RouteWaypoint),
            4 => Ok(OrderKind::UnloadAll),
            5 => Ok(OrderKind::WaitFor),
            other => Err(StructuralError::UnknownOrderKind(other)),
        }
    }

    pub fn size(self) -> usize {
        ORDER_SIZES[self as usize]
    }

    pub fn flags(self) -> u8 {
        match self {
            OrderKind::End => 0,
            OrderKind::StopAt | OrderKind::RouteThrough => HAS_NUMBER | HAS_STATION | IS_ROUTABLE,
            OrderKind::RouteWaypoint => HAS_NUMBER | IS_ROUTABLE,
            OrderKind::UnloadAll | OrderKind::WaitFor => HAS_CARGO,
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A waypoint the vehicle must pass over with the given track and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct Waypoint {
    pub tile: TilePos,
    /// Rotation in bits 0-1, reversed in bit 2.
    pub direction: u8,
    pub track_id: u8,
}

impl Waypoint {
    pub fn new(tile: TilePos, dir: PieceDirection) -> Self {
        Self {
            tile,
            direction: (dir.rotation & 3) | ((dir.reversed as u8) << 2),
            track_id: dir.id & 0x3F,
        }
    }

    pub fn matches(&self, tile: TilePos, dir: PieceDirection) -> bool {
        *self == Waypoint::new(tile, dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum Order {
    End,
    StopAt(StationId),
    RouteThrough(StationId),
    RouteWaypoint(Waypoint),
    UnloadAll(CargoId),
    WaitFor(CargoId),
}

impl Order {
    pub fn kind(&self) -> OrderKind {
        match self {
            Order::End => OrderKind::End,
            Order::StopAt(_) => OrderKind::StopAt,
            Order::RouteThrough(_) => OrderKind::RouteThrough,
            Order::RouteWaypoint(_) => OrderKind::RouteWaypoint,
            Order::UnloadAll(_) => OrderKind::UnloadAll,
            Order::WaitFor(_) => OrderKind::WaitFor,
        }
    }

    pub fn size(&self) -> usize {
        self.kind().size()
    }

    pub fn has_flags(&self, flags: u8) -> bool {
        self.kind().flags() & flags == flags
    }

    pub fn is_routable(&self) -> bool {
        self.has_flags(IS_ROUTABLE)
    }

    pub fn station(&self) -> Option<StationId> {
        match self {
            Order::StopAt(s) | Order::RouteThrough(s) => Some(*s),
            _ => None,
        }
    }

    pub fn cargo(&self) -> Option<CargoId> {
        match self {
            Order::UnloadAll(c) | Order::WaitFor(c) => Some(*c),
            _ => None,
        }
    }

    /// Packed record bytes.
    pub fn encode(&self) -> Vec<u8> {
        let kind = self.kind() as u8;
        match self {
            Order::End => vec![kind],
            Order::StopAt(station) | Order::RouteThrough(station) => {
                let id = station.0 & StationId::MAX;
                vec![kind | (((id >> 8) as u8) << 6), (id & 0xFF) as u8]
            }
            Order::RouteWaypoint(wp) => {
                let x = (wp.tile.x as u16).to_le_bytes();
                let y = (wp.tile.y as u16).to_le_bytes();
                vec![
                    kind | ((wp.direction & 0x07) << 3),
                    x[0],
                    x[1],
                    y[0],
                    y[1],
                    wp.track_id & 0x3F,
                ]
            }
            Order::UnloadAll(cargo) | Order::WaitFor(cargo) => vec![kind, *cargo],
        }
    }

    /// Decode the record at the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Order, StructuralError> {
        let first = *bytes.first().ok_or(StructuralError::TruncatedOrder)?;
        let kind = OrderKind::from_byte(first)?;
        let record = bytes.get(..kind.size()).ok_or(StructuralError::TruncatedOrder)?;
        let order = match kind {
            OrderKind::End => Order::End,
            OrderKind::StopAt | OrderKind::RouteThrough => {
                let station = StationId((((record[0] >> 6) as u16) << 8) | record[1] as u16);
                if kind == OrderKind::StopAt {
                    Order::StopAt(station)
                } else {
                    Order::RouteThrough(station)
                }
            }
            OrderKind::RouteWaypoint => Order::RouteWaypoint(Waypoint {
                tile: TilePos::new(
                    u16::from_le_bytes([record[1], record[2]]) as i32,
                    u16::from_le_bytes([record[3], record[4]]) as i32,
                ),
                direction: (record[0] >> 3) & 0x07,
                track_id: record[5] & 0x3F,
            }),
            OrderKind::UnloadAll => Order::UnloadAll(record[1]),
            OrderKind::WaitFor => Order::WaitFor(record[1]),
        };
        Ok(order)
    }
}

/// A vehicle's window onto the shared order table: its byte range and the
/// offset (relative to the range) of the order it is working on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct OrderCursor {
    pub table_offset: u32,
    pub table_size: u16,
    pub current_order: u16,
}

impl OrderCursor {
    /// Absolute table offset of the current order.
    pub fn current_absolute(&self) -> u32 {
        self.table_offset + self.current_order as u32
    }

    pub fn end(&self) -> u32 {
        self.table_offset + self.table_size as u32
    }
}

/// Marker drawn on the map for a numbered order; follows its order through
/// table edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct NumberDisplayFrame {
    /// Absolute table offset of the order this frame labels.
    pub order_offset: u32,
    pub line_number: u8,
}
