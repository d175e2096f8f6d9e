use crate::config::{MAX_CONNECTIONS, SMALL_Z_STEP};
use crate::ids::{CompanyId, StationId};
use crate::world::{NetworkKind, Pos3, TilePos, TileWorld};

use super::geometry::{self, piece_origin, placed_rotation_end, reverse_rotation, rotate};
use super::tad::{
    PieceDirection, RoadAndDirection, TrackAndDirection, HAS_BRIDGE, HAS_MODS, HAS_SIGNAL,
};

/// Access and compatibility filter for one connection query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionFilter {
    pub company: CompanyId,
    pub object_id: u8,
    /// Every bit must be installed on the element.
    pub required_mods: u8,
    /// Any bit installed on the element sets `HAS_MODS` on the descriptor.
    pub query_mods: u8,
    /// Pieces of this object may be used regardless of owner (global roads).
    pub shared: bool,
}

impl ConnectionFilter {
    pub fn new(company: CompanyId, object_id: u8) -> Self {
        Self {
            company,
            object_id,
            required_mods: 0,
            query_mods: 0,
            shared: false,
        }
    }
}

/// Result of a connection query: descriptors in tile-element discovery order
/// plus everything the scan found on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSet {
    pub connections: Vec<u16>,
    /// First live station layered on a matched element.
    pub station_id: Option<StationId>,
    /// A matched element shares its tile and height with the other network.
    pub has_level_crossing: bool,
}

impl ConnectionSet {
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    fn push(&mut self, connection: u16) {
        // A valid layout never produces more; anything beyond is dropped.
        if self.connections.len() < MAX_CONNECTIONS {
            self.connections.push(connection);
        }
    }
}

/// Rail connections available to a train arriving at `pos` with `rotation`.
pub fn get_track_connections(
    world: &TileWorld,
    pos: Pos3,
    rotation: u8,
    filter: &ConnectionFilter,
) -> ConnectionSet {
    scan_connections(world, NetworkKind::Track, pos, rotation, filter)
}

/// Road connections available to a road vehicle arriving at `pos` with `rotation`.
pub fn get_road_connections(
    world: &TileWorld,
    pos: Pos3,
    rotation: u8,
    filter: &ConnectionFilter,
) -> ConnectionSet {
    scan_connections(world, NetworkKind::Road, pos, rotation, filter)
}

/// Query dispatch on the network kind.
pub fn get_connections(
    world: &TileWorld,
    kind: NetworkKind,
    pos: Pos3,
    rotation: u8,
    filter: &ConnectionFilter,
) -> ConnectionSet {
    scan_connections(world, kind, pos, rotation, filter)
}

pub fn encode(kind: NetworkKind, id: u8, reversed: bool, rotation: u8) -> u16 {
    match kind {
        NetworkKind::Track => TrackAndDirection::new(id, reversed, rotation).0,
        NetworkKind::Road => RoadAndDirection::new(id, reversed, rotation).0,
    }
}

/// Decode a connection value of either network into its piece direction.
pub fn decode(kind: NetworkKind, connection: u16) -> PieceDirection {
    match kind {
        NetworkKind::Track => TrackAndDirection::from_connection(connection).direction(),
        NetworkKind::Road => RoadAndDirection::from_connection(connection).direction(),
    }
}

fn other_network(kind: NetworkKind) -> NetworkKind {
    match kind {
        NetworkKind::Track => NetworkKind::Road,
        NetworkKind::Road => NetworkKind::Track,
    }
}

fn scan_connections(
    world: &TileWorld,
    kind: NetworkKind,
    pos: Pos3,
    rotation: u8,
    filter: &ConnectionFilter,
) -> ConnectionSet {
    let tile_pos = pos.tile();
    let mut result = ConnectionSet::default();

    for (index, element) in world.tile(tile_pos).iter().enumerate() {
        let Some(el) = element.as_piece(kind) else {
            continue;
        };
        if !el.is_live() {
            continue;
        }
        if el.owner != filter.company && el.owner != CompanyId::NEUTRAL && !filter.shared {
            continue;
        }
        if el.object_id != filter.object_id {
            continue;
        }
        if el.mods & filter.required_mods != filter.required_mods {
            continue;
        }
        let Some(geometry) = geometry::piece(el.piece_id) else {
            continue;
        };

        let forward = el.sequence == 0
            && el.rotation == rotation
            && el.base_z == (pos.z + geometry.segments[0].z).div_euclid(SMALL_Z_STEP);
        let reversed = el.is_last_segment
            && reverse_rotation(placed_rotation_end(geometry, el.rotation)) == rotation
            && el.base_z
                == (pos.z - geometry.exit.z + geometry.last_segment().z).div_euclid(SMALL_Z_STEP);

        for (matched, is_reversed) in [(forward, false), (reversed, true)] {
            if !matched {
                continue;
            }
            let mut connection = encode(kind, el.piece_id, is_reversed, el.rotation);
            if el.has_bridge {
                connection |= HAS_BRIDGE;
            }
            if el.mods & filter.query_mods != 0 {
                connection |= HAS_MODS;
            }
            if let Some(signal) = world.layered_signal(tile_pos, index) {
                if signal.has_live_signal(is_reversed) {
                    connection |= HAS_SIGNAL;
                }
            }
            if let Some(station) = world.layered_station(tile_pos, index) {
                if result.station_id.is_none() && !station.ghost && !station.ai_allocated {
                    result.station_id = Some(station.station_id);
                }
            }
            if world.has_piece_at(other_network(kind), tile_pos, el.base_z) {
                result.has_level_crossing = true;
            }
            result.push(connection);
        }
    }
    result
}

/// Tile and element index of the segment a vehicle entering at `entry`
/// with `dir` stands on first (segment 0 forward, last segment reversed).
pub fn find_entry_element(
    world: &TileWorld,
    kind: NetworkKind,
    entry: Pos3,
    dir: PieceDirection,
) -> Option<(TilePos, usize)> {
    let geometry = geometry::piece(dir.id)?;
    let origin = piece_origin(entry, dir)?;
    let (sequence, offset) = if dir.reversed {
        (geometry.segment_count() - 1, geometry.last_segment())
    } else {
        (0, geometry.segments[0])
    };
    let (x, y) = rotate(offset.x, offset.y, dir.rotation);
    let at = Pos3::new(origin.x + x, origin.y + y, origin.z + offset.z);
    let tile = at.tile();
    let index = world.find_piece(kind, tile, dir.id, dir.rotation, sequence as u8, at.small_z())?;
    Some((tile, index))
}

/// Station layered on the piece a vehicle entered at `entry`, if live.
pub fn station_on_piece(
    world: &TileWorld,
    kind: NetworkKind,
    entry: Pos3,
    dir: PieceDirection,
) -> Option<StationId> {
    let (tile, index) = find_entry_element(world, kind, entry, dir)?;
    world
        .layered_station(tile, index)
        .filter(|st| !st.ghost && !st.ai_allocated)
        .map(|st| st.station_id)
}
