//! Junction routing: when a query yields several connections, pick the one
//! on the cheapest path to the station the vehicle is heading for.

use std::cell::Cell;

use pathfinding::prelude::dijkstra;

use crate::config::JUNCTION_SEARCH_LIMIT;
use crate::ids::StationId;
use crate::world::{NetworkKind, Pos3, TileWorld};

use super::connections::{decode, get_connections, station_on_piece, ConnectionFilter, ConnectionSet};
use super::geometry::{connection_end, piece_length};
use super::tad::{BASIC_RAD_MASK, BASIC_TAD_MASK};

fn basic_mask(kind: NetworkKind) -> u16 {
    match kind {
        NetworkKind::Track => BASIC_TAD_MASK,
        NetworkKind::Road => BASIC_RAD_MASK,
    }
}

/// Choose among `set.connections` (all entered at `entry`) the connection
/// whose shortest path reaches a piece carrying `target`. Falls back to the
/// first discovered connection when no target is given or none is reachable
/// within the search budget.
pub fn choose_connection(
    world: &TileWorld,
    kind: NetworkKind,
    entry: Pos3,
    set: &ConnectionSet,
    filter: &ConnectionFilter,
    target: Option<StationId>,
) -> Option<u16> {
    let first = *set.connections.first()?;
    let Some(target) = target else {
        return Some(first);
    };

    let mask = basic_mask(kind);
    let mut best: Option<(u32, u16)> = None;
    for &connection in &set.connections {
        let budget = Cell::new(JUNCTION_SEARCH_LIMIT);
        let start = (entry, connection & mask);
        let found = dijkstra(
            &start,
            |&(pos, tad): &(Pos3, u16)| {
                let remaining = budget.get();
                if remaining == 0 {
                    return Vec::new();
                }
                budget.set(remaining - 1);
                let dir = decode(kind, tad);
                let Some((end, rotation)) = connection_end(pos, dir) else {
                    return Vec::new();
                };
                get_connections(world, kind, end, rotation, filter)
                    .connections
                    .iter()
                    .map(|c| {
                        let next = c & mask;
                        ((end, next), piece_length(decode(kind, next).id))
                    })
                    .collect::<Vec<_>>()
            },
            |&(pos, tad): &(Pos3, u16)| {
                station_on_piece(world, kind, pos, decode(kind, tad)) == Some(target)
            },
        );
        if let Some((_, cost)) = found {
            if best.map_or(true, |(best_cost, _)| cost < best_cost) {
                best = Some((cost, connection));
            }
        }
    }
    Some(best.map_or(first, |(_, connection)| connection))
}
