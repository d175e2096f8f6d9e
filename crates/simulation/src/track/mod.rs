//! Connection graph over the tile store.
//!
//! Given the tile a vehicle is about to enter and the rotation it arrives
//! with, `get_track_connections` / `get_road_connections` scan the tile's
//! elements and return every piece that can be entered from there, in the
//! tile's element order. The same piece is discoverable from both ends
//! (forward from segment 0, reversed from the last segment), so traversal
//! is symmetric: following a descriptor and querying back from its end with
//! the opposite rotation finds the reversed descriptor leading home.
//!
//! Descriptors pack the track-and-direction in the low bits and carry
//! bridge / mods / signal-ahead flags above `BASIC_TAD_MASK`; station and
//! level-crossing findings come back in the `ConnectionSet` itself.

pub mod connections;
pub mod geometry;
pub mod pathing;
pub mod tad;

#[cfg(test)]
mod tests;

pub use connections::{
    find_entry_element, get_connections, get_road_connections, get_track_connections,
    station_on_piece, ConnectionFilter, ConnectionSet,
};
pub use geometry::{connection_end, connection_start, piece_length, reverse_entry, PieceKey};
pub use pathing::choose_connection;
pub use tad::*;
