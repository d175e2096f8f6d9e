//! Tile store consulted by the vehicle simulation, and the validated
//! mutation entry point that edits it.
//!
//! Each tile holds a fixed sequence of tagged elements. Track and road
//! pieces may span several tiles (one element per segment); signals and
//! stations are layered directly on top of the piece element they belong to.

pub mod mutation;
pub mod state;
pub mod types;


use bevy::prelude::*;

pub use mutation::{apply_mutation, Mutation, MutationFlags, PieceRef, SignalSides};
pub use state::TileWorld;
pub use types::*;

pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TileWorld>();
        crate::register_saveable::<TileWorld>(app);
    }
}
