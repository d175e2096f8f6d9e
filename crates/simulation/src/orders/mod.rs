//! Order ring: every vehicle's orders live back to back in one shared byte
//! table. A vehicle sees its own sub-range through an `OrderCursor` and walks
//! it as a closed loop with `OrderRingView`.
//!
//! Inserting or deleting a record shifts the tail of the table, so every
//! other vehicle whose range starts past the edit point (and every number
//! display frame) is rebased explicitly by the edit itself.

pub mod ring;
pub mod table;
pub mod types;


use bevy::prelude::*;

pub use ring::{OrderEntry, OrderRingView};
pub use table::{OrderOwners, OrderTable};
pub use types::*;

pub struct OrdersPlugin;

impl Plugin for OrdersPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OrderTable>();
        crate::register_saveable::<OrderTable>(app);
    }
}
