//! Vehicles: trains, road vehicles, ships and aircraft.
//!
//! A vehicle is a head, two metadata records (motion and motive totals),
//! one or more cars and a tail. Rail and road vehicles follow the
//! connection graph piece by piece, remembering the pieces their head
//! entered in a 64-slot routing ring; every car's position is derived by
//! walking that ring back from the head. Ships and aircraft steer straight
//! at their target station.
//!
//! The head runs a status machine (see `Status`). Per tick the list is
//! updated front to back; daily and monthly bookkeeping run after the
//! tick that closes a day or month.

pub mod air;
pub mod commands;
pub mod lifecycle;
pub mod movement;
pub mod state;
pub mod systems;
pub mod train;
pub mod types;
pub mod update;


pub use lifecycle::{next_breakdown_timer, DailyOutcome};
pub use state::VehicleManager;
pub use systems::VehiclesPlugin;
pub use train::Train;
pub use types::*;
pub use update::{leading_cargo_orders, OtherVehicles, SimContext};
