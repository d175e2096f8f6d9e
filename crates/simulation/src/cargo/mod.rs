//! Cargo transfer at stations.
//!
//! On arrival a vehicle unloads one component per step: front bogie
//! (secondary hold), back bogie (nothing), body (primary hold), car by car.
//! Each step sets a timeout proportional to the quantity moved, so a long
//! train takes visibly longer to work. Cargo the station accepts is paid
//! for on the spot; anything else stays aboard unless an `UnloadAll` order
//! drops it into the station's stock. Loading then fills the same holds in
//! the same order from station stock, and a `WaitFor` order keeps the
//! vehicle loading until every hold of that type is full.

pub mod payment;
pub mod transfer;

#[cfg(test)]
mod tests;

pub use payment::{calculate_delivered_cargo_payment, loading_modifier, transfer_timeout};
pub use transfer::{begin_loading, begin_unloading, update_loading, update_unloading};
