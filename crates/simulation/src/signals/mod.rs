//! Block signalling.
//!
//! Every side of a signal element carries an occupied flag and an aspect.
//! A train claims the block behind a signal when its head enters the
//! signalled piece and gives it back once its tail has passed the next
//! signal, when it reverses, or when it is sold.
//!
//! A train that finds its side occupied waits. After a timeout it either
//! passes (the one-tile lookahead is clear) or reverses (an opposing train
//! is parked two pieces ahead, or it simply waited too long). One-way
//! signals wait long and then decide once; two-way signals re-check every
//! 64 ticks and give up sooner. Road vehicles follow the same scheme with
//! an occupied road piece as the "signal" and overtaking as the pass.

pub mod arbitration;
pub mod blocks;
pub mod types;


pub use arbitration::{
    lookahead_block_free, opposing_train_at_signal, rail_decision, road_decision, road_thresholds,
    Traffic,
};
pub use blocks::{claim_block, release_all, release_cleared, signal_state};
pub use types::*;
