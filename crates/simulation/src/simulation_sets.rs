//! Deterministic ordering of the vehicle simulation via `SystemSet` phases.
//!
//! ```text
//! PreSim  →  Simulation  →  PostSim
//! ```
//!
//! * **PreSim** – Tick counter and calendar. Decides whether this tick
//!   closes a day or a month.
//! * **Simulation** – The per-tick vehicle update: every vehicle in list
//!   order, connection queries, signal arbitration, station arrival and
//!   cargo transfer.
//! * **PostSim** – Daily and monthly vehicle bookkeeping (reliability,
//!   breakdowns, crash timers, running costs) when the calendar rolled over.
//!
//! Every system of this crate registered in `FixedUpdate` sits in one of
//! these sets; the chain is configured by `SimulationPlugin`.

use bevy::prelude::*;

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    PreSim,
    Simulation,
    PostSim,
}
