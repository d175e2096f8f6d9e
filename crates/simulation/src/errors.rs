//! Error taxonomy of the vehicle simulation.
//!
//! * `ActionError`: validation failures of player/AI commands (order edits,
//!   signal placement, sell/clone/reverse). Returned through `ActionResult`
//!   and mirrored into `LastErrorText` for the command layer to present.
//! * `StructuralError`: corrupted simulation state (malformed train
//!   component chain, unknown order kind). Aborts only the operation that
//!   found it.
//!
//! Expected-negative outcomes (empty connection set, cargo not accepted)
//! are not errors and never show up here.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Encode, Decode)]
pub enum ActionError {
    NotFound,
    NotOwner,
    InsufficientFunds,
    /// The shared order table has no room for the new record.
    OrderTableFull,
    /// The vehicle already holds the maximum number of orders.
    TooManyOrders,
    InvalidOrderOffset,
    SignalNotAllowed,
    StationNotAllowed,
    NoTrackHere,
    AlreadyExists,
    VehicleStuck,
    VehicleNotPlaced,
    InvalidParameter(String),
    Structural(StructuralError),
}

pub type ActionResult<T> = Result<T, ActionError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Encode, Decode)]
pub enum StructuralError {
    MissingHead,
    DuplicateHead,
    MissingVehicle1,
    MissingVehicle2,
    MissingTail,
    CarMissingBogie,
    CarMissingBody,
    UnexpectedComponent,
    UnknownOrderKind(u8),
    TruncatedOrder,
}

impl From<StructuralError> for ActionError {
    fn from(err: StructuralError) -> Self {
        ActionError::Structural(err)
    }
}

/// The last validation failure raised by a command, for the command layer's
/// error window.
#[derive(Resource, Debug, Clone, Default)]
pub struct LastErrorText(pub Option<ActionError>);

impl LastErrorText {
    /// Record `result`'s error (if any) and hand the result back unchanged.
    pub fn record<T>(&mut self, result: ActionResult<T>) -> ActionResult<T> {
        if let Err(err) = &result {
            self.0 = Some(err.clone());
        }
        result
    }
}
