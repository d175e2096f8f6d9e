//! Identifier newtypes shared by every subsystem.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Company (owner) identifier. Index into `CompanyManager::companies`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct CompanyId(pub u8);

impl CompanyId {
    /// Owner of neutral infrastructure (public roads).
    pub const NEUTRAL: CompanyId = CompanyId(0xFF);
}

/// Station identifier. Orders can address 10 bits worth of stations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct StationId(pub u16);

impl StationId {
    pub const MAX: u16 = 0x3FF;
}

/// Vehicle (train/road vehicle/ship/aircraft) identifier, stable for the
/// lifetime of the vehicle and never reused within a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct VehicleId(pub u32);

/// Cargo type index into `ObjectRegistry::cargo`.
pub type CargoId = u8;

/// Money in the smallest currency unit.
pub type Money = i64;
