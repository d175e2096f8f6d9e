//! `VehicleManager`: the ordered vehicle list, its id allocator and the
//! `Saveable` implementation.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::ids::VehicleId;
use crate::orders::{OrderCursor, OrderOwners};
use crate::Saveable;

use super::train::Train;
use super::types::VehicleComponent;

/// Every vehicle in update order. Removal keeps the order of the rest.
#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize)]
pub struct VehicleManager {
    pub trains: Vec<Train>,
    pub next_id: u32,
}

impl VehicleManager {
    pub fn get(&self, id: VehicleId) -> Option<&Train> {
        self.trains.iter().find(|t| t.head.id == id)
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut Train> {
        self.trains.iter_mut().find(|t| t.head.id == id)
    }

    pub fn index_of(&self, id: VehicleId) -> Option<usize> {
        self.trains.iter().position(|t| t.head.id == id)
    }

    pub fn len(&self) -> usize {
        self.trains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }

    pub(crate) fn allocate_id(&mut self) -> VehicleId {
        let id = VehicleId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Drop vehicles by id, keeping everybody else in place.
    pub(crate) fn remove_ids(&mut self, ids: &[VehicleId]) {
        if ids.is_empty() {
            return;
        }
        self.trains.retain(|t| !ids.contains(&t.head.id));
    }
}

impl OrderOwners for VehicleManager {
    fn cursor_mut(&mut self, vehicle: VehicleId) -> Option<&mut OrderCursor> {
        self.get_mut(vehicle).map(|t| &mut t.head.orders)
    }

    fn for_each_cursor(&mut self, f: &mut dyn FnMut(VehicleId, &mut OrderCursor)) {
        for train in &mut self.trains {
            f(train.head.id, &mut train.head.orders);
        }
    }
}

// =============================================================================
// Saveable
// =============================================================================

/// On-disk shape: each vehicle as its component chain.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
struct SavedVehicles {
    chains: Vec<Vec<VehicleComponent>>,
    next_id: u32,
}

impl Saveable for VehicleManager {
    const SAVE_KEY: &'static str = "vehicle_manager";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.trains.is_empty() && self.next_id == 0 {
            return None;
        }
        let saved = SavedVehicles {
            chains: self.trains.iter().map(Train::to_components).collect(),
            next_id: self.next_id,
        };
        Some(bitcode::encode(&saved))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        let saved: SavedVehicles = crate::decode_or_warn(Self::SAVE_KEY, bytes);
        let mut trains = Vec::with_capacity(saved.chains.len());
        for (i, chain) in saved.chains.into_iter().enumerate() {
            match Train::from_components(chain) {
                Ok(train) => trains.push(train),
                Err(e) => warn!("VehicleManager: skipping saved vehicle {}: {:?}", i, e),
            }
        }
        let next_id = trains
            .iter()
            .map(|t| t.head.id.0 + 1)
            .max()
            .unwrap_or(0)
            .max(saved.next_id);
        Self { trains, next_id }
    }
}
