use serde::{Deserialize, Serialize};

use crate::config::ROUTING_RING_SIZE;
use crate::errors::StructuralError;
use crate::objects::{ObjectRegistry, TransportMode};
use crate::track::connections::decode;
use crate::track::{connection_start, piece_length, ConnectionFilter, PieceDirection, PieceKey};
use crate::world::{NetworkKind, Pos3};

use super::types::*;

/// A whole vehicle: head, the two metadata records, its cars and the tail.
/// Road vehicles, ships and aircraft are trains with one car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Train {
    pub head: VehicleHead,
    pub veh1: Vehicle1,
    pub veh2: Vehicle2,
    pub cars: Vec<Car>,
    pub tail: Tail,
}

impl Train {
    /// Assemble a train from its component chain. The chain must read
    /// Head, Vehicle1, Vehicle2, then (FrontBogie, BackBogie, Body) per car,
    /// then Tail, and nothing after it.
    pub fn from_components(components: Vec<VehicleComponent>) -> Result<Train, StructuralError> {
        use VehicleComponent as C;

        let mut chain = components.into_iter();
        let head = match chain.next() {
            Some(C::Head(head)) => head,
            _ => return Err(StructuralError::MissingHead),
        };
        let veh1 = match chain.next() {
            Some(C::Vehicle1(veh1)) => veh1,
            Some(C::Head(_)) => return Err(StructuralError::DuplicateHead),
            _ => return Err(StructuralError::MissingVehicle1),
        };
        let veh2 = match chain.next() {
            Some(C::Vehicle2(veh2)) => veh2,
            Some(C::Head(_)) => return Err(StructuralError::DuplicateHead),
            _ => return Err(StructuralError::MissingVehicle2),
        };

        let mut cars = Vec::new();
        loop {
            match chain.next() {
                Some(C::FrontBogie(front)) => {
                    let back = match chain.next() {
                        Some(C::BackBogie(back)) => back,
                        _ => return Err(StructuralError::CarMissingBogie),
                    };
                    let body = match chain.next() {
                        Some(C::Body(body)) => body,
                        _ => return Err(StructuralError::CarMissingBody),
                    };
                    cars.push(Car { front, back, body });
                }
                Some(C::BackBogie(_)) | Some(C::Body(_)) => return Err(StructuralError::CarMissingBogie),
                Some(C::Head(_)) => return Err(StructuralError::DuplicateHead),
                Some(C::Vehicle1(_)) | Some(C::Vehicle2(_)) => {
                    return Err(StructuralError::UnexpectedComponent)
                }
                Some(C::Tail(tail)) => {
                    if chain.next().is_some() {
                        return Err(StructuralError::UnexpectedComponent);
                    }
                    return Ok(Train {
                        head,
                        veh1,
                        veh2,
                        cars,
                        tail,
                    });
                }
                None => return Err(StructuralError::MissingTail),
            }
        }
    }

    /// The component chain, head first.
    pub fn to_components(&self) -> Vec<VehicleComponent> {
        let mut chain = Vec::with_capacity(4 + self.cars.len() * 3);
        chain.push(VehicleComponent::Head(self.head.clone()));
        chain.push(VehicleComponent::Vehicle1(self.veh1.clone()));
        chain.push(VehicleComponent::Vehicle2(self.veh2.clone()));
        for car in &self.cars {
            chain.push(VehicleComponent::FrontBogie(car.front.clone()));
            chain.push(VehicleComponent::BackBogie(car.back.clone()));
            chain.push(VehicleComponent::Body(car.body.clone()));
        }
        chain.push(VehicleComponent::Tail(self.tail.clone()));
        chain
    }

    // -------------------------------------------------------------------------
    // Network
    // -------------------------------------------------------------------------

    pub fn network_kind(&self) -> Option<NetworkKind> {
        match self.head.mode {
            TransportMode::Rail => Some(NetworkKind::Track),
            TransportMode::Road => Some(NetworkKind::Road),
            TransportMode::Air | TransportMode::Water => None,
        }
    }

    pub fn connection_filter(&self, objects: &ObjectRegistry) -> ConnectionFilter {
        let shared = self.head.mode == TransportMode::Road
            && objects.road(self.head.network_object).is_some_and(|r| r.is_global);
        ConnectionFilter {
            required_mods: self.head.required_mods,
            shared,
            ..ConnectionFilter::new(self.head.owner, self.head.network_object)
        }
    }

    /// Direction of the piece the head is on.
    pub fn direction(&self) -> Option<PieceDirection> {
        Some(decode(self.network_kind()?, self.head.connection))
    }

    /// Length from the front of the first car to the back of the last.
    pub fn length(&self) -> u32 {
        self.cars.iter().map(|c| c.body.length).sum()
    }

    /// Put the head at the start of a piece and forget where it came from.
    pub fn place(&mut self, entry: Pos3, connection: u16) {
        self.head.entry = entry;
        self.head.connection = connection;
        self.head.progress = 0;
        self.head.placed = true;
        self.head.routing.clear();
        self.head.routing.push(connection);
        self.head.journey_start = entry;
    }

    /// Pieces from the head's back to the one holding the point `distance`
    /// behind the head, with the sub-position there. Stops early (at the
    /// start of the oldest piece) when the routing ring runs out.
    fn walk_back(&self, distance: u32) -> Option<(Vec<(Pos3, u16)>, u32)> {
        let kind = self.network_kind()?;
        if !self.head.placed {
            return None;
        }
        let mut pieces = vec![(self.head.entry, self.head.connection)];
        let mut behind = distance;
        let mut sub = self.head.progress;
        while behind > sub {
            behind -= sub;
            if pieces.len() >= ROUTING_RING_SIZE {
                return Some((pieces, 0));
            }
            let Some(previous) = self.head.routing.behind(pieces.len()) else {
                return Some((pieces, 0));
            };
            let dir = decode(kind, previous);
            let (later_entry, _) = pieces[pieces.len() - 1];
            let Some(entry) = connection_start(later_entry, dir) else {
                return Some((pieces, 0));
            };
            pieces.push((entry, previous));
            sub = piece_length(dir.id);
        }
        Some((pieces, sub - behind))
    }

    /// Where the component `distance` behind the head stands.
    pub fn locate(&self, distance: u32) -> Option<RoutingHandle> {
        let (pieces, sub_position) = self.walk_back(distance)?;
        let ring_index = pieces.len() - 1;
        let (entry, connection) = pieces[ring_index];
        Some(RoutingHandle {
            ring_index,
            entry,
            connection,
            sub_position,
        })
    }

    /// Every piece some part of the train stands on, head's piece first.
    pub fn occupied_pieces(&self) -> Vec<(Pos3, u16)> {
        self.walk_back(self.length()).map(|(pieces, _)| pieces).unwrap_or_default()
    }

    pub fn occupied_keys(&self) -> Vec<PieceKey> {
        let Some(kind) = self.network_kind() else {
            return Vec::new();
        };
        self.occupied_pieces()
            .into_iter()
            .filter_map(|(entry, connection)| PieceKey::new(entry, decode(kind, connection)))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Cargo holds
    // -------------------------------------------------------------------------

    /// Transfer steps in unloading/loading order.
    pub fn transfer_slots(&self) -> Vec<TransferSlot> {
        (0..self.cars.len())
            .flat_map(|i| [TransferSlot::Front(i), TransferSlot::Back(i), TransferSlot::Body(i)])
            .collect()
    }

    pub fn set_all_pending(&mut self) {
        for car in &mut self.cars {
            car.front.pending_transfer = true;
            car.back.pending_transfer = true;
            car.body.pending_transfer = true;
        }
    }

    /// First slot still waiting for its transfer step, clearing its flag.
    pub fn take_pending(&mut self) -> Option<TransferSlot> {
        for (i, car) in self.cars.iter_mut().enumerate() {
            if car.front.pending_transfer {
                car.front.pending_transfer = false;
                return Some(TransferSlot::Front(i));
            }
            if car.back.pending_transfer {
                car.back.pending_transfer = false;
                return Some(TransferSlot::Back(i));
            }
            if car.body.pending_transfer {
                car.body.pending_transfer = false;
                return Some(TransferSlot::Body(i));
            }
        }
        None
    }

    pub fn cargo(&self, slot: TransferSlot) -> Option<&VehicleCargo> {
        match slot {
            TransferSlot::Front(i) => self.cars.get(i).map(|c| &c.front.secondary_cargo),
            TransferSlot::Back(_) => None,
            TransferSlot::Body(i) => self.cars.get(i).map(|c| &c.body.primary_cargo),
        }
    }

    pub fn cargo_mut(&mut self, slot: TransferSlot) -> Option<&mut VehicleCargo> {
        match slot {
            TransferSlot::Front(i) => self.cars.get_mut(i).map(|c| &mut c.front.secondary_cargo),
            TransferSlot::Back(_) => None,
            TransferSlot::Body(i) => self.cars.get_mut(i).map(|c| &mut c.body.primary_cargo),
        }
    }

    /// Distance of a slot's component behind the front of the train.
    pub fn slot_offset(&self, slot: TransferSlot) -> u32 {
        let index = match slot {
            TransferSlot::Front(i) | TransferSlot::Back(i) | TransferSlot::Body(i) => i,
        };
        let before: u32 = self.cars.iter().take(index).map(|c| c.body.length).sum();
        let length = self.cars.get(index).map_or(0, |c| c.body.length);
        match slot {
            TransferSlot::Front(_) => before,
            TransferSlot::Back(_) => before + length,
            TransferSlot::Body(_) => before + length / 2,
        }
    }

    // -------------------------------------------------------------------------
    // Totals
    // -------------------------------------------------------------------------

    /// Refresh the motive totals in Vehicle2 from the cars.
    pub fn recompute_totals(&mut self, objects: &ObjectRegistry) {
        let mut max_speed = u16::MAX;
        let mut power = 0u32;
        let mut weight = 0u32;
        let mut any_powered_broken = false;
        let mut any_powered_running = false;

        for car in &self.cars {
            let Some(object) = objects.vehicle(car.body.object_id) else {
                continue;
            };
            max_speed = max_speed.min(object.speed);
            weight += object.weight as u32;
            if !object.is_powered() {
                continue;
            }
            if matches!(car.front.breakdown, Breakdown::BrokenDown { .. }) {
                any_powered_broken = true;
                power += object.power as u32 / 2;
            } else {
                any_powered_running = true;
                power += object.power as u32;
            }
        }

        self.veh2.max_speed = if max_speed == u16::MAX { 0 } else { max_speed };
        self.veh2.power = power;
        self.veh2.weight = weight;
        self.veh2.is_broken_down = any_powered_broken;
        self.veh2.is_still_powered = any_powered_running;
        self.update_min_reliability();
    }

    /// Lowest non-zero car reliability, in 1/256 units.
    pub fn update_min_reliability(&mut self) {
        self.veh2.reliability = self
            .cars
            .iter()
            .map(|c| c.front.reliability)
            .filter(|&r| r != 0)
            .min()
            .map_or(0, |r| (r / 256) as u8);
    }
}
