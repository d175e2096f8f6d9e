use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{MAX_ORDERS_PER_VEHICLE, MAX_ORDER_TABLE_BYTES};
use crate::errors::{ActionError, ActionResult, StructuralError};
use crate::ids::{StationId, VehicleId};

use super::ring::OrderRingView;
use super::types::{NumberDisplayFrame, Order, OrderCursor};

/// Whoever holds the order cursors (the vehicle list). Table edits rebase
/// every cursor through this.
pub trait OrderOwners {
    fn cursor_mut(&mut self, vehicle: VehicleId) -> Option<&mut OrderCursor>;
    fn for_each_cursor(&mut self, f: &mut dyn FnMut(VehicleId, &mut OrderCursor));
}

/// Every vehicle's orders, packed back to back with no gaps.
#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct OrderTable {
    bytes: Vec<u8>,
    pub display_frames: Vec<NumberDisplayFrame>,
}

impl OrderTable {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn ring(&self, cursor: &OrderCursor) -> Result<OrderRingView, StructuralError> {
        OrderRingView::new(&self.bytes, cursor)
    }

    /// The order at the cursor's current position.
    pub fn current_order(&self, cursor: &OrderCursor) -> Option<Order> {
        self.ring(cursor).ok()?.current().map(|e| e.order)
    }

    /// Give a new vehicle an empty order list (a lone `End`) at the end of
    /// the table.
    pub fn allocate(&mut self) -> ActionResult<OrderCursor> {
        if self.bytes.len() + 1 > MAX_ORDER_TABLE_BYTES {
            return Err(ActionError::OrderTableFull);
        }
        let cursor = OrderCursor {
            table_offset: self.bytes.len() as u32,
            table_size: 1,
            current_order: 0,
        };
        self.bytes.extend(Order::End.encode());
        Ok(cursor)
    }

    /// Insert `order` before the record at `offset` (relative to the
    /// vehicle's range; the `End` offset appends).
    pub fn insert_order<O: OrderOwners>(
        &mut self,
        owners: &mut O,
        vehicle: VehicleId,
        offset: u16,
        order: Order,
    ) -> ActionResult<()> {
        if order == Order::End {
            return Err(ActionError::InvalidParameter("cannot insert an End order".into()));
        }
        let cursor = *owners.cursor_mut(vehicle).ok_or(ActionError::NotFound)?;
        let ring = self.ring(&cursor)?;
        if !ring.is_record_boundary(offset) {
            return Err(ActionError::InvalidOrderOffset);
        }
        if ring.len() >= MAX_ORDERS_PER_VEHICLE {
            return Err(ActionError::TooManyOrders);
        }
        let record = order.encode();
        if self.bytes.len() + record.len() > MAX_ORDER_TABLE_BYTES {
            return Err(ActionError::OrderTableFull);
        }

        let at = cursor.table_offset + offset as u32;
        let len = record.len() as u16;
        self.bytes.splice(at as usize..at as usize, record);

        rebase_others(owners, vehicle, at, len as i64, true);
        for frame in &mut self.display_frames {
            if frame.order_offset >= at {
                frame.order_offset += len as u32;
            }
        }

        if let Some(cursor) = owners.cursor_mut(vehicle) {
            cursor.table_size += len;
            if cursor.current_order >= offset {
                cursor.current_order += len;
            }
            if cursor.current_order + 1 >= cursor.table_size {
                cursor.current_order = 0;
            }
        }
        Ok(())
    }

    /// Remove the record at `offset` (relative to the vehicle's range).
    pub fn delete_order<O: OrderOwners>(
        &mut self,
        owners: &mut O,
        vehicle: VehicleId,
        offset: u16,
    ) -> ActionResult<()> {
        let cursor = *owners.cursor_mut(vehicle).ok_or(ActionError::NotFound)?;
        let ring = self.ring(&cursor)?;
        let entry = ring
            .entries()
            .iter()
            .find(|e| e.offset == offset)
            .ok_or(ActionError::InvalidOrderOffset)?;
        let len = entry.order.size() as u16;

        if let Some(cursor) = owners.cursor_mut(vehicle) {
            cursor.table_size -= len;
            if cursor.current_order > offset {
                cursor.current_order -= len;
            }
            if cursor.current_order + 1 >= cursor.table_size {
                cursor.current_order = 0;
            }
        }

        let at = cursor.table_offset + offset as u32;
        self.bytes.drain(at as usize..(at + len as u32) as usize);

        rebase_others(owners, vehicle, at, -(len as i64), false);
        self.display_frames.retain(|f| f.order_offset != at);
        for frame in &mut self.display_frames {
            if frame.order_offset > at {
                frame.order_offset -= len as u32;
            }
        }
        Ok(())
    }

    /// Swap the record at `offset` with the one following it. Returns the
    /// new offset of the moved record.
    pub fn swap_adjacent_orders<O: OrderOwners>(
        &mut self,
        owners: &mut O,
        vehicle: VehicleId,
        offset: u16,
    ) -> ActionResult<u16> {
        let cursor = *owners.cursor_mut(vehicle).ok_or(ActionError::NotFound)?;
        let ring = self.ring(&cursor)?;
        let idx = ring
            .entries()
            .iter()
            .position(|e| e.offset == offset)
            .ok_or(ActionError::InvalidOrderOffset)?;
        let (a, b) = match (ring.entries().get(idx), ring.entries().get(idx + 1)) {
            (Some(a), Some(b)) => (*a, *b),
            _ => return Err(ActionError::InvalidOrderOffset),
        };

        let at = (cursor.table_offset + offset as u32) as usize;
        let mut swapped = b.order.encode();
        swapped.extend(a.order.encode());
        let total = swapped.len();
        self.bytes.splice(at..at + total, swapped);

        let len_b = b.order.size() as u16;
        if let Some(cursor) = owners.cursor_mut(vehicle) {
            if cursor.current_order == a.offset {
                cursor.current_order = a.offset + len_b;
            } else if cursor.current_order == b.offset {
                cursor.current_order = a.offset;
            }
        }
        Ok(offset + len_b)
    }

    /// Drop a vehicle's whole range (when it is sold).
    pub fn free_orders<O: OrderOwners>(&mut self, owners: &mut O, vehicle: VehicleId) -> ActionResult<()> {
        let cursor = *owners.cursor_mut(vehicle).ok_or(ActionError::NotFound)?;
        let begin = cursor.table_offset as usize;
        let end = (cursor.end() as usize).min(self.bytes.len());
        if begin < end {
            self.bytes.drain(begin..end);
        }
        let size = (end.saturating_sub(begin)) as u32;

        rebase_others(owners, vehicle, cursor.end(), -(size as i64), true);
        self.display_frames
            .retain(|f| f.order_offset < cursor.table_offset || f.order_offset >= cursor.end());
        for frame in &mut self.display_frames {
            if frame.order_offset >= cursor.end() {
                frame.order_offset -= size;
            }
        }
        if let Some(cursor) = owners.cursor_mut(vehicle) {
            *cursor = OrderCursor::default();
        }
        Ok(())
    }

    /// Replace `target`'s orders with a copy of `source`'s.
    pub fn clone_orders<O: OrderOwners>(
        &mut self,
        owners: &mut O,
        source: VehicleId,
        target: VehicleId,
    ) -> ActionResult<()> {
        let src = *owners.cursor_mut(source).ok_or(ActionError::NotFound)?;
        self.ring(&src)?;
        let copy = self.bytes[src.table_offset as usize..src.end() as usize].to_vec();

        let target_size = owners.cursor_mut(target).ok_or(ActionError::NotFound)?.table_size as usize;
        if self.bytes.len().saturating_sub(target_size) + copy.len() > MAX_ORDER_TABLE_BYTES {
            return Err(ActionError::OrderTableFull);
        }
        if target_size > 0 {
            self.free_orders(owners, target)?;
        }

        let offset = self.bytes.len() as u32;
        self.bytes.extend(copy);
        if let Some(cursor) = owners.cursor_mut(target) {
            *cursor = OrderCursor {
                table_offset: offset,
                table_size: src.table_size,
                current_order: 0,
            };
        }
        Ok(())
    }

    /// Delete every order naming `station` from every vehicle.
    pub fn zero_orders_for_station<O: OrderOwners>(&mut self, owners: &mut O, station: StationId) {
        let mut vehicles = Vec::new();
        owners.for_each_cursor(&mut |id, _| vehicles.push(id));
        for vehicle in vehicles {
            loop {
                let Some(cursor) = owners.cursor_mut(vehicle).copied() else {
                    break;
                };
                let found = self.ring(&cursor).ok().and_then(|ring| {
                    ring.entries()
                        .iter()
                        .find(|e| e.order.station() == Some(station))
                        .map(|e| e.offset)
                });
                let Some(offset) = found else {
                    break;
                };
                if self.delete_order(owners, vehicle, offset).is_err() {
                    break;
                }
            }
        }
    }

    /// Rebuild the markers for `cursor`'s numbered orders. Repeated stops at
    /// the same station (or the same waypoint) stack onto further lines.
    pub fn generate_display_frames(&mut self, cursor: &OrderCursor) {
        self.display_frames.clear();
        let Ok(ring) = self.ring(cursor) else {
            return;
        };
        let entries = ring.entries();
        for (i, entry) in entries.iter().enumerate() {
            if !entry.order.has_flags(super::types::HAS_NUMBER) {
                continue;
            }
            let earlier = &entries[..i];
            let repeats = match entry.order {
                Order::RouteWaypoint(_) => earlier.iter().filter(|e| e.order == entry.order).count(),
                _ => {
                    let station = entry.order.station();
                    1 + earlier.iter().filter(|e| e.order.station() == station).count()
                }
            };
            self.display_frames.push(NumberDisplayFrame {
                order_offset: cursor.table_offset + entry.offset as u32,
                line_number: repeats.min(u8::MAX as usize) as u8,
            });
        }
    }

    /// Step to the first routable order at or after the current one.
    pub fn advance_to_next_routable_order(&self, cursor: &mut OrderCursor) {
        if cursor.table_size == 1 {
            return;
        }
        let Ok(ring) = self.ring(cursor) else {
            return;
        };
        if let Some(entry) = ring.iter().find(|e| e.order.is_routable()) {
            cursor.current_order = entry.offset;
        };
    }

    /// On arrival at `station`: if the current order names it, move past it.
    /// Returns whether the order was satisfied.
    pub fn check_if_at_order_station(&self, cursor: &mut OrderCursor, station: StationId) -> bool {
        let Ok(ring) = self.ring(cursor) else {
            return false;
        };
        let Some(current) = ring.current() else {
            return false;
        };
        if current.order.station() != Some(station) {
            return false;
        }
        if let Some(next) = ring.next_after(current.offset) {
            cursor.current_order = next.offset;
        }
        true
    }

    /// First routable order's station at or after the current order.
    pub fn target_station(&self, cursor: &OrderCursor) -> Option<StationId> {
        let ring = self.ring(cursor).ok()?;
        let entry = ring.iter().find(|e| e.order.is_routable())?;
        entry.order.station()
    }
}

/// Shift every other vehicle whose range starts at or after (`inclusive`) /
/// strictly after `at` by `delta` bytes.
fn rebase_others<O: OrderOwners>(owners: &mut O, except: VehicleId, at: u32, delta: i64, inclusive: bool) {
    owners.for_each_cursor(&mut |id, cursor| {
        if id == except {
            return;
        }
        let affected = if inclusive {
            cursor.table_offset >= at
        } else {
            cursor.table_offset > at
        };
        if affected {
            cursor.table_offset = (cursor.table_offset as i64 + delta).max(0) as u32;
        }
    });
}

impl crate::Saveable for OrderTable {
    const SAVE_KEY: &'static str = "order_table";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.bytes.is_empty() {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}
