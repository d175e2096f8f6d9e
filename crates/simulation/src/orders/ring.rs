use crate::errors::StructuralError;

use super::types::{Order, OrderCursor};

/// One decoded order and its offset relative to the vehicle's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderEntry {
    pub offset: u16,
    pub order: Order,
}

/// Decoded view of one vehicle's orders, iterated as a closed loop starting
/// at the current order. The trailing `End` record is never yielded; passing
/// the last order wraps back to the first.
#[derive(Debug, Clone)]
pub struct OrderRingView {
    entries: Vec<OrderEntry>,
    start: usize,
    end_offset: u16,
}

impl OrderRingView {
    /// Decode the range described by `cursor`. The range must be a whole
    /// number of records finishing with exactly one `End`.
    pub fn new(table: &[u8], cursor: &OrderCursor) -> Result<Self, StructuralError> {
        let begin = cursor.table_offset as usize;
        let range = table
            .get(begin..begin + cursor.table_size as usize)
            .ok_or(StructuralError::TruncatedOrder)?;

        let mut entries = Vec::new();
        let mut at = 0usize;
        loop {
            let order = Order::decode(&range[at.min(range.len())..])?;
            if order == Order::End {
                if at + 1 != range.len() {
                    return Err(StructuralError::TruncatedOrder);
                }
                break;
            }
            entries.push(OrderEntry {
                offset: at as u16,
                order,
            });
            at += order.size();
        }

        let current = cursor.current_order;
        let start = entries
            .iter()
            .position(|e| e.offset >= current)
            .unwrap_or(0);
        Ok(Self {
            entries,
            start,
            end_offset: at as u16,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Offset of the `End` record.
    pub fn end_offset(&self) -> u16 {
        self.end_offset
    }

    /// Orders in table order, ignoring the current position.
    pub fn entries(&self) -> &[OrderEntry] {
        &self.entries
    }

    pub fn current(&self) -> Option<&OrderEntry> {
        self.entries.get(self.start)
    }

    /// One lap over the orders starting at the current one.
    pub fn iter(&self) -> impl Iterator<Item = &OrderEntry> + '_ {
        let (tail, head) = self.entries.split_at(self.start);
        head.iter().chain(tail.iter())
    }

    /// The order after `offset`, wrapping past the end.
    pub fn next_after(&self, offset: u16) -> Option<&OrderEntry> {
        let idx = self.entries.iter().position(|e| e.offset == offset)?;
        self.entries.get((idx + 1) % self.entries.len())
    }

    /// Whether `offset` is the start of a record (including `End`).
    pub fn is_record_boundary(&self, offset: u16) -> bool {
        offset == self.end_offset || self.entries.iter().any(|e| e.offset == offset)
    }
}
