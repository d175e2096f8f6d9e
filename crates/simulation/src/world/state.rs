use std::collections::BTreeMap;

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::track::geometry::{self, segment_tiles};

use super::types::*;

/// The tile store. Each tile holds its elements in a fixed sequence; the
/// order never changes except through placement/removal, which is what makes
/// connection discovery order deterministic.
///
/// A `Signal` or `Station` element directly after a `Track`/`Road` element is
/// layered on top of that element.
#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct TileWorld {
    tiles: BTreeMap<TilePos, Vec<TileElement>>,
}

impl TileWorld {
    pub fn tile(&self, pos: TilePos) -> &[TileElement] {
        self.tiles.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tile_mut(&mut self, pos: TilePos) -> &mut Vec<TileElement> {
        self.tiles.entry(pos).or_default()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Index of the piece element matching every identifying field.
    pub fn find_piece(
        &self,
        kind: NetworkKind,
        pos: TilePos,
        piece_id: u8,
        rotation: u8,
        sequence: u8,
        base_z: i32,
    ) -> Option<usize> {
        self.tile(pos).iter().position(|el| {
            el.as_piece(kind).is_some_and(|p| {
                p.piece_id == piece_id
                    && p.rotation == rotation
                    && p.sequence == sequence
                    && p.base_z == base_z
            })
        })
    }

    pub fn layered_signal(&self, pos: TilePos, index: usize) -> Option<&SignalElement> {
        self.tile(pos).get(index + 1).and_then(TileElement::as_signal)
    }

    pub fn layered_signal_mut(&mut self, pos: TilePos, index: usize) -> Option<&mut SignalElement> {
        self.tiles
            .get_mut(&pos)
            .and_then(|tile| tile.get_mut(index + 1))
            .and_then(TileElement::as_signal_mut)
    }

    pub fn layered_station(&self, pos: TilePos, index: usize) -> Option<&StationElement> {
        self.tile(pos).get(index + 1).and_then(TileElement::as_station)
    }

    /// Whether any element of `kind` sits on the tile at exactly `base_z`.
    pub fn has_piece_at(&self, kind: NetworkKind, pos: TilePos, base_z: i32) -> bool {
        self.tile(pos)
            .iter()
            .any(|el| el.as_piece(kind).is_some_and(|p| p.base_z == base_z))
    }

    /// Append a piece element and return its index in the tile.
    pub fn push_piece(&mut self, kind: NetworkKind, pos: TilePos, element: PieceElement) -> usize {
        let tile = self.tile_mut(pos);
        tile.push(match kind {
            NetworkKind::Track => TileElement::Track(element),
            NetworkKind::Road => TileElement::Road(element),
        });
        tile.len() - 1
    }

    /// Lay every segment of a piece without validation or cost. Returns false
    /// for an unknown piece id.
    pub fn place_piece(&mut self, kind: NetworkKind, origin: Pos3, placement: PiecePlacement) -> bool {
        let Some(segments) = segment_tiles(origin, placement.piece_id, placement.rotation) else {
            return false;
        };
        let last = segments.len() - 1;
        for (tile, base_z, sequence) in segments {
            self.push_piece(
                kind,
                tile,
                PieceElement {
                    piece_id: placement.piece_id,
                    rotation: placement.rotation,
                    sequence,
                    base_z,
                    owner: placement.owner,
                    object_id: placement.object_id,
                    mods: placement.mods,
                    ghost: placement.ghost,
                    ai_allocated: false,
                    has_bridge: false,
                    is_last_segment: sequence as usize == last,
                },
            );
        }
        true
    }

    /// Index of segment 0 of the piece placed at `origin`.
    pub fn piece_at_origin(
        &self,
        kind: NetworkKind,
        origin: Pos3,
        piece_id: u8,
        rotation: u8,
    ) -> Option<usize> {
        let first = geometry::piece(piece_id)?.segments[0];
        let base_z = (origin.z + first.z).div_euclid(crate::config::SMALL_Z_STEP);
        self.find_piece(kind, origin.tile(), piece_id, rotation, 0, base_z)
    }

    /// Layer `element` on top of the piece at `index`.
    pub fn insert_layer(&mut self, pos: TilePos, index: usize, element: TileElement) {
        let tile = self.tile_mut(pos);
        let at = (index + 1).min(tile.len());
        tile.insert(at, element);
    }

    /// Remove the piece at `index` together with anything layered on it.
    pub fn remove_piece(&mut self, pos: TilePos, index: usize) {
        let Some(tile) = self.tiles.get_mut(&pos) else {
            return;
        };
        if index >= tile.len() {
            return;
        }
        let layered = matches!(
            tile.get(index + 1),
            Some(TileElement::Signal(_)) | Some(TileElement::Station(_))
        );
        if layered {
            tile.remove(index + 1);
        }
        tile.remove(index);
        if tile.is_empty() {
            self.tiles.remove(&pos);
        }
    }

    /// Remove the element layered on the piece at `index`, if any.
    pub fn remove_layer(&mut self, pos: TilePos, index: usize) -> Option<TileElement> {
        let tile = self.tiles.get_mut(&pos)?;
        match tile.get(index + 1) {
            Some(TileElement::Signal(_)) | Some(TileElement::Station(_)) => {
                Some(tile.remove(index + 1))
            }
            _ => None,
        }
    }

    /// Every signal element in the world, with its tile.
    pub fn signals(&self) -> impl Iterator<Item = (TilePos, &SignalElement)> {
        self.tiles.iter().flat_map(|(pos, tile)| {
            tile.iter()
                .filter_map(TileElement::as_signal)
                .map(move |signal| (*pos, signal))
        })
    }
}

impl crate::Saveable for TileWorld {
    const SAVE_KEY: &'static str = "tile_world";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.tiles.is_empty() {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}
