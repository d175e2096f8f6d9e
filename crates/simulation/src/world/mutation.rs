//! Validated world edits: the "apply a track/signal mutation, return cost or
//! failure" entry point vehicles and tooling go through.
//!
//! Every mutation can be run query-only (`apply == false`) to price it, as a
//! ghost preview (placed but flagged, never charged), or for real. Failures
//! are recorded in `LastErrorText` unless `no_error_window` is set.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::companies::CompanyManager;
use crate::errors::{ActionError, ActionResult, LastErrorText};
use crate::ids::{CompanyId, Money, StationId};
use crate::objects::ObjectRegistry;
use crate::track::geometry::{self, segment_tiles};

use super::state::TileWorld;
use super::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct MutationFlags {
    /// False prices the mutation without touching the world.
    pub apply: bool,
    /// Place preview elements; no cost is charged.
    pub ghost: bool,
    /// Do not record failures for the error window.
    pub no_error_window: bool,
}

impl MutationFlags {
    pub const APPLY: MutationFlags = MutationFlags {
        apply: true,
        ghost: false,
        no_error_window: false,
    };
    pub const QUERY: MutationFlags = MutationFlags {
        apply: false,
        ghost: false,
        no_error_window: false,
    };
    pub const GHOST: MutationFlags = MutationFlags {
        apply: true,
        ghost: true,
        no_error_window: true,
    };
}

/// Which sides of a signal a mutation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SignalSides {
    /// Guards forward travel.
    pub left: bool,
    /// Guards reversed travel.
    pub right: bool,
}

impl SignalSides {
    pub const ONE_WAY: SignalSides = SignalSides {
        left: true,
        right: false,
    };
    pub const TWO_WAY: SignalSides = SignalSides {
        left: true,
        right: true,
    };

    fn count(self) -> Money {
        self.left as Money + self.right as Money
    }
}

/// Identifies an already placed piece by its origin, id and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct PieceRef {
    pub origin: Pos3,
    pub piece_id: u8,
    pub rotation: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Mutation {
    PlaceTrack {
        origin: Pos3,
        placement: PiecePlacement,
    },
    RemoveTrack {
        piece: PieceRef,
        company: CompanyId,
    },
    PlaceRoad {
        origin: Pos3,
        placement: PiecePlacement,
    },
    PlaceSignal {
        piece: PieceRef,
        sides: SignalSides,
        object_id: u8,
        company: CompanyId,
    },
    RemoveSignal {
        piece: PieceRef,
        company: CompanyId,
    },
    PlaceStation {
        kind: NetworkKind,
        piece: PieceRef,
        station: StationId,
        company: CompanyId,
    },
}

/// Validate, price and (optionally) perform `mutation`.
pub fn apply_mutation(
    world: &mut TileWorld,
    companies: &mut CompanyManager,
    objects: &ObjectRegistry,
    mutation: &Mutation,
    flags: MutationFlags,
    last_error: &mut LastErrorText,
) -> ActionResult<Money> {
    let result = run_mutation(world, companies, objects, mutation, flags);
    if flags.no_error_window {
        result
    } else {
        last_error.record(result)
    }
}

fn run_mutation(
    world: &mut TileWorld,
    companies: &mut CompanyManager,
    objects: &ObjectRegistry,
    mutation: &Mutation,
    flags: MutationFlags,
) -> ActionResult<Money> {
    let (company, cost) = price(world, companies, objects, mutation)?;
    if !flags.apply {
        return Ok(cost);
    }
    let cost = if flags.ghost { 0 } else { cost };
    companies.can_afford(company, cost)?;

    match mutation {
        Mutation::PlaceTrack { origin, placement } => {
            world.place_piece(NetworkKind::Track, *origin, with_ghost(*placement, flags.ghost));
        }
        Mutation::PlaceRoad { origin, placement } => {
            world.place_piece(NetworkKind::Road, *origin, with_ghost(*placement, flags.ghost));
        }
        Mutation::RemoveTrack { piece, .. } => {
            remove_piece(world, NetworkKind::Track, piece);
        }
        Mutation::PlaceSignal {
            piece,
            sides,
            object_id,
            ..
        } => {
            let (tile, index) = single_segment(world, NetworkKind::Track, piece, ActionError::SignalNotAllowed)?;
            if world.layered_signal(tile, index).is_none() {
                world.insert_layer(tile, index, TileElement::Signal(SignalElement::default()));
            }
            if let Some(signal) = world.layered_signal_mut(tile, index) {
                for (wanted, reversed) in [(sides.left, false), (sides.right, true)] {
                    if !wanted {
                        continue;
                    }
                    let side = signal.side_mut(reversed);
                    side.has_signal = true;
                    side.object_id = *object_id;
                    if reversed {
                        signal.right_ghost = flags.ghost;
                    } else {
                        signal.left_ghost = flags.ghost;
                    }
                }
            }
        }
        Mutation::RemoveSignal { piece, .. } => {
            let (tile, index) = single_segment(world, NetworkKind::Track, piece, ActionError::SignalNotAllowed)?;
            world.remove_layer(tile, index);
        }
        Mutation::PlaceStation {
            kind,
            piece,
            station,
            ..
        } => {
            let (tile, index) = single_segment(world, *kind, piece, ActionError::StationNotAllowed)?;
            world.insert_layer(
                tile,
                index,
                TileElement::Station(StationElement {
                    station_id: *station,
                    ghost: flags.ghost,
                    ai_allocated: false,
                }),
            );
        }
    }

    companies.charge(company, cost)?;
    Ok(cost)
}

fn with_ghost(placement: PiecePlacement, ghost: bool) -> PiecePlacement {
    PiecePlacement { ghost, ..placement }
}

/// Validate `mutation` against the world and return who pays what.
fn price(
    world: &TileWorld,
    companies: &CompanyManager,
    objects: &ObjectRegistry,
    mutation: &Mutation,
) -> ActionResult<(CompanyId, Money)> {
    match mutation {
        Mutation::PlaceTrack { origin, placement } => {
            let track = objects.track(placement.object_id).ok_or(ActionError::NotFound)?;
            check_company(companies, placement.owner)?;
            let segments = check_free(world, NetworkKind::Track, *origin, placement)?;
            Ok((placement.owner, track.build_cost * segments))
        }
        Mutation::PlaceRoad { origin, placement } => {
            let road = objects.road(placement.object_id).ok_or(ActionError::NotFound)?;
            check_company(companies, placement.owner)?;
            let segments = check_free(world, NetworkKind::Road, *origin, placement)?;
            Ok((placement.owner, road.build_cost * segments))
        }
        Mutation::RemoveTrack { piece, company } => {
            let index = world
                .piece_at_origin(NetworkKind::Track, piece.origin, piece.piece_id, piece.rotation)
                .ok_or(ActionError::NoTrackHere)?;
            let el = world
                .tile(piece.origin.tile())
                .get(index)
                .and_then(TileElement::as_track)
                .ok_or(ActionError::NoTrackHere)?;
            check_owner(el.owner, *company)?;
            let track = objects.track(el.object_id).ok_or(ActionError::NotFound)?;
            let segments = geometry::piece(piece.piece_id).map_or(1, |g| g.segment_count()) as Money;
            Ok((*company, -(track.build_cost * segments) / 2))
        }
        Mutation::PlaceSignal {
            piece,
            sides,
            object_id,
            company,
        } => {
            let (tile, index) = single_segment(world, NetworkKind::Track, piece, ActionError::SignalNotAllowed)?;
            let el = piece_element(world, NetworkKind::Track, tile, index)?;
            check_owner(el.owner, *company)?;
            if world.layered_station(tile, index).is_some() {
                return Err(ActionError::SignalNotAllowed);
            }
            if let Some(existing) = world.layered_signal(tile, index) {
                if (sides.left && existing.left.has_signal) || (sides.right && existing.right.has_signal) {
                    return Err(ActionError::AlreadyExists);
                }
            }
            if sides.count() == 0 {
                return Err(ActionError::InvalidParameter("no signal side selected".into()));
            }
            let track = objects.track(*object_id).ok_or(ActionError::NotFound)?;
            Ok((*company, track.signal_cost * sides.count()))
        }
        Mutation::RemoveSignal { piece, company } => {
            let (tile, index) = single_segment(world, NetworkKind::Track, piece, ActionError::SignalNotAllowed)?;
            let el = piece_element(world, NetworkKind::Track, tile, index)?;
            check_owner(el.owner, *company)?;
            let signal = world.layered_signal(tile, index).ok_or(ActionError::NotFound)?;
            let sides = signal.left.has_signal as Money + signal.right.has_signal as Money;
            let cost = objects.track(el.object_id).map_or(0, |t| t.signal_cost);
            Ok((*company, -(cost * sides) / 2))
        }
        Mutation::PlaceStation {
            kind,
            piece,
            company,
            ..
        } => {
            let (tile, index) = single_segment(world, *kind, piece, ActionError::StationNotAllowed)?;
            let el = piece_element(world, *kind, tile, index)?;
            if el.owner != CompanyId::NEUTRAL {
                check_owner(el.owner, *company)?;
            }
            match world.tile(tile).get(index + 1) {
                Some(TileElement::Station(_)) => return Err(ActionError::AlreadyExists),
                Some(TileElement::Signal(_)) => return Err(ActionError::StationNotAllowed),
                _ => {}
            }
            Ok((*company, objects.station_cost))
        }
    }
}

fn check_company(companies: &CompanyManager, id: CompanyId) -> ActionResult<()> {
    if id == CompanyId::NEUTRAL || companies.get(id).is_some() {
        Ok(())
    } else {
        Err(ActionError::NotFound)
    }
}

fn check_owner(owner: CompanyId, company: CompanyId) -> ActionResult<()> {
    if owner == company {
        Ok(())
    } else {
        Err(ActionError::NotOwner)
    }
}

/// Every segment tile must be free of the same network at the same height.
/// Returns the segment count.
fn check_free(
    world: &TileWorld,
    kind: NetworkKind,
    origin: Pos3,
    placement: &PiecePlacement,
) -> ActionResult<Money> {
    let segments = segment_tiles(origin, placement.piece_id, placement.rotation)
        .ok_or_else(|| ActionError::InvalidParameter(format!("unknown piece {}", placement.piece_id)))?;
    if placement.rotation > 3 {
        return Err(ActionError::InvalidParameter(format!(
            "rotation {}",
            placement.rotation
        )));
    }
    for (tile, base_z, _) in &segments {
        if world.has_piece_at(kind, *tile, *base_z) {
            return Err(ActionError::AlreadyExists);
        }
    }
    Ok(segments.len() as Money)
}

fn piece_element(
    world: &TileWorld,
    kind: NetworkKind,
    tile: TilePos,
    index: usize,
) -> ActionResult<&PieceElement> {
    world
        .tile(tile)
        .get(index)
        .and_then(|el| el.as_piece(kind))
        .ok_or(ActionError::NoTrackHere)
}

/// Locate a placed single-segment piece. Multi-segment pieces cannot carry
/// signals or stations.
fn single_segment(
    world: &TileWorld,
    kind: NetworkKind,
    piece: &PieceRef,
    not_allowed: ActionError,
) -> ActionResult<(TilePos, usize)> {
    let geometry = geometry::piece(piece.piece_id).ok_or(ActionError::NoTrackHere)?;
    let index = world
        .piece_at_origin(kind, piece.origin, piece.piece_id, piece.rotation)
        .ok_or(ActionError::NoTrackHere)?;
    if geometry.segment_count() != 1 {
        return Err(not_allowed);
    }
    Ok((piece.origin.tile(), index))
}

fn remove_piece(world: &mut TileWorld, kind: NetworkKind, piece: &PieceRef) {
    let Some(segments) = segment_tiles(piece.origin, piece.piece_id, piece.rotation) else {
        return;
    };
    for (tile, base_z, sequence) in segments {
        if let Some(index) = world.find_piece(kind, tile, piece.piece_id, piece.rotation, sequence, base_z) {
            world.remove_piece(tile, index);
        }
    }
}
