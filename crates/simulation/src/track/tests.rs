use crate::ids::{CompanyId, StationId};
use crate::world::{
    NetworkKind, PiecePlacement, Pos3, SignalElement, SignalSide, StationElement, TileElement,
    TilePos, TileWorld,
};

use super::connections::decode;
use super::geometry::*;
use super::*;

const OWNER: CompanyId = CompanyId(0);

fn filter() -> ConnectionFilter {
    ConnectionFilter::new(OWNER, 0)
}

fn world_with(kind: NetworkKind, origin: Pos3, piece_id: u8, rotation: u8) -> TileWorld {
    let mut world = TileWorld::default();
    assert!(world.place_piece(kind, origin, PiecePlacement::new(piece_id, rotation, OWNER, 0)));
    world
}

fn basic(kind: NetworkKind, connection: u16) -> u16 {
    match kind {
        NetworkKind::Track => connection & BASIC_TAD_MASK,
        NetworkKind::Road => connection & BASIC_RAD_MASK,
    }
}

fn layer_on_origin(world: &mut TileWorld, kind: NetworkKind, origin: Pos3, piece_id: u8, element: TileElement) {
    let index = world.piece_at_origin(kind, origin, piece_id, 0);
    assert!(index.is_some(), "piece {} not found at {:?}", piece_id, origin);
    world.insert_layer(origin.tile(), index.unwrap_or(0), element);
}

// =============================================================================
// Geometry
// =============================================================================

#[test]
fn test_last_segment_steps_onto_exit() {
    for (id, geometry) in PIECES.iter().enumerate() {
        let last = geometry.last_segment();
        let step = step(geometry.rotation_end);
        assert_eq!(
            (last.x + step.x, last.y + step.y),
            (geometry.exit.x, geometry.exit.y),
            "piece {} ({}) exit is not one step past its last segment",
            id,
            geometry.name
        );
    }
}

#[test]
fn test_four_right_curves_close_a_loop() {
    let mut pos = Pos3::new(0, 0, 0);
    let mut rotation = 0;
    for _ in 0..4 {
        let dir = PieceDirection {
            id: SMALL_RIGHT_CURVE,
            reversed: false,
            rotation,
        };
        let end = connection_end(pos, dir);
        assert!(end.is_some());
        (pos, rotation) = end.unwrap_or((pos, rotation));
    }
    assert_eq!((pos, rotation), (Pos3::new(0, 0, 0), 0));
}

#[test]
fn test_slope_changes_height_by_exit() {
    let dir = PieceDirection {
        id: SLOPE_UP,
        reversed: false,
        rotation: 2,
    };
    assert_eq!(
        connection_end(Pos3::new(0, 0, 32), dir),
        Some((Pos3::new(64, 0, 48), 2))
    );
}

#[test]
fn test_unknown_piece_has_no_geometry() {
    let dir = PieceDirection {
        id: 40,
        reversed: false,
        rotation: 0,
    };
    assert_eq!(connection_end(Pos3::default(), dir), None);
    assert_eq!(piece_length(40), crate::config::DISTANCE_PER_SEGMENT);
    assert_eq!(piece_length(LARGE_LEFT_CURVE), 4 * crate::config::DISTANCE_PER_SEGMENT);
}

#[test]
fn test_connection_start_inverts_connection_end() {
    let entry = Pos3::new(320, 320, 64);
    for id in 0..PIECES.len() as u8 {
        for rotation in 0..4 {
            for reversed in [false, true] {
                let dir = PieceDirection { id, reversed, rotation };
                let Some((end, _)) = connection_end(entry, dir) else {
                    panic!("piece {} has geometry", id);
                };
                assert_eq!(
                    connection_start(end, dir),
                    Some(entry),
                    "piece {} rotation {} reversed {}",
                    id,
                    rotation,
                    reversed
                );
            }
        }
    }
}

#[test]
fn test_piece_key_ignores_travel_direction() {
    let origin = Pos3::new(0, 0, 0);
    let dir = PieceDirection {
        id: LARGE_RIGHT_CURVE,
        reversed: false,
        rotation: 1,
    };
    let (back_entry, back_dir) = reverse_entry(origin, dir).unwrap_or((origin, dir));
    assert!(back_dir.reversed);
    assert_eq!(PieceKey::new(origin, dir), PieceKey::new(back_entry, back_dir));
}

// =============================================================================
// Descriptors
// =============================================================================

#[test]
fn test_track_and_direction_fields() {
    let tad = TrackAndDirection::new(5, true, 3);
    assert_eq!((tad.id(), tad.is_reversed(), tad.rotation()), (5, true, 3));
    assert!(!tad.reversed().is_reversed());
    assert_eq!(TrackAndDirection::from_connection(tad.0 | HAS_SIGNAL | HAS_BRIDGE), tad);
}

#[test]
fn test_road_lane_flags_do_not_leak_into_basic() {
    let rad = RoadAndDirection::new(4, false, 1)
        .with_overtaking(true)
        .with_changing_lane(true);
    assert!(rad.is_overtaking() && rad.is_changing_lane());
    assert_eq!(rad.basic(), RoadAndDirection::new(4, false, 1).0);
    assert!(!rad.with_overtaking(false).is_overtaking());
    assert_eq!(rad.id(), 4);
}

// =============================================================================
// Connection query
// =============================================================================

#[test]
fn test_every_connection_leads_back_to_its_origin() {
    let origin = Pos3::new(320, 320, 64);
    for kind in [NetworkKind::Track, NetworkKind::Road] {
        for piece_id in 0..PIECES.len() as u8 {
            for rotation in 0..4u8 {
                let world = world_with(kind, origin, piece_id, rotation);
                let set = get_connections(&world, kind, origin, rotation, &filter());
                assert_eq!(
                    set.len(),
                    1,
                    "{:?} piece {} rotation {}: expected one forward connection",
                    kind,
                    piece_id,
                    rotation
                );

                for &connection in &set.connections {
                    let dir = decode(kind, connection);
                    let (end, end_rotation) = connection_end(origin, dir).unwrap_or_default();
                    let (back_pos, back_dir) = reverse_entry(origin, dir).unwrap_or((origin, dir));
                    assert_eq!(back_pos, end - step(end_rotation));

                    let back = get_connections(&world, kind, back_pos, reverse_rotation(end_rotation), &filter());
                    let flipped = basic(kind, connection) ^ (1 << 2);
                    assert!(
                        back.connections.iter().any(|&c| basic(kind, c) == flipped),
                        "{:?} piece {} rotation {}: no way back from {:?}",
                        kind,
                        piece_id,
                        rotation,
                        back_pos
                    );

                    let home = connection_end(back_pos, back_dir);
                    assert_eq!(
                        home,
                        Some((origin - step(rotation), reverse_rotation(rotation))),
                        "{:?} piece {} rotation {}: reversed traversal does not end where the forward one began",
                        kind,
                        piece_id,
                        rotation
                    );
                }
            }
        }
    }
}

#[test]
fn test_wrong_rotation_or_height_finds_nothing() {
    let origin = Pos3::new(0, 0, 16);
    let world = world_with(NetworkKind::Track, origin, STRAIGHT, 0);
    assert!(get_track_connections(&world, origin, 1, &filter()).is_empty());
    assert!(get_track_connections(&world, Pos3::new(0, 0, 32), 0, &filter()).is_empty());
    assert_eq!(get_track_connections(&world, origin, 0, &filter()).len(), 1);
}

#[test]
fn test_ghost_and_under_construction_are_skipped() {
    let origin = Pos3::new(0, 0, 0);
    let mut world = TileWorld::default();
    let ghost = PiecePlacement {
        ghost: true,
        ..PiecePlacement::new(STRAIGHT, 0, OWNER, 0)
    };
    world.place_piece(NetworkKind::Track, origin, ghost);
    assert!(get_track_connections(&world, origin, 0, &filter()).is_empty());

    let mut world = world_with(NetworkKind::Track, origin, STRAIGHT, 0);
    if let Some(TileElement::Track(el)) = world.tile_mut(TilePos::new(0, 0)).first_mut() {
        el.ai_allocated = true;
    }
    assert!(get_track_connections(&world, origin, 0, &filter()).is_empty());
}

#[test]
fn test_owner_filter_and_shared_roads() {
    let origin = Pos3::new(0, 0, 0);
    let mut world = TileWorld::default();
    world.place_piece(
        NetworkKind::Road,
        origin,
        PiecePlacement::new(STRAIGHT, 0, CompanyId(3), 0),
    );
    assert!(get_road_connections(&world, origin, 0, &filter()).is_empty());

    let shared = ConnectionFilter {
        shared: true,
        ..filter()
    };
    assert_eq!(get_road_connections(&world, origin, 0, &shared).len(), 1);

    let mut neutral = TileWorld::default();
    neutral.place_piece(
        NetworkKind::Road,
        origin,
        PiecePlacement::new(STRAIGHT, 0, CompanyId::NEUTRAL, 0),
    );
    assert_eq!(get_road_connections(&neutral, origin, 0, &filter()).len(), 1);
}

#[test]
fn test_object_and_mod_filters() {
    let origin = Pos3::new(0, 0, 0);
    let mut world = TileWorld::default();
    world.place_piece(
        NetworkKind::Track,
        origin,
        PiecePlacement {
            mods: 0b01,
            ..PiecePlacement::new(STRAIGHT, 0, OWNER, 0)
        },
    );

    let other_object = ConnectionFilter::new(OWNER, 1);
    assert!(get_track_connections(&world, origin, 0, &other_object).is_empty());

    let needs_missing_mod = ConnectionFilter {
        required_mods: 0b10,
        ..filter()
    };
    assert!(get_track_connections(&world, origin, 0, &needs_missing_mod).is_empty());

    let asks_for_mods = ConnectionFilter {
        required_mods: 0b01,
        query_mods: 0b11,
        ..filter()
    };
    let set = get_track_connections(&world, origin, 0, &asks_for_mods);
    assert_eq!(set.len(), 1);
    assert!(set.connections[0] & HAS_MODS != 0);
    assert!(get_track_connections(&world, origin, 0, &filter()).connections[0] & HAS_MODS == 0);
}

#[test]
fn test_signal_flag_follows_travel_side() {
    let origin = Pos3::new(0, 0, 0);
    let mut world = world_with(NetworkKind::Track, origin, STRAIGHT, 0);
    layer_on_origin(
        &mut world,
        NetworkKind::Track,
        origin,
        STRAIGHT,
        TileElement::Signal(SignalElement {
            left: SignalSide {
                has_signal: true,
                ..Default::default()
            },
            ..Default::default()
        }),
    );

    let forward = get_track_connections(&world, origin, 0, &filter());
    assert!(forward.connections[0] & HAS_SIGNAL != 0, "left side guards forward travel");

    let reversed = get_track_connections(&world, origin, 2, &filter());
    assert_eq!(reversed.len(), 1);
    assert!(reversed.connections[0] & HAS_SIGNAL == 0, "no signal on the right side");
}

#[test]
fn test_ghost_signal_side_is_ignored() {
    let origin = Pos3::new(0, 0, 0);
    let mut world = world_with(NetworkKind::Track, origin, STRAIGHT, 0);
    layer_on_origin(
        &mut world,
        NetworkKind::Track,
        origin,
        STRAIGHT,
        TileElement::Signal(SignalElement {
            left: SignalSide {
                has_signal: true,
                ..Default::default()
            },
            left_ghost: true,
            ..Default::default()
        }),
    );
    let set = get_track_connections(&world, origin, 0, &filter());
    assert!(set.connections[0] & HAS_SIGNAL == 0);
}

#[test]
fn test_station_and_level_crossing_reported() {
    let origin = Pos3::new(0, 0, 0);
    let mut world = world_with(NetworkKind::Track, origin, STRAIGHT, 0);
    layer_on_origin(
        &mut world,
        NetworkKind::Track,
        origin,
        STRAIGHT,
        TileElement::Station(StationElement {
            station_id: StationId(7),
            ghost: false,
            ai_allocated: false,
        }),
    );
    let set = get_track_connections(&world, origin, 0, &filter());
    assert_eq!(set.station_id, Some(StationId(7)));
    assert!(!set.has_level_crossing);

    world.place_piece(
        NetworkKind::Road,
        origin,
        PiecePlacement::new(STRAIGHT, 1, CompanyId::NEUTRAL, 0),
    );
    let set = get_track_connections(&world, origin, 0, &filter());
    assert!(set.has_level_crossing);
}

#[test]
fn test_discovery_order_and_capacity() {
    let origin = Pos3::new(0, 0, 0);
    let mut world = TileWorld::default();
    world.place_piece(NetworkKind::Track, origin, PiecePlacement::new(SMALL_LEFT_CURVE, 0, OWNER, 0));
    world.place_piece(NetworkKind::Track, origin, PiecePlacement::new(STRAIGHT, 0, OWNER, 0));
    let set = get_track_connections(&world, origin, 0, &filter());
    assert_eq!(
        set.connections,
        vec![
            TrackAndDirection::new(SMALL_LEFT_CURVE, false, 0).0,
            TrackAndDirection::new(STRAIGHT, false, 0).0
        ],
        "connections come back in tile element order"
    );

    for _ in 0..20 {
        world.place_piece(NetworkKind::Track, origin, PiecePlacement::new(STRAIGHT, 0, OWNER, 0));
    }
    let set = get_track_connections(&world, origin, 0, &filter());
    assert_eq!(set.len(), crate::config::MAX_CONNECTIONS);
}

// =============================================================================
// Junction routing
// =============================================================================

fn junction_world(station_on_curve_branch: bool) -> TileWorld {
    let origin = Pos3::new(0, 0, 0);
    let mut world = TileWorld::default();
    world.place_piece(NetworkKind::Track, origin, PiecePlacement::new(STRAIGHT, 0, OWNER, 0));
    world.place_piece(NetworkKind::Track, origin, PiecePlacement::new(SMALL_RIGHT_CURVE, 0, OWNER, 0));

    // Straight branch continues west, curve branch turns south.
    let west = Pos3::new(-32, 0, 0);
    let south = Pos3::new(0, 32, 0);
    world.place_piece(NetworkKind::Track, west, PiecePlacement::new(STRAIGHT, 0, OWNER, 0));
    world.place_piece(NetworkKind::Track, south, PiecePlacement::new(STRAIGHT, 1, OWNER, 0));

    let (station_at, rotation) = if station_on_curve_branch { (south, 1) } else { (west, 0) };
    let index = world.piece_at_origin(NetworkKind::Track, station_at, STRAIGHT, rotation);
    world.insert_layer(
        station_at.tile(),
        index.unwrap_or(0),
        TileElement::Station(StationElement {
            station_id: StationId(1),
            ghost: false,
            ai_allocated: false,
        }),
    );
    world
}

#[test]
fn test_junction_routes_toward_target_station() {
    let origin = Pos3::new(0, 0, 0);
    for (curve, expected) in [(true, SMALL_RIGHT_CURVE), (false, STRAIGHT)] {
        let world = junction_world(curve);
        let set = get_track_connections(&world, origin, 0, &filter());
        assert_eq!(set.len(), 2);
        let chosen = choose_connection(&world, NetworkKind::Track, origin, &set, &filter(), Some(StationId(1)));
        assert_eq!(
            chosen.map(|c| TrackAndDirection::from_connection(c).id()),
            Some(expected),
            "station on curve branch: {}",
            curve
        );
    }
}

#[test]
fn test_junction_without_target_takes_first_discovered() {
    let origin = Pos3::new(0, 0, 0);
    let world = junction_world(true);
    let set = get_track_connections(&world, origin, 0, &filter());
    assert_eq!(
        choose_connection(&world, NetworkKind::Track, origin, &set, &filter(), None),
        set.connections.first().copied()
    );
    assert_eq!(
        choose_connection(&world, NetworkKind::Track, origin, &set, &filter(), Some(StationId(9))),
        set.connections.first().copied(),
        "unreachable station falls back to the first connection"
    );
    assert_eq!(
        choose_connection(&world, NetworkKind::Track, origin, &ConnectionSet::default(), &filter(), None),
        None
    );
}
