use bevy::prelude::*;

use crate::world::TileWorld;

use super::types::*;

/// How many signals behind the train still show a caution aspect.
const ASPECT_WINDOW: usize = 3;

/// State of the signal side `signal` guards.
pub fn signal_state(world: &TileWorld, signal: &SignalRef) -> SignalStateFlags {
    let Some(element) = signal
        .element_index(world)
        .and_then(|index| world.layered_signal(signal.tile, index))
    else {
        return SignalStateFlags::BLOCKED_NO_ROUTE;
    };

    let mut flags = SignalStateFlags::NONE;
    if !element.has_live_signal(signal.reversed) {
        flags.insert(SignalStateFlags::BLOCKED_NO_ROUTE);
    }
    if element.side(signal.reversed).occupied {
        flags.insert(SignalStateFlags::OCCUPIED);
    }
    if !element.has_live_signal(!signal.reversed) {
        flags.insert(SignalStateFlags::OCCUPIED_ONE_WAY);
    }
    flags
}

fn with_side(world: &mut TileWorld, signal: &SignalRef, f: impl FnOnce(&mut crate::world::SignalSide)) {
    let Some(index) = signal.element_index(world) else {
        return;
    };
    if let Some(element) = world.layered_signal_mut(signal.tile, index) {
        f(element.side_mut(signal.reversed));
    }
}

/// Occupy the block behind `signal` for a train whose head has travelled
/// `odometer` units. The two signals passed before it step down to yellow
/// and double yellow; `forced` marks a pass through an occupied block.
pub fn claim_block(
    world: &mut TileWorld,
    claims: &mut Vec<SignalClaim>,
    recent: &mut Vec<SignalRef>,
    signal: SignalRef,
    odometer: u64,
    forced: bool,
) {
    // A train lapping back to a block it still holds takes it over again.
    let held = claims.iter().position(|c| c.signal == signal);
    if let Some(index) = held {
        claims.remove(index);
    }
    with_side(world, &signal, |side| {
        if held.is_none() {
            side.holders = side.holders.saturating_add(1);
        }
        side.occupied = true;
        side.aspect = if forced { ASPECT_FORCED_RED } else { ASPECT_RED };
    });
    claims.push(SignalClaim { signal, odometer });

    recent.retain(|r| *r != signal);
    recent.insert(0, signal);
    for (passed, aspect) in recent.iter().skip(1).zip([ASPECT_YELLOW, ASPECT_DOUBLE_YELLOW]) {
        with_side(world, passed, |side| {
            if !side.occupied {
                side.aspect = aspect;
            }
        });
    }
    while recent.len() > ASPECT_WINDOW {
        if let Some(dropped) = recent.pop() {
            with_side(world, &dropped, |side| {
                if !side.occupied {
                    side.aspect = ASPECT_CLEAR;
                }
            });
        }
    }
}

fn trailing_aspect(recent: &[SignalRef], signal: &SignalRef) -> u8 {
    match recent.iter().position(|r| r == signal) {
        Some(1) => ASPECT_YELLOW,
        Some(2) => ASPECT_DOUBLE_YELLOW,
        _ => ASPECT_CLEAR,
    }
}

/// Give up one train's hold on the block. It only shows free once no
/// other train is left inside.
fn release_hold(world: &mut TileWorld, signal: &SignalRef, aspect: u8) {
    with_side(world, signal, |side| {
        side.holders = side.holders.saturating_sub(1);
        side.occupied = side.holders > 0;
        if !side.occupied {
            side.aspect = aspect;
        }
    });
}

/// Release every claim whose following signal the tail has passed. The
/// newest claim is the block the train is in and stays.
pub fn release_cleared(
    world: &mut TileWorld,
    claims: &mut Vec<SignalClaim>,
    recent: &[SignalRef],
    tail_odometer: u64,
) {
    let mut released = 0;
    while claims.len() > 1 && tail_odometer >= claims[1].odometer {
        let claim = claims.remove(0);
        let aspect = trailing_aspect(recent, &claim.signal);
        release_hold(world, &claim.signal, aspect);
        released += 1;
    }
    if released > 0 {
        debug!("released {} signal block(s) behind train", released);
    }
}

/// Release every block held (reversal, sale) and drop the caution aspects.
pub fn release_all(world: &mut TileWorld, claims: &mut Vec<SignalClaim>, recent: &mut Vec<SignalRef>) {
    for claim in claims.drain(..) {
        release_hold(world, &claim.signal, ASPECT_CLEAR);
    }
    for signal in recent.drain(..) {
        with_side(world, &signal, |side| {
            if !side.occupied {
                side.aspect = ASPECT_CLEAR;
            }
        });
    }
}
