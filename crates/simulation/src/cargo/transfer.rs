use bevy::prelude::*;

use crate::config::BEGIN_TRANSFER_TIMEOUT;
use crate::ids::{CargoId, StationId};
use crate::objects::TransportMode;
use crate::orders::Order;
use crate::stations::StationManager;
use crate::vehicles::{leading_cargo_orders, SimContext, Status, TransferSlot, Train};

use super::payment::{calculate_delivered_cargo_payment, loading_modifier, transfer_timeout};

/// Distance from `origin` to `here`, if both stations exist.
fn source_distance(stations: &StationManager, origin: Option<StationId>, here: StationId) -> Option<i32> {
    stations.distance(origin?, here)
}

fn transfer_time(ctx: &SimContext, cargo: CargoId) -> u16 {
    ctx.objects.cargo(cargo).map_or(0, |c| c.transfer_time)
}

// =============================================================================
// Unloading
// =============================================================================

pub fn begin_unloading(train: &mut Train) {
    train.head.status = Status::Unloading;
    train.head.cargo_transfer_timeout = BEGIN_TRANSFER_TIMEOUT;
    train.veh2.visit_revenue = 0;
    train.set_all_pending();
}

/// One unloading tick: wait out the timeout, else unload the next pending
/// component, else settle the visit's revenue and start loading.
pub fn update_unloading(train: &mut Train, ctx: &mut SimContext) {
    if train.head.cargo_transfer_timeout > 0 {
        train.head.cargo_transfer_timeout -= 1;
        return;
    }
    match train.take_pending() {
        Some(slot) => train.head.cargo_transfer_timeout = unload_slot(train, ctx, slot),
        None => {
            let revenue = train.veh2.visit_revenue;
            if revenue != 0 {
                ctx.companies.apply_payment(train.head.owner, revenue);
                if let Some(company) = ctx.companies.get_mut(train.head.owner) {
                    if let Some(thought) = company.thought_for(train.head.id) {
                        company.ai_thoughts[thought].revenue += revenue;
                    }
                }
            }
            train.veh2.cur_month_revenue += revenue;
            train.veh2.visit_revenue = 0;
            begin_loading(train);
        }
    }
}

fn unload_slot(train: &mut Train, ctx: &mut SimContext, slot: TransferSlot) -> u16 {
    let Some(station) = train.head.station else {
        return 0;
    };
    let Some(cargo) = train.cargo(slot).cloned() else {
        return 0;
    };
    let Some(cargo_type) = cargo.cargo_type else {
        return 0;
    };
    if cargo.qty == 0 {
        return 0;
    }
    let accepted = ctx.stations.get(station).is_some_and(|s| s.accepts(cargo_type));
    let cargo_distance = source_distance(ctx.stations, cargo.town_from, station);

    if accepted {
        let tiles = cargo_distance.unwrap_or(0).max(0) as u32 / 32;
        let payment = calculate_delivered_cargo_payment(
            ctx.objects,
            cargo_type,
            cargo.qty as u16,
            tiles,
            cargo.num_days,
        );
        if let Some(company) = ctx.companies.get_mut(train.head.owner) {
            company.record_delivery(cargo_type, cargo.qty as u16, tiles, payment);
        }
        train.veh2.visit_revenue += payment;
    } else {
        let unload_all = leading_cargo_orders(ctx.orders, &train.head.orders)
            .contains(&Order::UnloadAll(cargo_type));
        if !unload_all {
            return 0;
        }
        let station_distance = ctx
            .stations
            .get(station)
            .and_then(|s| s.cargo_stats(cargo_type))
            .and_then(|stats| source_distance(ctx.stations, stats.origin, station));
        let Some(stats) = ctx
            .stations
            .get_mut(station)
            .and_then(|s| s.cargo_stats_mut(cargo_type))
        else {
            return 0;
        };
        let had_previous = stats.quantity != 0;
        stats.quantity = stats.quantity.saturating_add(cargo.qty as u16);
        let mut age = stats.enroute_age.saturating_add(cargo.num_days) as u32;
        if had_previous {
            let share = ((cargo.qty as u32) << 16) / stats.quantity.max(1) as u32;
            age = (age * (65536 - share.min(65536))) >> 16;
        }
        stats.enroute_age = age.min(u8::MAX as u32) as u8;
        let keep_station_origin = match (cargo_distance, station_distance) {
            (Some(cargo_dist), Some(station_dist)) => cargo_dist > station_dist,
            _ => stats.origin.is_some() && cargo.town_from.is_none(),
        };
        if !keep_station_origin {
            stats.origin = cargo.town_from;
        }
    }

    let modifier = loading_modifier(ctx.world, train, slot);
    if let Some(hold) = train.cargo_mut(slot) {
        hold.qty = 0;
        hold.num_days = 0;
        hold.town_from = None;
    }
    transfer_timeout(transfer_time(ctx, cargo_type), cargo.qty as u16, modifier)
}

// =============================================================================
// Loading
// =============================================================================

pub fn begin_loading(train: &mut Train) {
    train.head.status = Status::Loading;
    train.head.cargo_transfer_timeout = BEGIN_TRANSFER_TIMEOUT;
    train.set_all_pending();
}

/// One loading tick: wait out the timeout, else load the next pending
/// component, else either keep loading for a `WaitFor` order or depart.
pub fn update_loading(train: &mut Train, ctx: &mut SimContext) {
    if train.head.cargo_transfer_timeout > 0 {
        train.head.cargo_transfer_timeout -= 1;
        return;
    }
    if let Some(slot) = train.take_pending() {
        train.head.cargo_transfer_timeout = load_slot(train, ctx, slot);
        return;
    }

    let Ok(ring) = ctx.orders.ring(&train.head.orders) else {
        depart(train, ctx);
        return;
    };
    let mut next_order = None;
    for entry in ring.iter() {
        match entry.order {
            Order::WaitFor(cargo_type) => {
                if is_waiting_for(train, cargo_type) {
                    begin_loading(train);
                    return;
                }
            }
            Order::UnloadAll(_) => {}
            _ => {
                next_order = Some(entry.offset);
                break;
            }
        }
    }
    if let Some(offset) = next_order {
        train.head.orders.current_order = offset;
    }
    depart(train, ctx);
}

/// Some component carrying `cargo_type` still has room.
fn is_waiting_for(train: &Train, cargo_type: CargoId) -> bool {
    train
        .transfer_slots()
        .into_iter()
        .filter_map(|slot| train.cargo(slot))
        .any(|c| c.max_qty > 0 && c.cargo_type == Some(cargo_type) && !c.is_full())
}

fn depart(train: &mut Train, ctx: &mut SimContext) {
    train.begin_new_journey(ctx.tick);
    if train.head.mode == TransportMode::Air {
        train.head.status = Status::Taxiing2;
        train.head.air_timer = 0;
    } else {
        train.head.status = Status::Stopped;
    }
    ctx.orders.advance_to_next_routable_order(&mut train.head.orders);
    debug!("{:?} departing, next target {:?}", train.head.id, ctx.orders.target_station(&train.head.orders));
}

fn load_slot(train: &mut Train, ctx: &mut SimContext, slot: TransferSlot) -> u16 {
    let Some(station) = train.head.station else {
        return 0;
    };
    let Some(cargo) = train.cargo(slot).cloned() else {
        return 0;
    };
    if cargo.max_qty == 0 {
        return 0;
    }
    let Some(st) = ctx.stations.get(station) else {
        return 0;
    };
    let leading = leading_cargo_orders(ctx.orders, &train.head.orders);

    let mut cargo_type = cargo.cargo_type;
    if cargo.qty == 0 {
        let waited_for = leading.iter().find_map(|o| match o {
            Order::WaitFor(t) if cargo.accepts(*t) => Some(*t),
            _ => None,
        });
        cargo_type = match waited_for {
            Some(t) => Some(t),
            None => {
                let best = (0..32u8)
                    .filter(|&t| cargo.accepts(t))
                    .map(|t| (st.stock(t), t))
                    .fold((0u16, None), |(best_qty, best_t), (qty, t)| {
                        if qty > best_qty {
                            (qty, Some(t))
                        } else {
                            (best_qty, best_t)
                        }
                    });
                match best {
                    (0, _) => cargo_type,
                    (_, t) => t,
                }
            }
        };
    }
    let Some(cargo_type) = cargo_type else {
        return 0;
    };
    if let Some(hold) = train.cargo_mut(slot) {
        hold.cargo_type = Some(cargo_type);
    }
    if leading.contains(&Order::UnloadAll(cargo_type)) || cargo.is_full() {
        return 0;
    }

    let stock = st.stock(cargo_type);
    let room = (cargo.max_qty - cargo.qty) as u16;
    let qty = room.min(stock);
    let modifier = loading_modifier(ctx.world, train, slot);
    let timeout = transfer_timeout(transfer_time(ctx, cargo_type), qty, modifier);
    if qty == 0 {
        return timeout;
    }

    let station_distance = st
        .cargo_stats(cargo_type)
        .and_then(|stats| source_distance(ctx.stations, stats.origin, station));
    let cargo_distance = source_distance(ctx.stations, cargo.town_from, station);
    let Some(stats) = ctx
        .stations
        .get_mut(station)
        .and_then(|s| s.cargo_stats_mut(cargo_type))
    else {
        return 0;
    };
    let Some(hold) = train.cargo_mut(slot) else {
        return 0;
    };
    if hold.qty == 0 {
        hold.town_from = stats.origin;
        hold.num_days = stats.enroute_age;
    } else {
        hold.num_days = hold.num_days.max(stats.enroute_age);
        let replace = match (cargo_distance, station_distance) {
            (Some(cargo_dist), Some(station_dist)) => cargo_dist >= station_dist,
            (None, _) => true,
            (Some(_), None) => false,
        };
        if replace {
            hold.town_from = stats.origin;
        }
    }
    hold.qty += qty as u8;
    stats.quantity -= qty;
    timeout
}
