use bevy::prelude::*;

use crate::calendar::{GameCalendar, TickCounter};
use crate::companies::CompanyManager;
use crate::config::SimulationSettings;
use crate::ids::VehicleId;
use crate::objects::ObjectRegistry;
use crate::orders::OrderTable;
use crate::sim_rng::SimRng;
use crate::stations::StationManager;
use crate::world::TileWorld;
use crate::SimulationSet;

use super::lifecycle::DailyOutcome;
use super::state::VehicleManager;
use super::types::Flow;
use super::update::{OtherVehicles, SimContext};

// =============================================================================
// Per-tick update
// =============================================================================

/// Advance every vehicle by one tick, front of the list first. Each vehicle
/// sees the others through `OtherVehicles` as they stand at that moment.
#[allow(clippy::too_many_arguments)]
pub fn update_vehicles(
    mut vehicles: ResMut<VehicleManager>,
    mut world: ResMut<TileWorld>,
    mut orders: ResMut<OrderTable>,
    mut stations: ResMut<StationManager>,
    mut companies: ResMut<CompanyManager>,
    objects: Res<ObjectRegistry>,
    mut rng: ResMut<SimRng>,
    settings: Res<SimulationSettings>,
    tick: Res<TickCounter>,
    calendar: Res<GameCalendar>,
) {
    let mut removed: Vec<VehicleId> = Vec::new();
    {
        let mut ctx = SimContext {
            world: &mut world,
            orders: &orders,
            stations: &mut stations,
            companies: &mut companies,
            objects: &objects,
            rng: &mut rng,
            settings: &settings,
            tick: tick.0,
            year: calendar.year,
        };
        let trains = &mut vehicles.trains;
        for i in 0..trains.len() {
            let (before, rest) = trains.split_at_mut(i);
            let Some((train, after)) = rest.split_first_mut() else {
                break;
            };
            let traffic = OtherVehicles::new(before, after, train.network_kind());
            if train.update(&mut ctx, &traffic) == Flow::Removed {
                removed.push(train.head.id);
            }
        }
    }

    for &id in &removed {
        if let Err(e) = orders.free_orders(&mut *vehicles, id) {
            warn!("failed to free orders of removed vehicle {:?}: {:?}", id, e);
        }
    }
    vehicles.remove_ids(&removed);
}

// =============================================================================
// Daily / monthly bookkeeping
// =============================================================================

#[allow(clippy::too_many_arguments)]
pub fn daily_vehicle_update(
    mut vehicles: ResMut<VehicleManager>,
    mut world: ResMut<TileWorld>,
    mut orders: ResMut<OrderTable>,
    mut stations: ResMut<StationManager>,
    mut companies: ResMut<CompanyManager>,
    objects: Res<ObjectRegistry>,
    mut rng: ResMut<SimRng>,
    settings: Res<SimulationSettings>,
    tick: Res<TickCounter>,
    calendar: Res<GameCalendar>,
) {
    if !calendar.new_day {
        return;
    }
    let mut auto_sell = Vec::new();
    {
        let mut ctx = SimContext {
            world: &mut world,
            orders: &orders,
            stations: &mut stations,
            companies: &mut companies,
            objects: &objects,
            rng: &mut rng,
            settings: &settings,
            tick: tick.0,
            year: calendar.year,
        };
        for train in &mut vehicles.trains {
            if train.on_new_day(&mut ctx) == DailyOutcome::AutoSell {
                auto_sell.push((train.head.id, train.head.owner));
            }
        }
    }

    for (id, owner) in auto_sell {
        info!("AI company {:?} auto-selling wrecked vehicle {:?}", owner, id);
        if let Err(e) = vehicles.sell(&mut world, &mut orders, &mut companies, id, owner) {
            warn!("auto-sale of {:?} failed: {:?}", id, e);
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn monthly_vehicle_update(
    mut vehicles: ResMut<VehicleManager>,
    mut world: ResMut<TileWorld>,
    orders: Res<OrderTable>,
    mut stations: ResMut<StationManager>,
    mut companies: ResMut<CompanyManager>,
    objects: Res<ObjectRegistry>,
    mut rng: ResMut<SimRng>,
    settings: Res<SimulationSettings>,
    tick: Res<TickCounter>,
    calendar: Res<GameCalendar>,
) {
    if !calendar.new_month {
        return;
    }
    let mut ctx = SimContext {
        world: &mut world,
        orders: &orders,
        stations: &mut stations,
        companies: &mut companies,
        objects: &objects,
        rng: &mut rng,
        settings: &settings,
        tick: tick.0,
        year: calendar.year,
    };
    for train in &mut vehicles.trains {
        train.on_new_month(&mut ctx);
    }
}

// =============================================================================
// Plugin
// =============================================================================

pub struct VehiclesPlugin;

impl Plugin for VehiclesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VehicleManager>()
            .add_systems(
                FixedUpdate,
                update_vehicles.in_set(SimulationSet::Simulation),
            )
            .add_systems(
                FixedUpdate,
                (daily_vehicle_update, monthly_vehicle_update)
                    .chain()
                    .in_set(SimulationSet::PostSim),
            );
        crate::register_saveable::<VehicleManager>(app);
    }
}
