//! # TestNetwork: headless integration test harness
//!
//! Provides a fluent builder that wraps `bevy::app::App` + `SimulationPlugin`
//! for running whole-network scenarios without a window or renderer: lay
//! track, put down stations and signals, buy and start trains, then tick the
//! `FixedUpdate` schedule and inspect the resources.

mod assertions;
mod queries;
mod setup;

use bevy::app::App;
use bevy::prelude::*;

use crate::companies::CompanyManager;
use crate::ids::{CompanyId, Money, VehicleId};
use crate::SimulationPlugin;

/// Cash the default player company starts with.
pub const TEST_COMPANY_CASH: Money = 10_000_000;

/// A headless Bevy App wrapping `SimulationPlugin` for integration testing.
///
/// Use builder methods to set up the network, then call `tick()` to advance
/// the simulation and query/assert on the resulting state.
pub struct TestNetwork {
    app: App,
    company: CompanyId,
    /// Vehicles bought through the builder, in purchase order.
    vehicles: Vec<VehicleId>,
}

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// An empty world with one player company and default settings.
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(SimulationPlugin);

        // Run one update so Startup systems execute.
        app.update();

        let company = app
            .world_mut()
            .resource_mut::<CompanyManager>()
            .add("Player", true, TEST_COMPANY_CASH);

        Self {
            app,
            company,
            vehicles: Vec::new(),
        }
    }
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self::new()
    }
}
