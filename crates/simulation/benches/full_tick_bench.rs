//! Criterion benchmark: full simulation tick with a growing fleet.
//!
//! Measures one `FixedUpdate` run on a signalled loop carrying 1, 4 and 10
//! trains. The loop is sized so the trains start one block apart and keep
//! moving, which exercises connection queries, signal claims and releases
//! on nearly every tick.
//!
//! Run with: cargo bench -p loco_simulation --bench full_tick_bench --features bench

use bevy::prelude::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use loco_simulation::objects::{PASSENGER_COACH, STEAM_LOCOMOTIVE};
use loco_simulation::test_harness::TestNetwork;
use loco_simulation::world::{Pos3, SignalSides};

/// Straights per side of the loop.
const SIDE: i32 = 40;

// ---------------------------------------------------------------------------
// Helper: a loop with `trains` evenly spaced trains
// ---------------------------------------------------------------------------

fn create_benchmark_network(trains: i32) -> TestNetwork {
    let mut net = TestNetwork::new().with_loop(Pos3::new(0, 0, 0), SIDE as u32);

    // Trains and signals go on the top side only, heading west, one block
    // (four straights) per train.
    let spacing = (SIDE / trains.max(1)).max(4);
    for i in 0..trains {
        let x = -32 * spacing * i;
        net = net
            .with_signal(Pos3::new(x, 0, 0), 0, SignalSides::ONE_WAY)
            .with_train(&[STEAM_LOCOMOTIVE, PASSENGER_COACH], Pos3::new(x - 64, 0, 0), 0);
    }

    // Settle: let every train reach speed.
    net.tick(50);
    net
}

// ---------------------------------------------------------------------------
// Benchmark: full simulation tick at varying fleet sizes
// ---------------------------------------------------------------------------

fn bench_full_sim_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_sim_tick");
    group.sample_size(50);

    for &count in &[1, 4, 10] {
        let mut net = create_benchmark_network(count);

        group.bench_with_input(
            BenchmarkId::new("fixed_update", format!("{count}_trains")),
            &count,
            |b, _| {
                b.iter(|| {
                    net.world_mut().run_schedule(FixedUpdate);
                });
            },
        );
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Register benchmark group
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_full_sim_tick);
criterion_main!(benches);
