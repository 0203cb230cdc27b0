//! Reconciliation and wire benchmarks.
//!
//! A correction rewrites every history slot between the authoritative tick
//! and the present, so its cost grows with the round-trip time measured in
//! ticks. These benchmarks time a forced reconciliation at several depths,
//! plus the encode/decode cost of the state broadcast that triggers it.
//!
//! Run with: `cargo bench --bench resimulation_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use riposte_core::prelude::*;
use riposte_net::prelude::*;
use riposte_sim::oracle::stub::{Headless, RandomSampler};
use riposte_sim::prelude::*;

const ME: EntityId = EntityId::new(1);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A simulator and its history after `ticks` ticks of sampled play.
fn predicted(ticks: Tick, world: &Headless) -> (EntitySimulator, HistoryBuffer) {
    let config = SimConfig::default();
    let spawn = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
    let mut sim = EntitySimulator::new(ME, &config, spawn);
    sim.equip(WeaponName::Sword, &WeaponCatalog::default());
    let mut history = HistoryBuffer::new(config.net.history_capacity);
    history.record(SPAWN_TICK, InputSnapshot::idle(), sim.state().clone());

    let mut sampler = RandomSampler::new(3);
    for tick in 1..=ticks {
        let input = sampler.sample(tick);
        let out = sim.step(tick, &input, &world.oracles(), StepMode::Live);
        history.record(tick, input, out.state);
    }
    (sim, history)
}

// ---------------------------------------------------------------------------
// Benchmark 1: forced reconciliation depth
// ---------------------------------------------------------------------------

fn bench_reconcile_depth(c: &mut Criterion) {
    let world = Headless::default();
    let mut group = c.benchmark_group("reconcile_depth");

    for depth in [6u64, 30, 120, 600] {
        let latest = 800;
        let tick = latest - depth;
        let (_, reference) = predicted(latest, &world);
        let mut state = reference.state(tick).unwrap().clone();
        state.movement.position.x += 0.5;
        let snapshot = AuthoritativeSnapshot { tick, state };

        group.bench_with_input(BenchmarkId::from_parameter(depth), &snapshot, |b, snapshot| {
            let (mut sim, mut history) = predicted(latest, &world);
            let mut engine = ReconciliationEngine::default();
            b.iter(|| {
                engine.request_force();
                let outcome = engine.reconcile(
                    &mut sim,
                    &mut history,
                    Some(snapshot),
                    latest + 1,
                    &InputSnapshot::idle(),
                    &world.oracles(),
                );
                let _ = black_box(outcome);
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 2: state broadcast codec
// ---------------------------------------------------------------------------

fn bench_broadcast_codec(c: &mut Criterion) {
    let world = Headless::default();
    let (sim, _) = predicted(120, &world);
    let message = NetMessage::BroadcastState {
        entity: ME,
        tick: 120,
        state: sim.state().clone(),
    };
    let bytes = message.encode().unwrap();

    c.bench_function("broadcast_encode", |b| {
        b.iter(|| black_box(black_box(&message).encode()));
    });
    c.bench_function("broadcast_decode", |b| {
        b.iter(|| black_box(NetMessage::decode(black_box(&bytes))));
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_reconcile_depth, bench_broadcast_codec);
criterion_main!(benches);
