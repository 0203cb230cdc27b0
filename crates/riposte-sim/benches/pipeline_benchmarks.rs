//! Pipeline step benchmarks.
//!
//! Resimulation replays many ticks inside a single frame, so the per-tick cost
//! of [`EntitySimulator::step`] bounds how deep a correction can go. At 60 Hz
//! with the default 1024-tick history, a worst-case resimulation must stay
//! well under one 16.67ms frame.
//!
//! Run with: `cargo bench --bench pipeline_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use riposte_core::prelude::*;
use riposte_sim::oracle::stub::{Headless, RandomSampler};
use riposte_sim::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn armed_simulator(config: &SimConfig) -> EntitySimulator {
    let spawn = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
    let mut sim = EntitySimulator::new(EntityId::new(1), config, spawn);
    sim.equip(WeaponName::Sword, &WeaponCatalog::default());
    sim
}

fn sampled_inputs(seed: u64, ticks: u64) -> Vec<InputSnapshot> {
    let mut sampler = RandomSampler::new(seed);
    (1..=ticks).map(|tick| sampler.sample(tick)).collect()
}

// ---------------------------------------------------------------------------
// Benchmark 1: single step
// ---------------------------------------------------------------------------

fn bench_single_step(c: &mut Criterion) {
    let config = SimConfig::default();
    let world = Headless::default();
    let input = InputSnapshot::moving(Vec2::new(0.3, 1.0), true);

    c.bench_function("single_step_moving", |b| {
        let mut sim = armed_simulator(&config);
        let mut tick = 0;
        b.iter(|| {
            tick += 1;
            let out = sim.step(tick, black_box(&input), &world.oracles(), StepMode::Live);
            black_box(out.state.jump.vertical_velocity);
        });
    });
}

// ---------------------------------------------------------------------------
// Benchmark 2: resimulation depth
// ---------------------------------------------------------------------------

fn bench_resimulate_depth(c: &mut Criterion) {
    let config = SimConfig::default();
    let world = Headless::default();
    let mut group = c.benchmark_group("resimulate_depth");

    for depth in [10u64, 120, 600] {
        let inputs = sampled_inputs(42, depth);
        let start = armed_simulator(&config).state().clone();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &inputs, |b, inputs| {
            let mut sim = armed_simulator(&config);
            b.iter(|| {
                sim.force_set(0, &start);
                for (i, input) in inputs.iter().enumerate() {
                    sim.step(i as Tick + 1, input, &world.oracles(), StepMode::Resimulate);
                }
                black_box(sim.state().position());
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 3: state digest
// ---------------------------------------------------------------------------

fn bench_state_digest(c: &mut Criterion) {
    let config = SimConfig::default();
    let world = Headless::default();
    let mut sim = armed_simulator(&config);
    for (i, input) in sampled_inputs(7, 120).iter().enumerate() {
        sim.step(i as Tick + 1, input, &world.oracles(), StepMode::Live);
    }
    let state = sim.state().clone();

    c.bench_function("state_digest", |b| {
        b.iter(|| black_box(state.digest()));
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_single_step,
    bench_resimulate_depth,
    bench_state_digest,
);
criterion_main!(benches);
