//! Reconciliation against hand-built authoritative snapshots.

use riposte_core::prelude::*;
use riposte_net::prelude::*;
use riposte_sim::oracle::stub::Headless;
use riposte_sim::prelude::*;

const ME: EntityId = EntityId::new(1);

/// Inputs for ticks 1..=60: idle with a jump at tick 55 and a turn from 57.
fn scripted_input(tick: Tick) -> InputSnapshot {
    match tick {
        55 => InputSnapshot::jumping(),
        57..=Tick::MAX => InputSnapshot::moving(Vec2::new(1.0, 0.0), false),
        _ => InputSnapshot::idle(),
    }
}

fn predicted_run(spawn_z: f32, ticks: Tick) -> (EntitySimulator, HistoryBuffer, Headless) {
    let config = SimConfig::default();
    let spawn = StateSnapshot::spawn(Vec3::new(0.0, 0.0, spawn_z), 0.0, &config.locomotion);
    let mut sim = EntitySimulator::new(ME, &config, spawn);
    sim.equip(WeaponName::Sword, &WeaponCatalog::default());
    let mut history = HistoryBuffer::new(config.net.history_capacity);
    history.record(SPAWN_TICK, InputSnapshot::idle(), sim.state().clone());

    let world = Headless::default();
    for tick in 1..=ticks {
        let input = scripted_input(tick);
        let out = sim.step(tick, &input, &world.oracles(), StepMode::Live);
        history.record(tick, input, out.state);
    }
    (sim, history, world)
}

#[test]
fn scenario_c_position_error_triggers_resimulation() {
    let (mut sim, mut history, world) = predicted_run(10.0, 60);
    assert_eq!(history.state(50).unwrap().position(), Vec3::new(0.0, 0.0, 10.0));

    let mut corrected = history.state(50).unwrap().clone();
    corrected.movement.position = Vec3::new(0.0, 0.0, 10.5);
    corrected.movement.previous_position = corrected.movement.position;
    let snapshot = AuthoritativeSnapshot {
        tick: 50,
        state: corrected.clone(),
    };
    let inputs_before: Vec<_> = (50..=60).map(|t| *history.input(t).unwrap()).collect();

    let mut engine = ReconciliationEngine::new(ReconcileConfig::from(&SimConfig::default().net));
    let outcome = engine
        .reconcile(&mut sim, &mut history, Some(&snapshot), 61, &InputSnapshot::idle(), &world.oracles())
        .unwrap();

    let ReconcileOutcome::Resimulated { from, to, reason } = outcome else {
        panic!("expected resimulation, got {outcome:?}");
    };
    assert_eq!((from, to), (50, 60));
    let DivergenceReason::Position { error } = reason else {
        panic!("expected a position divergence, got {reason:?}");
    };
    assert!((error - 0.5).abs() < 1e-4);

    // Slot 50 now holds the authoritative state, inputs are untouched.
    assert_eq!(history.state(50), Some(&corrected));
    let inputs_after: Vec<_> = (50..=60).map(|t| *history.input(t).unwrap()).collect();
    assert_eq!(inputs_after, inputs_before);

    // Ticks 51..=60 match an independent replay of the original inputs.
    let config = SimConfig::default();
    let mut reference = EntitySimulator::new(ME, &config, corrected.clone());
    reference.equip(WeaponName::Sword, &WeaponCatalog::default());
    reference.force_set(50, &corrected);
    for tick in 51..=60 {
        let out = reference.step(tick, &scripted_input(tick), &world.oracles(), StepMode::Resimulate);
        assert_eq!(history.state(tick), Some(&out.state), "tick {tick}");
    }
    assert_eq!(sim.state(), reference.state());
    assert_eq!(sim.tick(), 60);
    assert!(sim.state().position().z > 10.4);
}

#[test]
fn reconciling_twice_equals_reconciling_once() {
    let (mut once, mut once_history, world) = predicted_run(0.0, 60);
    let (mut twice, mut twice_history, _) = predicted_run(0.0, 60);

    let mut state = once_history.state(40).unwrap().clone();
    state.movement.position.x += 1.0;
    state.movement.yaw = 45.0;
    let snapshot = AuthoritativeSnapshot { tick: 40, state };

    let mut engine = ReconciliationEngine::default();
    engine
        .reconcile(&mut once, &mut once_history, Some(&snapshot), 61, &InputSnapshot::idle(), &world.oracles())
        .unwrap();

    let mut engine = ReconciliationEngine::default();
    for _ in 0..2 {
        engine.request_force();
        engine
            .reconcile(&mut twice, &mut twice_history, Some(&snapshot), 61, &InputSnapshot::idle(), &world.oracles())
            .unwrap();
    }

    assert_eq!(once.state(), twice.state());
    for tick in 40..=60 {
        assert_eq!(once_history.get(tick), twice_history.get(tick));
    }
    assert_eq!(engine.stats().resimulations, 2);
}

#[test]
fn corrected_run_converges_on_the_next_snapshot() {
    let (mut sim, mut history, world) = predicted_run(0.0, 60);
    let mut state = history.state(30).unwrap().clone();
    state.movement.position.z += 2.0;
    state.movement.previous_position.z += 2.0;

    let mut engine = ReconciliationEngine::default();
    let snapshot = AuthoritativeSnapshot { tick: 30, state };
    engine
        .reconcile(&mut sim, &mut history, Some(&snapshot), 61, &InputSnapshot::idle(), &world.oracles())
        .unwrap();

    // The authority's next snapshot is what the corrected history predicted.
    let next = AuthoritativeSnapshot {
        tick: 45,
        state: history.state(45).unwrap().clone(),
    };
    let outcome = engine
        .reconcile(&mut sim, &mut history, Some(&next), 61, &InputSnapshot::idle(), &world.oracles())
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Converged { tick: 45 });
}

#[test]
fn pending_damage_mismatch_resimulates() {
    let (mut sim, mut history, world) = predicted_run(0.0, 20);
    let mut state = history.state(10).unwrap().clone();
    state.damage.pending.insert(EntityId::new(2), 15);
    let snapshot = AuthoritativeSnapshot { tick: 10, state };

    let mut engine = ReconciliationEngine::default();
    let outcome = engine
        .reconcile(&mut sim, &mut history, Some(&snapshot), 21, &InputSnapshot::idle(), &world.oracles())
        .unwrap();
    assert!(matches!(
        outcome,
        ReconcileOutcome::Resimulated {
            reason: DivergenceReason::PendingDamage {
                local: 0,
                authoritative: 1
            },
            ..
        }
    ));
}
