//! Property tests for the history ring, reconciliation and the input queue.

use proptest::prelude::*;
use riposte_core::prelude::*;
use riposte_net::prelude::*;
use riposte_sim::oracle::stub::Headless;
use riposte_sim::prelude::*;

const ME: EntityId = EntityId::new(1);

fn input_strategy() -> impl Strategy<Value = InputSnapshot> {
    (
        prop::bool::weighted(0.05),
        (-1i8..=1).prop_map(f32::from),
        (-1i8..=1).prop_map(f32::from),
        any::<bool>(),
        prop_oneof![
            10 => Just(AttackClick::None),
            2 => Just(AttackClick::Light),
            1 => Just(AttackClick::Heavy),
        ],
    )
        .prop_map(|(jump, x, y, sprint, attack)| InputSnapshot {
            jump,
            movement: MoveInput {
                direction: Vec2::new(x, y),
                sprint,
            },
            look: LookInput::default(),
            attack,
        })
}

fn state_marked(tick: Tick) -> StateSnapshot {
    let mut state = StateSnapshot::spawn(Vec3::ZERO, 0.0, &LocomotionConfig::default());
    state.movement.position.x = tick as f32;
    state
}

fn predicted(inputs: &[InputSnapshot]) -> (EntitySimulator, HistoryBuffer) {
    let config = SimConfig::default();
    let spawn = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
    let mut sim = EntitySimulator::new(ME, &config, spawn);
    sim.equip(WeaponName::Sword, &WeaponCatalog::default());
    let mut history = HistoryBuffer::new(config.net.history_capacity);
    history.record(SPAWN_TICK, InputSnapshot::idle(), sim.state().clone());
    let world = Headless::default();
    for (i, input) in inputs.iter().enumerate() {
        let tick = i as Tick + 1;
        let out = sim.step(tick, input, &world.oracles(), StepMode::Live);
        history.record(tick, *input, out.state);
    }
    (sim, history)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ring_returns_what_was_written_until_overwritten(
        capacity in 1usize..48,
        count in 1u64..200,
    ) {
        let mut history = HistoryBuffer::new(capacity);
        for tick in 1..=count {
            history.record(tick, InputSnapshot::idle(), state_marked(tick));
        }
        for tick in 1..=count {
            let retained = tick + capacity as u64 > count;
            match history.get(tick) {
                Some(entry) => {
                    prop_assert!(retained);
                    prop_assert_eq!(entry.tick, tick);
                    prop_assert_eq!(&entry.state, &state_marked(tick));
                }
                None => prop_assert!(!retained),
            }
            prop_assert_eq!(history.is_evicted(tick), !retained);
        }
    }

    #[test]
    fn reconciliation_is_idempotent(
        inputs in prop::collection::vec(input_strategy(), 10..120),
        at in 0usize..1000,
        shift in -200i32..200,
    ) {
        let tick = (at % inputs.len()) as Tick + 1;
        let next_tick = inputs.len() as Tick + 1;
        let world = Headless::default();

        let (mut once, mut once_history) = predicted(&inputs);
        let (mut twice, mut twice_history) = predicted(&inputs);

        let mut state = once_history.state(tick).unwrap().clone();
        state.movement.position.z += shift as f32 * 0.01;
        let snapshot = AuthoritativeSnapshot { tick, state };

        let mut engine = ReconciliationEngine::default();
        engine.request_force();
        engine.reconcile(&mut once, &mut once_history, Some(&snapshot), next_tick, &InputSnapshot::idle(), &world.oracles()).unwrap();

        let mut engine = ReconciliationEngine::default();
        for _ in 0..2 {
            engine.request_force();
            engine.reconcile(&mut twice, &mut twice_history, Some(&snapshot), next_tick, &InputSnapshot::idle(), &world.oracles()).unwrap();
        }

        prop_assert_eq!(once.state().digest(), twice.state().digest());
        for t in tick..next_tick {
            prop_assert_eq!(once_history.get(t), twice_history.get(t));
        }
    }

    #[test]
    fn queue_hands_out_consecutive_ticks(
        order in Just((1u64..=40).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let mut queue = InputQueue::new(SPAWN_TICK, 8);
        for tick in &order {
            queue.push(*tick, InputSnapshot::idle());
        }
        let mut consumed = Vec::new();
        while !queue.is_empty() {
            consumed.extend(queue.drain().into_iter().map(|q| q.tick));
        }
        prop_assert_eq!(consumed, (1u64..=40).collect::<Vec<_>>());
        prop_assert_eq!(queue.stats().filled, 0);
    }
}
