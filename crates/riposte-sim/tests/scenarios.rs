//! End-to-end pipeline scenarios: jumping, melee combos, damage application.

use riposte_core::prelude::*;
use riposte_sim::damage::HealthLedger;
use riposte_sim::oracle::stub::{FlatGround, Headless, NoParry};
use riposte_sim::prelude::*;

const ME: EntityId = EntityId::new(1);
const FOE: EntityId = EntityId::new(2);

fn armed(config: &SimConfig) -> EntitySimulator {
    let spawn = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
    let mut sim = EntitySimulator::new(ME, config, spawn);
    sim.equip(WeaponName::Sword, &WeaponCatalog::default());
    sim
}

/// Reports every target twice per sweep, as two colliders of the same body
/// would.
struct DoubleOverlap(EntityId);

impl HitScanOracle for DoubleOverlap {
    fn scan(&self, attacker: EntityId, _: Vec3, _: Vec3, _: f32, _: LayerMask) -> Vec<EntityId> {
        if attacker == self.0 {
            Vec::new()
        } else {
            vec![self.0, self.0]
        }
    }
}

// ---------------------------------------------------------------------------
// Jump / gravity
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_grounded_jump_reaches_six_metres_per_second() {
    let config = SimConfig::default();
    let mut spawn = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
    spawn.jump.jump_timeout = 0.0;
    let mut sim = EntitySimulator::new(ME, &config, spawn);
    let world = Headless::default();

    let out = sim.step(1, &InputSnapshot::jumping(), &world.oracles(), StepMode::Live);

    // Launch velocity is sqrt(1.2 * -2 * -15) = 6.0, then one tick of gravity.
    let launched = out.state.jump.vertical_velocity - config.locomotion.gravity * sim.dt();
    assert!((launched - 6.0).abs() < 1e-5, "launched at {launched}");
    assert!(out.state.jump.jump);
    assert!(out.state.animation.params.jump);
}

#[test]
fn jump_then_land_clamps_velocity_once() {
    let config = SimConfig::default();
    let mut spawn = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
    spawn.jump.jump_timeout = 0.0;
    let mut sim = EntitySimulator::new(ME, &config, spawn);
    let world = Headless::default();

    let mut left_ground = false;
    let mut landed_at = None;
    let mut prev = sim.state().clone();
    for tick in 1..=120 {
        let input = if tick <= 3 {
            InputSnapshot::jumping()
        } else {
            InputSnapshot::idle()
        };
        let out = sim.step(tick, &input, &world.oracles(), StepMode::Live);

        // Airborne entities never accept jump input.
        if !prev.grounded {
            assert!(!out.state.jump.jump, "jumped while airborne at tick {tick}");
            left_ground = true;
        }
        // The first grounded tick after a fall clamps to exactly -2 before
        // gravity is applied.
        if left_ground && landed_at.is_none() && prev.grounded && prev.jump.vertical_velocity < -2.0 {
            let clamped = out.state.jump.vertical_velocity - config.locomotion.gravity * sim.dt();
            assert!((clamped - config.locomotion.grounded_velocity).abs() < 1e-5);
            landed_at = Some(tick);
        }
        prev = out.state;
    }

    assert!(left_ground);
    assert!(landed_at.is_some());
    assert!(sim.state().grounded);
    assert_eq!(sim.state().position().y, 0.0);
}

#[test]
fn jump_refused_until_timeout_elapses() {
    let config = SimConfig::default();
    let mut sim = armed(&config);
    let world = Headless::default();

    // Spawned with a full jump timeout.
    let out = sim.step(1, &InputSnapshot::jumping(), &world.oracles(), StepMode::Live);
    assert!(!out.state.jump.jump);

    let mut tick = 1;
    while sim.state().jump.jump_timeout > 0.0 {
        tick += 1;
        sim.step(tick, &InputSnapshot::idle(), &world.oracles(), StepMode::Live);
    }
    tick += 1;
    let out = sim.step(tick, &InputSnapshot::jumping(), &world.oracles(), StepMode::Live);
    assert!(out.state.jump.jump);
}

// ---------------------------------------------------------------------------
// Damage
// ---------------------------------------------------------------------------

#[test]
fn scenario_b_duplicate_overlaps_apply_once() {
    let config = SimConfig::default();
    let mut attacker = armed(&config);
    let ground = FlatGround::at(0.0);
    let hits = DoubleOverlap(FOE);
    let oracles = Oracles {
        ground: &ground,
        hits: &hits,
        parry: &NoParry,
        motion: &ground,
    };

    let mut ledger = HealthLedger::new(config.combat.max_health);
    ledger.spawn(FOE);
    let mut windows = 0;
    let mut was_open = false;

    for tick in 1..=90 {
        let input = if tick == 1 {
            InputSnapshot::attacking(AttackClick::Light)
        } else {
            InputSnapshot::idle()
        };
        let out = attacker.step(tick, &input, &oracles, StepMode::Live);
        let open = out.state.animation.params.can_deal_melee_damage;
        if open && !was_open {
            windows += 1;
        }
        was_open = open;
        for hit in &out.damage {
            assert_eq!(hit.amount, 15);
            ledger.apply(hit);
        }
    }

    assert_eq!(windows, 1);
    assert_eq!(ledger.health(FOE), Some(85));
}

#[test]
fn hit_reaction_interrupts_the_targets_pending_hits() {
    let config = SimConfig::default();
    let mut sim = armed(&config);
    let ground = FlatGround::at(0.0);
    let hits = DoubleOverlap(FOE);
    let oracles = Oracles {
        ground: &ground,
        hits: &hits,
        parry: &NoParry,
        motion: &ground,
    };

    // Heavy attack, then get hit once the damage window has opened.
    sim.step(1, &InputSnapshot::attacking(AttackClick::Heavy), &oracles, StepMode::Live);
    let mut tick = 1;
    while sim.state().damage.pending.is_empty() {
        tick += 1;
        assert!(tick < 120, "damage window never opened");
        sim.step(tick, &InputSnapshot::idle(), &oracles, StepMode::Live);
    }

    sim.queue_reaction(Reaction::TakeDamage { take_damage_id: 1 });
    let out = sim.step(tick + 1, &InputSnapshot::idle(), &oracles, StepMode::Live);
    assert!(out.animation_events.contains(&AnimationEvent::Interrupted));
    assert!(out.state.damage.pending.is_empty());

    let mut committed = 0;
    for t in tick + 2..tick + 120 {
        committed += sim.step(t, &InputSnapshot::idle(), &oracles, StepMode::Live).damage.len();
    }
    assert_eq!(committed, 0);
}

// ---------------------------------------------------------------------------
// Attack chain
// ---------------------------------------------------------------------------

/// Step idle input at least once, until the combo window of the attack that
/// is now playing opens. Returns the last tick run.
fn idle_until_combo(sim: &mut EntitySimulator, mut tick: Tick, world: &Headless) -> Tick {
    loop {
        tick += 1;
        assert!(tick < 400, "combo window never opened");
        let out = sim.step(tick, &InputSnapshot::idle(), &world.oracles(), StepMode::Live);
        if out.state.animation.params.can_combo {
            return tick;
        }
    }
}

#[test]
fn scenario_d_light_chain_through_the_pipeline() {
    let config = SimConfig::default();
    let mut sim = armed(&config);
    let world = Headless::default();
    let light = InputSnapshot::attacking(AttackClick::Light);

    let out = sim.step(1, &light, &world.oracles(), StepMode::Live);
    assert_eq!(
        out.attack,
        AttackOutcome::Attack {
            attack_id: 101,
            combo: false
        }
    );

    let mut tick = 1;
    for expected in [102, 103] {
        tick = idle_until_combo(&mut sim, tick, &world) + 1;
        let out = sim.step(tick, &light, &world.oracles(), StepMode::Live);
        assert_eq!(
            out.attack,
            AttackOutcome::Attack {
                attack_id: expected,
                combo: true
            }
        );
    }

    // The finisher has no combo window: a fourth click changes nothing.
    for _ in 0..30 {
        tick += 1;
        let out = sim.step(tick, &light, &world.oracles(), StepMode::Live);
        assert!(!matches!(out.attack, AttackOutcome::Attack { .. }));
    }
    assert_eq!(sim.state().attack.last_attack_id, 103);
}
