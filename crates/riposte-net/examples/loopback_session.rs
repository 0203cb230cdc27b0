//! Headless two-player session over jittery in-memory links.
//!
//! A host simulates both fighters authoritatively, with one hazard between
//! them. Each client predicts its own fighter from seeded random input and
//! extrapolates the other one. At
//! the end the reconciliation and queue counters are printed as JSON.
//!
//! Run with:
//!   RUST_LOG=riposte_net=debug cargo run --example loopback_session -p riposte-net -- 600
//!
//! The optional argument is the number of ticks to run (default 600).

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use riposte_core::prelude::*;
use riposte_net::prelude::*;
use riposte_sim::damage::Hazard;
use riposte_sim::oracle::stub::RandomSampler;

const BASE_LATENCY: Tick = 4;
const JITTER: Tick = 3;

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

struct Remote {
    entity: EntityId,
    participant: Participant,
    up: LoopbackLink,
    down: LoopbackLink,
}

fn spawn_state(x: f32, z: f32, yaw: f32, config: &SimConfig) -> StateSnapshot {
    StateSnapshot::spawn(Vec3::new(x, 0.0, z), yaw, &config.locomotion)
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let ticks: Tick = match std::env::args().nth(1) {
        Some(arg) => arg.parse().context("tick count must be a positive integer")?,
        None => 600,
    };

    let config = SimConfig::default();
    config.validate()?;
    let catalog = WeaponCatalog::default();

    let fighters = [
        (EntityId::new(1), spawn_state(0.0, 0.0, 0.0, &config), WeaponName::Sword),
        (EntityId::new(2), spawn_state(0.0, 2.0, 180.0, &config), WeaponName::Staff),
    ];

    let mut host = Participant::new(&config, &catalog);
    for (entity, spawn, weapon) in &fighters {
        host.spawn_authoritative(*entity, spawn.clone(), *weapon);
    }
    host.add_hazard(Hazard::new(Vec3::new(1.5, 0.0, 1.0), 0.5));

    let mut remotes: Vec<Remote> = fighters
        .iter()
        .enumerate()
        .map(|(seed, (entity, spawn, weapon))| {
            let mut participant = Participant::new(&config, &catalog);
            for (other, other_spawn, other_weapon) in &fighters {
                if other != entity {
                    participant.spawn_observed(*other, other_spawn.clone(), *other_weapon);
                }
            }
            let sampler = RandomSampler::new(seed as u64 + 1);
            participant.spawn_owned(*entity, spawn.clone(), *weapon, Box::new(sampler));
            Remote {
                entity: *entity,
                participant,
                up: LoopbackLink::new(BASE_LATENCY),
                down: LoopbackLink::new(BASE_LATENCY),
            }
        })
        .collect();

    // -- session loop -------------------------------------------------------

    let mut jitter = Pcg64::seed_from_u64(99);
    let mut corrections = 0usize;

    for now in 1..=ticks {
        for remote in &mut remotes {
            if let Some(report) = remote.participant.tick_once() {
                corrections += report
                    .reconciled
                    .iter()
                    .filter(|(_, outcome)| matches!(outcome, ReconcileOutcome::Resimulated { .. }))
                    .count();
            }
            for message in remote.participant.drain_outbox() {
                let latency = BASE_LATENCY + jitter.gen_range(0..=JITTER);
                remote.up.send_with_latency(now, latency, &message)?;
            }
        }
        for remote in &mut remotes {
            for message in remote.up.deliver(now)? {
                host.receive(message);
            }
        }

        host.tick_once();
        let broadcast = host.drain_outbox();
        for remote in &mut remotes {
            for message in &broadcast {
                remote.down.send(now, message)?;
            }
            for message in remote.down.deliver(now)? {
                remote.participant.receive(message);
            }
        }

        for notice in host.drain_notices() {
            println!("tick {now:>5}: {notice:?}");
        }
    }

    // -- summary ------------------------------------------------------------

    println!("ran {ticks} ticks, {corrections} corrections");
    for (entity, _, _) in &fighters {
        let health = host.health(*entity).unwrap_or_default();
        let queue = host.queue_stats(*entity).copied().unwrap_or_default();
        println!("{entity}: health {health}, queue {}", serde_json::to_string(&queue)?);
    }
    for remote in &remotes {
        let client = &remote.participant;
        let stats = client.reconcile_stats(remote.entity).copied().unwrap_or_default();
        let drift = match (client.history(remote.entity), host.simulator(remote.entity)) {
            (Some(history), Some(authority)) => history
                .state(authority.tick())
                .map(|predicted| predicted.position().distance(authority.state().position())),
            _ => None,
        };
        println!(
            "client of {}: reconcile {}, drift {drift:?}, uplink {} bytes",
            remote.entity,
            serde_json::to_string(&stats)?,
            remote.up.bytes_sent(),
        );
    }

    Ok(())
}
