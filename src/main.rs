//! Recoil Sim Demo
//!
//! Runs a scripted two-agent match, replays it from the recorded inputs and
//! forces a client-side misprediction to show the correction path.
//!
//! Usage: `recoil-sim [config.json]`

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use recoil_sim::{
    VERSION,
    config::SimulationConfig,
    core::hash::StateHash,
    game::{
        events::SimEventData,
        input::{Button, InputSample},
        prediction::{InputTimeline, Reconciler},
        state::{EntityId, SimSnapshot},
        world::Simulation,
    },
};

/// Match length in seconds
const MATCH_SECONDS: u32 = 20;

/// Tick the scripted kill happens after
const KILL_TICK: u32 = 300;

/// Tick of the authoritative snapshot the client mispredicted
const CORRECTION_TICK: u32 = 120;

/// Ticks the client runs ahead of the authority
const CLIENT_LEAD: u32 = 30;

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => SimulationConfig::default(),
    };

    info!("Recoil Sim v{}", VERSION);
    info!("Tick Rate: {} Hz", config.tick_rate);

    let run = demo_match(&config)?;
    verify_replay(&config, &run)?;
    demo_correction(&config, &run)?;
    Ok(())
}

/// Scripted input for agent `index` at `tick`.
fn scripted_input(index: usize, tick: u32) -> InputSample {
    match index {
        // Runs back and forth, charges and releases shots, hops now and then.
        0 => {
            let move_x = if tick % 120 < 60 { 127 } else { -127 };
            let mut sample = InputSample::with_movement(move_x, 30);
            if tick % 50 < 25 {
                sample = sample.with_button(Button::Shoot1);
            }
            if tick % 90 == 10 {
                sample = sample.with_button(Button::Jump);
            }
            sample
        }
        // Taps the sidearm and swaps weapons every few seconds.
        _ => {
            let mut sample = InputSample::with_movement(-90, 90);
            if tick % 8 < 2 {
                sample = sample.with_button(Button::Shoot1);
            }
            if tick % 240 == 60 {
                sample = sample.with_weapon_slot(((tick / 240) % 2) as u8);
            }
            sample
        }
    }
}

fn scripted_inputs(ids: &[EntityId], tick: u32) -> BTreeMap<EntityId, InputSample> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| (*id, scripted_input(index, tick)))
        .collect()
}

/// Everything the later stages need from the match run.
struct MatchRun {
    ids: Vec<EntityId>,
    timeline: InputTimeline,
    spawned: SimSnapshot,
    after_kill: SimSnapshot,
    authoritative: SimSnapshot,
    hashes: BTreeMap<u32, StateHash>,
}

fn world(config: &SimulationConfig, ids: &[EntityId]) -> Result<Simulation> {
    let mut sim = Simulation::new(config.clone()).context("invalid simulation config")?;
    for id in ids {
        sim.spawn(*id)?;
    }
    Ok(sim)
}

fn demo_match(config: &SimulationConfig) -> Result<MatchRun> {
    info!("=== Starting Demo Match ===");

    let ids = vec![
        EntityId::new([0x11; 16]),
        EntityId::new([0x22; 16]),
    ];
    let mut sim = world(config, &ids)?;
    for id in &ids {
        let agent = sim.agent(id).context("agent missing after spawn")?;
        let (x, y) = agent.movement.position.to_floats();
        info!("Added agent {} at ({:.2}, {:.2})", id.short(), x, y);
    }
    let spawned = sim.snapshot().clone();

    let total_ticks = MATCH_SECONDS * sim.rate().hz();
    let mut timeline = InputTimeline::new();
    let mut hashes = BTreeMap::new();
    let mut after_kill = None;
    let mut authoritative = None;
    let mut shots = 0usize;

    for t in 1..=total_ticks {
        let inputs = scripted_inputs(&ids, t);
        for (id, sample) in &inputs {
            timeline.record(*id, t, *sample);
        }

        let result = sim.tick(&inputs);
        hashes.insert(result.tick, sim.compute_hash());

        for event in &result.events {
            match &event.data {
                SimEventData::WeaponFired { .. } => shots += 1,
                SimEventData::WeaponSwitched { slot } => {
                    info!("Tick {}: agent {} switched to slot {}", event.tick, event.entity.short(), slot);
                }
                SimEventData::Killed { killer } => {
                    info!("Tick {}: agent {} killed by {:?}", event.tick, event.entity.short(),
                          killer.map(|k| k.short()));
                }
                SimEventData::Respawned { position } => {
                    info!("Tick {}: agent {} respawned at {}", event.tick, event.entity.short(), position);
                }
                _ => {}
            }
        }

        if t == CORRECTION_TICK {
            authoritative = Some(sim.snapshot().clone());
        }
        if t == KILL_TICK {
            sim.kill(ids[1], Some(ids[0]))?;
            after_kill = Some(sim.snapshot().clone());
        }
        if t % (5 * sim.rate().hz()) == 0 {
            info!("Tick {}: {} shots so far, hash {}", t, shots, hex::encode(&sim.compute_hash()[..8]));
        }
    }

    info!("=== Match Results ===");
    for agent in sim.snapshot().agents.values() {
        let (x, y) = agent.movement.position.to_floats();
        info!(
            "Agent {}: alive={} pos=({:.2}, {:.2}) slot={} ammo={:?}",
            agent.id.short(),
            agent.alive,
            x,
            y,
            agent.loadout.switch_state().current_slot(),
            agent.loadout.current().and_then(|w| w.ammo()),
        );
    }
    info!("Final State Hash: {}", hex::encode(sim.compute_hash()));
    info!("Total shots: {}", shots);

    Ok(MatchRun {
        ids,
        timeline,
        spawned,
        after_kill: after_kill.context("match ended before the kill")?,
        authoritative: authoritative.context("match ended before the correction tick")?,
        hashes,
    })
}

fn verify_replay(config: &SimulationConfig, run: &MatchRun) -> Result<()> {
    info!("=== Verifying Determinism ===");
    let mut sim = world(config, &[])?;

    // The kill is not an input, so replay in two legs around it.
    sim.resimulate(run.spawned.clone(), &run.timeline, KILL_TICK)?;
    check_hash("Replay to kill", sim.compute_hash(), run.hashes.get(&KILL_TICK))?;

    let end = run.hashes.keys().next_back().copied().unwrap_or(KILL_TICK);
    sim.resimulate(run.after_kill.clone(), &run.timeline, end)?;
    check_hash("Replay to end", sim.compute_hash(), run.hashes.get(&end))?;

    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}

fn demo_correction(config: &SimulationConfig, run: &MatchRun) -> Result<()> {
    info!("=== Forcing a Misprediction ===");
    let mut client = world(config, &run.ids)?;
    let mut predicted = InputTimeline::new();
    let mut reconciler = Reconciler::new();
    let remote = run.ids[1];

    // The client guesses the remote agent idles for a second before the
    // authoritative snapshot arrives.
    let guess_window = (CORRECTION_TICK.saturating_sub(client.rate().hz()) + 1)..=CORRECTION_TICK;
    for t in 1..=CORRECTION_TICK + CLIENT_LEAD {
        let mut inputs = scripted_inputs(&run.ids, t);
        if guess_window.contains(&t) {
            inputs.insert(remote, InputSample::IDLE);
        }
        for (id, sample) in &inputs {
            predicted.record(*id, t, *sample);
        }
        client.tick(&inputs);
        reconciler.record(&client);
    }

    let correction = reconciler
        .on_authoritative(&mut client, run.authoritative.clone(), &predicted)?
        .context("expected a misprediction")?;
    info!(
        "Corrected at tick {}: predicted {} vs authoritative {}, {} ticks resimulated",
        correction.tick,
        correction
            .predicted_hash
            .map_or_else(|| "none".to_string(), |h| hex::encode(&h[..8])),
        hex::encode(&correction.authoritative_hash[..8]),
        correction.resimulated,
    );

    check_hash(
        "Corrected client",
        client.compute_hash(),
        run.hashes.get(&(CORRECTION_TICK + CLIENT_LEAD)),
    )?;
    info!("CORRECTION VERIFIED: client converged on the authoritative timeline");
    Ok(())
}

fn check_hash(label: &str, actual: StateHash, expected: Option<&StateHash>) -> Result<()> {
    let expected = expected.with_context(|| format!("{}: no recorded hash", label))?;
    info!("{}: {}", label, hex::encode(actual));
    if &actual != expected {
        bail!("{}: hash {} differs from recorded {}", label, hex::encode(actual), hex::encode(expected));
    }
    Ok(())
}
