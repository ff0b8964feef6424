//! Simulation World
//!
//! Owns the replicated [`SimSnapshot`] and advances it one tick at a time.
//!
//! ## Tick order
//!
//! 1. Advance the tick counter
//! 2. Respawn dead agents whose respawn timer expired
//! 3. Run the agent pipeline for every agent, in id order
//!
//! Lifecycle calls made between ticks (`spawn`, `kill`, ...) queue their
//! events; they are returned with the next tick's result.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, SimulationConfig};
use crate::core::fixed::FIXED_ONE;
use crate::core::hash::StateHash;
use crate::core::time::{Tick, TickRate};
use crate::core::vec2::FixedVec2;
use crate::game::agent::{tick_agent, TickContext};
use crate::game::events::{SimEvent, SimEventData};
use crate::game::input::InputSample;
use crate::game::movement::{CharacterCollider, FlatGround, MovementIntegrator};
use crate::game::prediction::InputTimeline;
use crate::game::state::{AgentState, EntityId, SimSnapshot};
use crate::game::timer::TickTimer;

/// Errors from misusing the simulation API.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Spawn with an id that is already present
    #[error("entity {0} already exists")]
    DuplicateEntity(EntityId),

    /// Operation on an id that is not present
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// Resimulation target lies before the snapshot
    #[error("snapshot at tick {snapshot} is newer than target tick {target}")]
    SnapshotInFuture {
        /// Snapshot tick
        snapshot: Tick,
        /// Requested end tick
        target: Tick,
    },

    /// Snapshot bytes could not be decoded
    #[error("snapshot decode failed: {0}")]
    Decode(#[from] bincode::Error),
}

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Tick that was simulated
    pub tick: Tick,
    /// Events generated this tick, plus any queued by lifecycle calls
    pub events: Vec<SimEvent>,
}

/// The deterministic world.
pub struct Simulation<C = FlatGround> {
    config: SimulationConfig,
    rate: TickRate,
    integrator: MovementIntegrator,
    collider: C,
    state: SimSnapshot,
    pending: Vec<SimEvent>,
}

impl Simulation<FlatGround> {
    /// World on the configured flat arena.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let arena = config.arena;
        Self::with_collider(config, arena)
    }
}

impl<C: CharacterCollider> Simulation<C> {
    /// World with a custom level collider.
    pub fn with_collider(config: SimulationConfig, collider: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let rate = config.rate();
        let integrator = MovementIntegrator::new(config.movement, rate);

        info!(
            tick_rate = rate.hz(),
            weapons = config.loadout.len(),
            spawn_points = config.spawn_points.len(),
            "simulation created"
        );

        Ok(Self {
            config,
            rate,
            integrator,
            collider,
            state: SimSnapshot::default(),
            pending: Vec::new(),
        })
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Add an agent at the next spawn point. Returns its position.
    pub fn spawn(&mut self, id: EntityId) -> Result<FixedVec2, SimulationError> {
        if self.state.agents.contains_key(&id) {
            return Err(SimulationError::DuplicateEntity(id));
        }
        let position = self.next_spawn_position();
        self.spawn_at(id, position)?;
        Ok(position)
    }

    /// Add an agent at a caller-chosen position.
    pub fn spawn_at(&mut self, id: EntityId, position: FixedVec2) -> Result<(), SimulationError> {
        if self.state.agents.contains_key(&id) {
            return Err(SimulationError::DuplicateEntity(id));
        }

        let now = self.state.tick;
        let agent = AgentState::spawn(id, position, now, &self.config);
        self.state.agents.insert(id, agent);

        debug!(entity = %id.short(), tick = now, %position, "agent spawned");
        self.pending
            .push(SimEvent::new(now, id, SimEventData::Spawned { position }));
        Ok(())
    }

    /// Remove an agent.
    pub fn despawn(&mut self, id: EntityId) -> Result<(), SimulationError> {
        self.state
            .agents
            .remove(&id)
            .ok_or(SimulationError::UnknownEntity(id))?;

        let now = self.state.tick;
        debug!(entity = %id.short(), tick = now, "agent despawned");
        self.pending.push(SimEvent::new(now, id, SimEventData::Despawned));
        Ok(())
    }

    /// Bring an agent back at the next spawn point, whether dead or alive.
    pub fn respawn(&mut self, id: EntityId) -> Result<FixedVec2, SimulationError> {
        if !self.state.agents.contains_key(&id) {
            return Err(SimulationError::UnknownEntity(id));
        }
        let position = self.next_spawn_position();
        self.respawn_at(id, position)?;
        Ok(position)
    }

    /// Bring an agent back at a caller-chosen position.
    ///
    /// Every timer stops, movement and aim start over.
    pub fn respawn_at(&mut self, id: EntityId, position: FixedVec2) -> Result<(), SimulationError> {
        let now = self.state.tick;
        self.reset_agent(id, position, now)?;
        self.pending
            .push(SimEvent::new(now, id, SimEventData::Respawned { position }));
        Ok(())
    }

    /// Kill an agent. Returns false if it was already dead or is protected.
    pub fn kill(&mut self, id: EntityId, killer: Option<EntityId>) -> Result<bool, SimulationError> {
        let now = self.state.tick;
        let delay = self.config.agent.respawn_delay;
        let rate = self.rate;

        let agent = self
            .state
            .agents
            .get_mut(&id)
            .ok_or(SimulationError::UnknownEntity(id))?;

        if !agent.alive || agent.is_protected(now) {
            return Ok(false);
        }

        agent.alive = false;
        agent.aim.locked = false;
        agent.movement.set_time_scale(FIXED_ONE);
        agent.input.block();
        agent.respawn = TickTimer::from_seconds(now, delay, rate);

        debug!(entity = %id.short(), tick = now, "agent killed");
        self.pending
            .push(SimEvent::new(now, id, SimEventData::Killed { killer }));
        Ok(true)
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Run one simulation tick.
    ///
    /// Agents without a sample repeat their last known one. Inputs for
    /// unknown ids are ignored.
    pub fn tick(&mut self, inputs: &BTreeMap<EntityId, InputSample>) -> TickResult {
        self.state.tick += 1;
        let tick = self.state.tick;
        let mut events = std::mem::take(&mut self.pending);

        self.respawn_due(tick, &mut events);

        let ctx = TickContext {
            tick,
            rate: self.rate,
            agent: &self.config.agent,
            integrator: &self.integrator,
            collider: &self.collider,
        };
        for agent in self.state.agents.values_mut() {
            tick_agent(agent, inputs.get(&agent.id).copied(), &ctx, &mut events);
        }

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(tick, agents = self.state.agents.len(), events = events.len(), "tick");

        TickResult { tick, events }
    }

    fn respawn_due(&mut self, now: Tick, events: &mut Vec<SimEvent>) {
        let due: Vec<EntityId> = self
            .state
            .agents
            .values()
            .filter(|agent| !agent.alive && agent.respawn.is_expired(now))
            .map(|agent| agent.id)
            .collect();

        for id in due {
            let position = self.next_spawn_position();
            if self.reset_agent(id, position, now).is_ok() {
                events.push(SimEvent::new(now, id, SimEventData::Respawned { position }));
            }
        }
    }

    fn reset_agent(&mut self, id: EntityId, position: FixedVec2, now: Tick) -> Result<(), SimulationError> {
        let agent = self
            .state
            .agents
            .get_mut(&id)
            .ok_or(SimulationError::UnknownEntity(id))?;
        agent.reset(position, now, &self.config);

        debug!(entity = %id.short(), tick = now, %position, "agent respawned");
        Ok(())
    }

    fn next_spawn_position(&mut self) -> FixedVec2 {
        let points = &self.config.spawn_points;
        let index = self.state.next_spawn_point as usize % points.len().max(1);
        self.state.next_spawn_point = self.state.next_spawn_point.wrapping_add(1);
        points.get(index).map_or(FixedVec2::ZERO, |point| point.position())
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Current replicated state.
    pub fn snapshot(&self) -> &SimSnapshot {
        &self.state
    }

    /// Replace the state. Queued lifecycle events are dropped.
    pub fn restore(&mut self, snapshot: SimSnapshot) {
        self.state = snapshot;
        self.pending.clear();
    }

    /// Replace the state from [`SimSnapshot::to_bytes`] output.
    pub fn restore_bytes(&mut self, bytes: &[u8]) -> Result<(), SimulationError> {
        let snapshot = SimSnapshot::from_bytes(bytes)?;
        self.restore(snapshot);
        Ok(())
    }

    /// Restore `snapshot` and re-run ticks up to and including `to_tick`,
    /// feeding inputs from `timeline`. Returns the regenerated events.
    pub fn resimulate(
        &mut self,
        snapshot: SimSnapshot,
        timeline: &InputTimeline,
        to_tick: Tick,
    ) -> Result<Vec<SimEvent>, SimulationError> {
        let mut events = Vec::new();
        self.resimulate_with(snapshot, timeline, to_tick, |_, result| {
            events.extend(result.events);
        })?;
        Ok(events)
    }

    /// [`Simulation::resimulate`], calling `observe` after every tick.
    pub fn resimulate_with<F>(
        &mut self,
        snapshot: SimSnapshot,
        timeline: &InputTimeline,
        to_tick: Tick,
        mut observe: F,
    ) -> Result<(), SimulationError>
    where
        F: FnMut(&Self, TickResult),
    {
        if snapshot.tick > to_tick {
            return Err(SimulationError::SnapshotInFuture {
                snapshot: snapshot.tick,
                target: to_tick,
            });
        }

        let from = snapshot.tick;
        self.restore(snapshot);
        while self.state.tick < to_tick {
            let inputs = timeline.inputs_for(self.state.tick + 1);
            let result = self.tick(&inputs);
            observe(self, result);
        }

        debug!(from, to = to_tick, "resimulated");
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Hash of the current state.
    pub fn compute_hash(&self) -> StateHash {
        self.state.compute_hash()
    }

    /// Last simulated tick.
    pub fn tick_count(&self) -> Tick {
        self.state.tick
    }

    /// Get an agent by id.
    pub fn agent(&self, id: &EntityId) -> Option<&AgentState> {
        self.state.agent(id)
    }

    /// Active configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Tick rate.
    pub fn rate(&self) -> TickRate {
        self.rate
    }

    /// Level collider.
    pub fn collider(&self) -> &C {
        &self.collider
    }
}
