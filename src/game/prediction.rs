//! Client-Side Prediction
//!
//! ## Flow
//!
//! ```text
//! device frame ──► LocalPlayer::frame ──► InputAccumulator
//!                                    └──► RenderInput (per-frame edges)
//!
//! tick due ──► LocalPlayer::poll_tick_input ──► InputTimeline::record
//!                                           └──► Simulation::tick
//!                                                    │
//!                               Reconciler::record ◄─┘
//!
//! authoritative snapshot ──► Reconciler::on_authoritative
//!     hashes equal    ──► nothing to do
//!     hashes differ   ──► restore + resimulate to the predicted tick
//! ```
//!
//! Nothing here is part of the replicated state.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::core::hash::StateHash;
use crate::core::time::Tick;
use crate::core::vec2::FixedVec2;
use crate::game::accumulator::{InputAccumulator, RawInput};
use crate::game::edge::{EdgeState, RenderInput};
use crate::game::input::{InputHistory, InputSample};
use crate::game::movement::CharacterCollider;
use crate::game::state::{EntityId, SimSnapshot};
use crate::game::world::{Simulation, SimulationError};

// =============================================================================
// INPUT TIMELINE
// =============================================================================

/// Recorded fixed samples of every entity.
#[derive(Clone, Debug, Default)]
pub struct InputTimeline {
    histories: BTreeMap<EntityId, InputHistory>,
}

impl InputTimeline {
    /// Empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entity`'s sample for `tick`. Returns false for stale ticks.
    pub fn record(&mut self, entity: EntityId, tick: Tick, sample: InputSample) -> bool {
        self.histories
            .entry(entity)
            .or_insert_with(|| InputHistory::new(entity))
            .record(tick, sample)
    }

    /// Samples to feed into tick `tick`. Entities without a recording for
    /// that tick are left out and fall back to their last known sample.
    pub fn inputs_for(&self, tick: Tick) -> BTreeMap<EntityId, InputSample> {
        self.histories
            .iter()
            .filter_map(|(id, history)| history.sample_at(tick).map(|sample| (*id, sample)))
            .collect()
    }

    /// Forget samples older than `tick` for every entity.
    pub fn discard_before(&mut self, tick: Tick) {
        for history in self.histories.values_mut() {
            history.discard_before(tick);
        }
    }

    /// Recording of one entity.
    pub fn history(&self, entity: &EntityId) -> Option<&InputHistory> {
        self.histories.get(entity)
    }

    /// Drop an entity's recording.
    pub fn remove(&mut self, entity: &EntityId) -> Option<InputHistory> {
        self.histories.remove(entity)
    }
}

// =============================================================================
// LOCAL PLAYER
// =============================================================================

/// Input side of the locally controlled agent.
#[derive(Clone, Debug)]
pub struct LocalPlayer {
    entity: EntityId,
    accumulator: InputAccumulator,
    render: RenderInput,
}

impl LocalPlayer {
    /// Input owner for `entity`.
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            accumulator: InputAccumulator::new(),
            render: RenderInput::default(),
        }
    }

    /// Controlled entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Feed one displayed frame. Returns the frame's own sample.
    pub fn frame(&mut self, raw: &RawInput, dt: f32) -> InputSample {
        let sample = self.accumulator.push_frame(raw, dt);
        self.render.begin_frame(sample);
        sample
    }

    /// A displayed frame in which input is blocked (menu open, window
    /// unfocused).
    pub fn frame_blocked(&mut self) {
        self.accumulator.skip_frame();
        self.render.block();
    }

    /// Sample for the tick about to run.
    pub fn poll_tick_input(&mut self) -> InputSample {
        self.accumulator.consume()
    }

    /// Measure the next render edges from the sample the tick just used.
    pub fn after_tick<C: CharacterCollider>(&mut self, sim: &Simulation<C>) {
        if let Some(agent) = sim.agent(&self.entity) {
            self.render.sync_to_tick(&agent.input);
        }
    }

    /// Per-frame edges, for presentation only.
    pub fn render_edges(&self) -> &EdgeState {
        self.render.edges()
    }

    /// Aim to draw this frame: the live stick direction, or the agent's last
    /// aim while the stick is centred.
    pub fn render_aim<C: CharacterCollider>(&self, sim: &Simulation<C>) -> FixedVec2 {
        let direction = self.render.edges().direction();
        if !direction.is_zero() {
            return direction;
        }
        sim.agent(&self.entity)
            .map_or(FixedVec2::LEFT, |agent| agent.aim.last_pointed)
    }
}

// =============================================================================
// RECONCILER
// =============================================================================

/// Outcome of a mismatching authoritative snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Correction {
    /// Tick of the authoritative snapshot
    pub tick: Tick,
    /// Ticks re-run after restoring it
    pub resimulated: u32,
    /// What we had predicted for that tick, if anything
    pub predicted_hash: Option<StateHash>,
    /// What the authority says
    pub authoritative_hash: StateHash,
}

/// Predicted state hash per tick, checked against the authority.
#[derive(Clone, Debug, Default)]
pub struct Reconciler {
    predicted: BTreeMap<Tick, StateHash>,
}

impl Reconciler {
    /// No predictions yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the state `sim` reached for its current tick.
    pub fn record<C: CharacterCollider>(&mut self, sim: &Simulation<C>) {
        self.predicted.insert(sim.tick_count(), sim.compute_hash());
    }

    /// Predicted hash for `tick`.
    pub fn predicted(&self, tick: Tick) -> Option<StateHash> {
        self.predicted.get(&tick).copied()
    }

    /// Number of unconfirmed predictions.
    pub fn pending(&self) -> usize {
        self.predicted.len()
    }

    /// Compare an authoritative snapshot with the prediction for its tick.
    ///
    /// On a mismatch `sim` is restored to the snapshot and run forward to the
    /// tick it had predicted up to, re-recording every hash on the way.
    /// Predictions at or before the snapshot tick are dropped either way.
    pub fn on_authoritative<C: CharacterCollider>(
        &mut self,
        sim: &mut Simulation<C>,
        authoritative: SimSnapshot,
        timeline: &InputTimeline,
    ) -> Result<Option<Correction>, SimulationError> {
        let tick = authoritative.tick;
        let authoritative_hash = authoritative.compute_hash();
        let predicted_hash = self.predicted(tick);

        self.predicted = self.predicted.split_off(&(tick + 1));

        if predicted_hash == Some(authoritative_hash) {
            debug!(tick, "prediction confirmed");
            return Ok(None);
        }

        let target = sim.tick_count().max(tick);
        warn!(
            tick,
            predicted = %predicted_hash.map_or_else(|| "none".to_string(), |h| hex::encode(&h[..8])),
            authoritative = %hex::encode(&authoritative_hash[..8]),
            resimulate_to = target,
            "misprediction"
        );

        let predicted = &mut self.predicted;
        sim.resimulate_with(authoritative, timeline, target, |sim, _| {
            predicted.insert(sim.tick_count(), sim.compute_hash());
        })?;

        Ok(Some(Correction {
            tick,
            resimulated: target - tick,
            predicted_hash,
            authoritative_hash,
        }))
    }
}
