//! Simulation State Definitions
//!
//! Everything that must be identical on every peer after a tick lives here.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::config::SimulationConfig;
use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::core::time::Tick;
use crate::core::vec2::FixedVec2;
use crate::game::edge::FixedInput;
use crate::game::movement::MovementState;
use crate::game::timer::TickTimer;
use crate::game::weapon::{Loadout, Weapon};

// =============================================================================
// ENTITY ID
// =============================================================================

/// Unique entity identifier (UUID as bytes).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub [u8; 16]);

impl EntityId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Fresh random id. Only for allocating ids outside the simulation.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// First four bytes as hex, for logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_bytes(self.0))
    }
}

// =============================================================================
// AGENT STATE
// =============================================================================

/// Aim lock and last aim direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AimState {
    /// Last non-zero input direction
    pub last_pointed: FixedVec2,
    /// Aiming (primary fire held, time slowed)
    pub locked: bool,
}

impl Default for AimState {
    fn default() -> Self {
        Self {
            last_pointed: FixedVec2::LEFT,
            locked: false,
        }
    }
}

/// State of a single agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// Unique id
    pub id: EntityId,

    /// Is the agent alive?
    pub alive: bool,

    /// Fixed-tick input edges and last known sample
    pub input: FixedInput,

    /// Character physics
    pub movement: MovementState,

    /// Aim
    pub aim: AimState,

    /// Weapons
    pub loadout: Loadout,

    /// Runs while dead; respawn on expiry
    pub respawn: TickTimer,

    /// Runs after (re)spawn; no deaths while running
    pub protection: TickTimer,
}

impl AgentState {
    /// Fresh agent at `position`, spawned on tick `now`.
    pub fn spawn(id: EntityId, position: FixedVec2, now: Tick, config: &SimulationConfig) -> Self {
        let rate = config.rate();
        let mut loadout = Loadout::new(config.switch_timing());
        for weapon in &config.loadout {
            loadout.add(Weapon::from_config(weapon, rate));
        }
        loadout.equip_first();

        Self {
            id,
            alive: true,
            input: FixedInput::default(),
            movement: MovementState::at(position),
            aim: AimState::default(),
            loadout,
            respawn: TickTimer::NONE,
            protection: TickTimer::from_seconds(now, config.agent.spawn_protection, rate),
        }
    }

    /// Bring back to spawn state at `position`.
    ///
    /// Every ability timer stops, movement and aim start over.
    pub fn reset(&mut self, position: FixedVec2, now: Tick, config: &SimulationConfig) {
        self.alive = true;
        self.input.block();
        self.movement = MovementState::at(position);
        self.aim = AimState::default();
        self.loadout.reset();
        self.respawn = TickTimer::NONE;
        self.protection = TickTimer::from_seconds(now, config.agent.spawn_protection, config.rate());
    }

    /// Is the agent immune at `now`?
    pub fn is_protected(&self, now: Tick) -> bool {
        self.protection.is_running(now)
    }

    /// Hash this agent's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_uuid(&self.id.0);
        hasher.update_bool(self.alive);
        self.input.current().hash_into(hasher);
        self.input.last_known().hash_into(hasher);
        self.movement.hash_into(hasher);
        hasher.update_vec2(self.aim.last_pointed);
        hasher.update_bool(self.aim.locked);
        self.loadout.hash_into(hasher);
        hasher.update_opt_u32(self.respawn.expiry());
        hasher.update_opt_u32(self.protection.expiry());
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Complete replicated state.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimSnapshot {
    /// Last simulated tick
    pub tick: Tick,

    /// All agents
    pub agents: BTreeMap<EntityId, AgentState>,

    /// Round-robin spawn cursor
    pub next_spawn_point: u32,
}

impl SimSnapshot {
    /// Get an agent by id.
    pub fn agent(&self, id: &EntityId) -> Option<&AgentState> {
        self.agents.get(id)
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, |hasher| {
            hasher.update_u32(self.next_spawn_point);
            // Hash all agents in sorted order (BTreeMap guarantees this)
            for agent in self.agents.values() {
                agent.hash_into(hasher);
            }
        })
    }

    /// Encode for the replication layer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decode a snapshot produced by [`SimSnapshot::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;
    use crate::game::input::{Button, InputSample};

    fn snapshot_with(ids: &[EntityId]) -> SimSnapshot {
        let config = SimulationConfig::default();
        let mut snapshot = SimSnapshot::default();
        for (i, id) in ids.iter().enumerate() {
            let position = FixedVec2::new(to_fixed(i as f64), 0);
            snapshot.agents.insert(*id, AgentState::spawn(*id, position, 0, &config));
        }
        snapshot
    }

    #[test]
    fn test_entity_id_ordering() {
        let id1 = EntityId::new([0; 16]);
        let id2 = EntityId::new([1; 16]);
        let id3 = EntityId::new([0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

        assert!(id1 < id2);
        assert!(id1 < id3);
        assert!(id3 < id2);
    }

    #[test]
    fn test_entity_id_uuid_round_trip() {
        let id = EntityId::random();
        let parsed = EntityId::from_uuid_str(&id.to_uuid_string());
        assert_eq!(parsed, Some(id));
        assert_eq!(id.to_string(), id.to_uuid_string());
        assert_eq!(EntityId::from_uuid_str("nope"), None);
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn test_spawned_agent() {
        let config = SimulationConfig::default();
        let agent = AgentState::spawn(EntityId::new([1; 16]), FixedVec2::ZERO, 10, &config);
        assert!(agent.alive);
        assert_eq!(agent.loadout.weapons().count(), 2);
        assert_eq!(agent.loadout.switch_state().current_slot(), 0);
        assert_eq!(agent.loadout.current().and_then(Weapon::ammo), Some(3));
        assert!(agent.is_protected(10));
        assert!(agent.is_protected(189));
        assert!(!agent.is_protected(190));
    }

    #[test]
    fn test_reset_clears_state() {
        let config = SimulationConfig::default();
        let id = EntityId::new([1; 16]);
        let fresh = AgentState::spawn(id, FixedVec2::ZERO, 0, &config);

        let mut agent = fresh.clone();
        agent.alive = false;
        agent.aim.locked = true;
        agent.input.before_tick(Some(InputSample::IDLE.with_button(Button::Jump)));
        agent.movement.add_forced_velocity(FixedVec2::new(to_fixed(3.0), 0));
        agent.respawn = TickTimer::from_ticks(0, 10);

        agent.reset(FixedVec2::ZERO, 0, &config);
        assert!(agent.alive);
        assert_eq!(agent.input, fresh.input);
        assert_eq!(agent.movement, fresh.movement);
        assert_eq!(agent.aim, fresh.aim);
        assert_eq!(agent.respawn, fresh.respawn);
        assert_eq!(agent.protection, fresh.protection);
        assert_eq!(agent.loadout.switch_state(), fresh.loadout.switch_state());
        assert!(agent.loadout.weapons().eq(fresh.loadout.weapons()));

        let hash = |a: &AgentState| {
            let mut hasher = StateHasher::new(b"test");
            a.hash_into(&mut hasher);
            hasher.finalize()
        };
        assert_eq!(hash(&agent), hash(&fresh));
    }

    #[test]
    fn test_snapshot_hash_determinism() {
        let ids = [EntityId::new([5; 16]), EntityId::new([1; 16])];
        let a = snapshot_with(&ids);
        let b = snapshot_with(&ids);
        assert_eq!(a.compute_hash(), b.compute_hash());

        let mut c = snapshot_with(&ids);
        if let Some(agent) = c.agents.get_mut(&ids[0]) {
            agent.movement.position.x += 1;
        }
        assert_ne!(a.compute_hash(), c.compute_hash());
    }

    #[test]
    fn test_snapshot_bytes_round_trip() {
        let ids = [EntityId::new([7; 16]), EntityId::new([8; 16])];
        let mut snapshot = snapshot_with(&ids);
        if let Some(agent) = snapshot.agents.get_mut(&ids[0]) {
            agent.loadout.request_switch(0, 1, true);
            assert!(agent.loadout.version() > 0);
        }
        let bytes = snapshot.to_bytes().unwrap();
        let back = SimSnapshot::from_bytes(&bytes).unwrap();
        assert_eq!(back.compute_hash(), snapshot.compute_hash());
        assert_eq!(back, snapshot);
        assert_eq!(back.agents[&ids[0]].loadout.version(), snapshot.agents[&ids[0]].loadout.version());
    }

    #[test]
    fn test_btreemap_iteration_order() {
        let ids = [
            EntityId::new([5; 16]),
            EntityId::new([1; 16]),
            EntityId::new([9; 16]),
            EntityId::new([3; 16]),
        ];
        let snapshot = snapshot_with(&ids);

        let iterated: Vec<_> = snapshot.agents.keys().collect();
        let mut sorted = iterated.clone();
        sorted.sort();

        assert_eq!(iterated, sorted, "BTreeMap should iterate in sorted order");
    }
}
