//! Simulation Events
//!
//! Output of a tick for presentation and logging. Events are not part of the
//! snapshot; a resimulated tick produces them again and callers that already
//! showed them may drop the repeats.

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::time::Tick;
use crate::core::vec2::FixedVec2;
use crate::game::state::EntityId;

/// Event payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEventData {
    /// A shot left the equipped weapon
    WeaponFired {
        /// Weapon slot
        slot: u8,
        /// Charge fraction, 0 for uncharged weapons
        charge_value: Fixed,
    },

    /// Rounds in a magazine changed
    AmmoChanged {
        /// Weapon slot
        slot: u8,
        /// New round count
        ammo: u32,
    },

    /// A weapon switch began (or was redirected)
    SwitchStarted {
        /// Equipped slot
        from: u8,
        /// Pending slot
        to: u8,
    },

    /// The equipped weapon changed
    WeaponSwitched {
        /// Newly equipped slot
        slot: u8,
    },

    /// Directional jump
    Jumped {
        /// Input direction at the jump
        direction: FixedVec2,
    },

    /// Aim released and recoil applied
    RecoilLaunched {
        /// Impulse added to forced velocity
        impulse: FixedVec2,
    },

    /// Entity joined
    Spawned {
        /// Spawn position
        position: FixedVec2,
    },

    /// Entity came back after death
    Respawned {
        /// Spawn position
        position: FixedVec2,
    },

    /// Entity left
    Despawned,

    /// Entity died
    Killed {
        /// Who caused it, if anyone
        killer: Option<EntityId>,
    },
}

/// An event with timing and subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Tick when the event occurred
    pub tick: Tick,

    /// Entity the event is about
    pub entity: EntityId,

    /// Event data
    pub data: SimEventData,
}

impl SimEvent {
    /// Create a new event.
    pub fn new(tick: Tick, entity: EntityId, data: SimEventData) -> Self {
        Self { tick, entity, data }
    }

    /// Create weapon fired event.
    pub fn weapon_fired(tick: Tick, entity: EntityId, slot: u8, charge_value: Fixed) -> Self {
        Self::new(tick, entity, SimEventData::WeaponFired { slot, charge_value })
    }

    /// Create ammo changed event.
    pub fn ammo_changed(tick: Tick, entity: EntityId, slot: u8, ammo: u32) -> Self {
        Self::new(tick, entity, SimEventData::AmmoChanged { slot, ammo })
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self.data {
            SimEventData::WeaponFired { .. } => "weapon_fired",
            SimEventData::AmmoChanged { .. } => "ammo_changed",
            SimEventData::SwitchStarted { .. } => "switch_started",
            SimEventData::WeaponSwitched { .. } => "weapon_switched",
            SimEventData::Jumped { .. } => "jumped",
            SimEventData::RecoilLaunched { .. } => "recoil_launched",
            SimEventData::Spawned { .. } => "spawned",
            SimEventData::Respawned { .. } => "respawned",
            SimEventData::Despawned => "despawned",
            SimEventData::Killed { .. } => "killed",
        }
    }
}
