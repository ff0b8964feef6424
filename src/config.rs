//! Simulation Configuration
//!
//! Tuning lives in plain structs with `Default` impls. Configuration files are
//! JSON; fixed-point fields are written as decimal numbers and converted once
//! on load, so every peer that loads the same file runs the same constants.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::fixed::{to_fixed, Fixed, FIXED_ONE};
use crate::core::time::TickRate;
use crate::core::vec2::FixedVec2;
use crate::game::input::Button;
use crate::game::movement::FlatGround;
use crate::game::weapon::SwitchTiming;
use crate::{DEFAULT_TICK_RATE, MAX_WEAPON_SLOTS};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed JSON.
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    /// File could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Tick rate of zero.
    #[error("tick rate must be positive")]
    ZeroTickRate,

    /// Weapon slot beyond the loadout.
    #[error("weapon slot {0} out of range (max {max})", max = MAX_WEAPON_SLOTS)]
    SlotOutOfRange(u8),

    /// Two weapons in one slot.
    #[error("weapon slot {0} configured twice")]
    DuplicateSlot(u8),

    /// A value outside its domain.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

// =============================================================================
// MOVEMENT
// =============================================================================

/// Character physics tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Vertical acceleration (units/s²)
    #[serde(with = "crate::core::fixed::decimal")]
    pub gravity: Fixed,
    /// Horizontal speed of a directional jump at full tilt
    #[serde(with = "crate::core::fixed::decimal")]
    pub jump_impulse_x: Fixed,
    /// Vertical speed of a jump
    #[serde(with = "crate::core::fixed::decimal")]
    pub jump_impulse_y: Fixed,
    /// Decay of steered velocity while grounded (units/s²)
    #[serde(with = "crate::core::fixed::decimal")]
    pub grounded_decay: Fixed,
    /// Decay of forced velocity while grounded
    #[serde(with = "crate::core::fixed::decimal")]
    pub forced_decay_grounded: Fixed,
    /// Decay of forced velocity while airborne
    #[serde(with = "crate::core::fixed::decimal")]
    pub forced_decay_airborne: Fixed,
    /// Fastest fall from gravity alone (negative)
    #[serde(with = "crate::core::fixed::decimal")]
    pub terminal_fall_speed: Fixed,
    /// Downward velocity kept while grounded (negative)
    #[serde(with = "crate::core::fixed::decimal")]
    pub rest_velocity_floor: Fixed,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            gravity: to_fixed(-20.0),
            jump_impulse_x: to_fixed(5.0),
            jump_impulse_y: to_fixed(7.0),
            grounded_decay: to_fixed(5.0),
            forced_decay_grounded: to_fixed(5.0),
            forced_decay_airborne: to_fixed(5.0),
            terminal_fall_speed: to_fixed(-12.0),
            rest_velocity_floor: to_fixed(-0.1),
        }
    }
}

impl MovementConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.grounded_decay < 0 || self.forced_decay_grounded < 0 || self.forced_decay_airborne < 0 {
            return Err(invalid("movement decay", "must not be negative"));
        }
        if self.terminal_fall_speed > 0 {
            return Err(invalid("movement.terminal_fall_speed", "must not be positive"));
        }
        if self.rest_velocity_floor > 0 {
            return Err(invalid("movement.rest_velocity_floor", "must not be positive"));
        }
        Ok(())
    }
}

// =============================================================================
// AGENT
// =============================================================================

/// Player agent tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Steered speed at full stick
    #[serde(with = "crate::core::fixed::decimal")]
    pub move_speed: Fixed,
    /// Steering works while airborne
    pub air_control: bool,
    /// Time scale while aiming
    #[serde(with = "crate::core::fixed::decimal")]
    pub slow_time_scale: Fixed,
    /// Recoil speed along the aim direction
    #[serde(with = "crate::core::fixed::decimal")]
    pub max_weapon_impulse: Fixed,
    /// Extra recoil perpendicular to the aim, tilted upward
    #[serde(with = "crate::core::fixed::decimal")]
    pub additional_up_impulse: Fixed,
    /// Seconds between death and respawn
    #[serde(with = "crate::core::fixed::decimal")]
    pub respawn_delay: Fixed,
    /// Seconds of immunity after (re)spawning
    #[serde(with = "crate::core::fixed::decimal")]
    pub spawn_protection: Fixed,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            move_speed: to_fixed(5.0),
            air_control: true,
            slow_time_scale: to_fixed(0.1),
            max_weapon_impulse: to_fixed(30.0),
            additional_up_impulse: to_fixed(1.0),
            respawn_delay: to_fixed(3.0),
            spawn_protection: to_fixed(3.0),
        }
    }
}

impl AgentConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.slow_time_scale <= 0 || self.slow_time_scale > FIXED_ONE {
            return Err(invalid("agent.slow_time_scale", "must be in (0, 1]"));
        }
        if self.respawn_delay < 0 || self.spawn_protection < 0 {
            return Err(invalid("agent timers", "must not be negative"));
        }
        Ok(())
    }
}

// =============================================================================
// WEAPONS
// =============================================================================

/// Weapon switch timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    /// Full switch length in seconds
    #[serde(with = "crate::core::fixed::decimal")]
    pub duration: Fixed,
    /// Seconds into the switch at which the weapon changes
    #[serde(with = "crate::core::fixed::decimal")]
    pub swap: Fixed,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            duration: to_fixed(1.0),
            swap: to_fixed(0.5),
        }
    }
}

/// How a weapon's trigger reacts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Fire on press
    Press,
    /// Fire while held
    Held,
    /// Charge while held, fire on release
    Charge,
}

/// Auto-reload magazine settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagazineConfig {
    /// Capacity
    pub size: u32,
    /// Seconds to reload one round
    #[serde(with = "crate::core::fixed::decimal")]
    pub reload_seconds: Fixed,
    /// Start with a full magazine
    pub spawn_full: bool,
}

impl Default for MagazineConfig {
    fn default() -> Self {
        Self {
            size: 3,
            reload_seconds: to_fixed(1.5),
            spawn_full: true,
        }
    }
}

/// One weapon of the spawn loadout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponConfig {
    /// Loadout slot
    pub slot: u8,
    /// Rounds per minute
    pub cadence: u32,
    /// Button that fires
    pub fire_button: Button,
    /// Trigger behaviour
    pub mode: TriggerMode,
    /// Charge cap in seconds (charge mode only)
    #[serde(with = "crate::core::fixed::decimal", default = "default_max_charge")]
    pub max_charge_seconds: Fixed,
    /// Magazine, if the weapon uses ammunition
    #[serde(default)]
    pub magazine: Option<MagazineConfig>,
}

fn default_max_charge() -> Fixed {
    FIXED_ONE
}

impl WeaponConfig {
    /// Charge launcher: hold to charge, release to fire.
    pub fn charge_launcher(slot: u8) -> Self {
        Self {
            slot,
            cadence: 600,
            fire_button: Button::Shoot1,
            mode: TriggerMode::Charge,
            max_charge_seconds: FIXED_ONE,
            magazine: Some(MagazineConfig::default()),
        }
    }

    /// Semi-automatic sidearm.
    pub fn sidearm(slot: u8) -> Self {
        Self {
            slot,
            cadence: 600,
            fire_button: Button::Shoot1,
            mode: TriggerMode::Press,
            max_charge_seconds: FIXED_ONE,
            magazine: Some(MagazineConfig::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.slot as usize >= MAX_WEAPON_SLOTS {
            return Err(ConfigError::SlotOutOfRange(self.slot));
        }
        if self.cadence == 0 {
            return Err(invalid("weapon.cadence", "must be positive"));
        }
        if self.mode == TriggerMode::Charge && self.max_charge_seconds <= 0 {
            return Err(invalid("weapon.max_charge_seconds", "must be positive"));
        }
        if let Some(magazine) = &self.magazine {
            if magazine.size == 0 {
                return Err(invalid("weapon.magazine.size", "must be positive"));
            }
            if magazine.reload_seconds < 0 {
                return Err(invalid("weapon.magazine.reload_seconds", "must not be negative"));
            }
        }
        Ok(())
    }
}

// =============================================================================
// SIMULATION
// =============================================================================

/// Where agents appear, in round-robin order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// X position
    #[serde(with = "crate::core::fixed::decimal")]
    pub x: Fixed,
    /// Y position
    #[serde(with = "crate::core::fixed::decimal")]
    pub y: Fixed,
}

impl SpawnPoint {
    /// Spawn point at `(x, y)`.
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// As a vector.
    pub fn position(&self) -> FixedVec2 {
        FixedVec2::new(self.x, self.y)
    }
}

/// Everything the tick needs to know up front.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ticks per second
    pub tick_rate: u32,
    /// Character physics
    pub movement: MovementConfig,
    /// Agent tuning
    pub agent: AgentConfig,
    /// Weapon switch timing
    pub switch: SwitchConfig,
    /// Level geometry for the default collider
    pub arena: FlatGround,
    /// Spawn positions
    pub spawn_points: Vec<SpawnPoint>,
    /// Weapons every agent spawns with
    pub loadout: Vec<WeaponConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            movement: MovementConfig::default(),
            agent: AgentConfig::default(),
            switch: SwitchConfig::default(),
            arena: FlatGround::default(),
            spawn_points: vec![
                SpawnPoint::new(to_fixed(-8.0), to_fixed(2.0)),
                SpawnPoint::new(to_fixed(8.0), to_fixed(2.0)),
                SpawnPoint::new(to_fixed(0.0), to_fixed(4.0)),
            ],
            loadout: vec![WeaponConfig::charge_launcher(0), WeaponConfig::sidearm(1)],
        }
    }
}

impl SimulationConfig {
    /// Parse and validate JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Pretty JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every value against its domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        self.movement.validate()?;
        self.agent.validate()?;

        if self.switch.duration < 0 || self.switch.swap < 0 {
            return Err(invalid("switch", "must not be negative"));
        }
        if self.switch.swap > self.switch.duration {
            return Err(invalid("switch.swap", "must not exceed switch.duration"));
        }
        if self.arena.half_width <= 0 {
            return Err(invalid("arena.half_width", "must be positive"));
        }
        if self.spawn_points.is_empty() {
            return Err(invalid("spawn_points", "at least one is required"));
        }

        let mut slots = BTreeSet::new();
        for weapon in &self.loadout {
            weapon.validate()?;
            if !slots.insert(weapon.slot) {
                return Err(ConfigError::DuplicateSlot(weapon.slot));
            }
        }
        Ok(())
    }

    /// Tick rate. Call after [`SimulationConfig::validate`].
    pub fn rate(&self) -> TickRate {
        TickRate::new(self.tick_rate)
    }

    /// Switch timing in ticks.
    pub fn switch_timing(&self) -> SwitchTiming {
        SwitchTiming::from_seconds(self.switch.duration, self.switch.swap, self.rate())
    }
}

// =============================================================================
// TESTS
// =============================================================================
