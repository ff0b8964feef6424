//! Character Movement
//!
//! Side-view character physics in fixed point. Three velocity sources are
//! combined each tick:
//!
//! - `desired_velocity_x`: what the player steers (or what a jump set)
//! - `vertical_velocity`: gravity and jumps
//! - `forced_velocity`: external impulses such as weapon recoil, decaying
//!   toward zero every tick
//!
//! Collision is delegated to a [`CharacterCollider`], which resolves the
//! move and reports whether the character ended up on the ground.

use serde::{Serialize, Deserialize};

use crate::config::MovementConfig;
use crate::core::fixed::{
    fixed_approach_zero, fixed_clamp, fixed_mul, fixed_sqrt, Fixed, COS_135, COS_45, FIXED_ONE,
};
use crate::core::hash::StateHasher;
use crate::core::time::TickRate;
use crate::core::vec2::FixedVec2;

// =============================================================================
// COLLIDER
// =============================================================================

/// Outcome of a collider move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveResult {
    /// Resolved position
    pub position: FixedVec2,
    /// Touching ground after the move
    pub grounded: bool,
}

/// Resolves a displacement against level geometry.
///
/// Implementations must be pure: the same position and delta always resolve
/// the same way, on every peer.
pub trait CharacterCollider {
    /// Move from `position` by `delta`.
    fn move_by(&self, position: FixedVec2, delta: FixedVec2) -> MoveResult;
}

/// Flat floor between two side walls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatGround {
    /// Height of the floor
    #[serde(with = "crate::core::fixed::decimal")]
    pub floor: Fixed,
    /// Walls at `-half_width` and `+half_width`
    #[serde(with = "crate::core::fixed::decimal")]
    pub half_width: Fixed,
}

impl Default for FlatGround {
    fn default() -> Self {
        Self {
            floor: 0,
            half_width: 50 * FIXED_ONE,
        }
    }
}

impl CharacterCollider for FlatGround {
    fn move_by(&self, position: FixedVec2, delta: FixedVec2) -> MoveResult {
        let mut target = position + delta;
        target.x = fixed_clamp(target.x, -self.half_width, self.half_width);

        let grounded = target.y <= self.floor;
        if grounded {
            target.y = self.floor;
        }

        MoveResult {
            position: target,
            grounded,
        }
    }
}

// =============================================================================
// MOVEMENT STATE
// =============================================================================

/// Replicated movement state of one character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovementState {
    /// Position in world units
    pub position: FixedVec2,
    /// Measured velocity of the last move
    pub velocity: FixedVec2,
    /// Gravity/jump velocity
    pub vertical_velocity: Fixed,
    /// Decaying external velocity
    pub forced_velocity: FixedVec2,
    /// Steered horizontal velocity
    pub desired_velocity_x: Fixed,
    /// Standing on ground
    pub grounded: bool,
    /// Local time multiplier, `FIXED_ONE` is normal speed
    pub time_scale: Fixed,
}

impl MovementState {
    /// At rest at `position`.
    pub fn at(position: FixedVec2) -> Self {
        Self {
            position,
            velocity: FixedVec2::ZERO,
            vertical_velocity: 0,
            forced_velocity: FixedVec2::ZERO,
            desired_velocity_x: 0,
            grounded: false,
            time_scale: FIXED_ONE,
        }
    }

    /// Add an external impulse.
    #[inline]
    pub fn add_forced_velocity(&mut self, velocity: FixedVec2) {
        self.forced_velocity = self.forced_velocity + velocity;
    }

    /// Set the steered horizontal velocity.
    #[inline]
    pub fn set_desired_velocity_x(&mut self, velocity: Fixed) {
        self.desired_velocity_x = velocity;
    }

    /// Change the local time multiplier.
    #[inline]
    pub fn set_time_scale(&mut self, scale: Fixed) {
        self.time_scale = scale;
    }

    /// Hash replicated state.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_vec2(self.position);
        hasher.update_vec2(self.velocity);
        hasher.update_fixed(self.vertical_velocity);
        hasher.update_vec2(self.forced_velocity);
        hasher.update_fixed(self.desired_velocity_x);
        hasher.update_bool(self.grounded);
        hasher.update_fixed(self.time_scale);
    }
}

impl Default for MovementState {
    fn default() -> Self {
        Self::at(FixedVec2::ZERO)
    }
}

// =============================================================================
// INTEGRATOR
// =============================================================================

/// Advances [`MovementState`] by whole ticks.
#[derive(Clone, Copy, Debug)]
pub struct MovementIntegrator {
    config: MovementConfig,
    rate: TickRate,
}

impl MovementIntegrator {
    /// Integrator for `config` at `rate`.
    pub fn new(config: MovementConfig, rate: TickRate) -> Self {
        Self { config, rate }
    }

    /// Tuning in use.
    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Scaled tick length of `state`.
    #[inline]
    pub fn scaled_delta(&self, state: &MovementState) -> Fixed {
        fixed_mul(self.rate.delta(), state.time_scale)
    }

    /// Run one tick.
    pub fn step<C: CharacterCollider + ?Sized>(&self, state: &mut MovementState, collider: &C) {
        let cfg = &self.config;
        let dt = self.scaled_delta(state);
        let mut move_velocity = FixedVec2::ZERO;

        if state.grounded {
            state.desired_velocity_x = fixed_approach_zero(
                state.desired_velocity_x,
                fixed_mul(cfg.grounded_decay, dt),
            );

            // Keep a small downward velocity so the collider keeps reporting ground.
            if state.vertical_velocity <= 0 {
                state.vertical_velocity = state.vertical_velocity.max(cfg.rest_velocity_floor);
                move_velocity.y = state.vertical_velocity;
            }
            if state.forced_velocity.y > 0 {
                move_velocity.y += state.forced_velocity.y;
            }
            if state.vertical_velocity > 0 {
                move_velocity.y += state.vertical_velocity;
            }
        } else {
            state.vertical_velocity = (state.vertical_velocity + fixed_mul(cfg.gravity, dt))
                .max(cfg.terminal_fall_speed);
            move_velocity.y = state.vertical_velocity + state.forced_velocity.y;
        }

        move_velocity.x = state.desired_velocity_x + state.forced_velocity.x;

        let previous = state.position;
        let result = collider.move_by(previous, move_velocity.scale(dt));
        state.position = result.position;
        state.grounded = result.grounded;
        state.velocity = (state.position - previous).scale_int(self.rate.hz() as i32);

        let decay = if state.grounded {
            cfg.forced_decay_grounded
        } else {
            cfg.forced_decay_airborne
        };
        state.forced_velocity = state.forced_velocity.approach_zero(fixed_mul(decay, dt));
    }

    /// Straight jump. Returns whether it happened.
    pub fn jump(&self, state: &mut MovementState, ignore_grounded: bool, impulse: Option<Fixed>) -> bool {
        if !state.grounded && !ignore_grounded {
            return false;
        }
        state.vertical_velocity = impulse.unwrap_or(self.config.jump_impulse_y);
        true
    }

    /// Jump along `direction`, limited to the upper 90 degree cone.
    ///
    /// Only the x component of `direction` is used; y follows from the unit
    /// circle. No ground check is made.
    pub fn jump_directional(&self, state: &mut MovementState, direction: FixedVec2) {
        let x = fixed_clamp(direction.x, COS_135, COS_45);
        let y = fixed_sqrt(FIXED_ONE - fixed_mul(x, x));

        state.desired_velocity_x = fixed_mul(x, self.config.jump_impulse_x);
        state.vertical_velocity = fixed_mul(y, self.config.jump_impulse_y);
    }
}

// =============================================================================
// TESTS
// =============================================================================
