//! Cadence-limited trigger.

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHasher;
use crate::core::time::TickRate;
use crate::game::input::Button;
use crate::game::timer::TickTimer;
use super::{Ability, AbilityContext, WeaponDesires};

/// Which input state fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FireMode {
    /// Only on the press edge
    Press,
    /// Every ready tick while held
    Held,
}

/// Fires on input, then blocks the weapon for one cadence interval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireTrigger {
    button: Button,
    mode: FireMode,
    cooldown_ticks: u32,
    cooldown: TickTimer,
}

impl FireTrigger {
    /// Trigger firing `cadence` rounds per minute at `rate`.
    ///
    /// # Panics
    /// Panics if `cadence` is zero.
    pub fn new(button: Button, mode: FireMode, cadence: u32, rate: TickRate) -> Self {
        Self {
            button,
            mode,
            cooldown_ticks: rate.cadence_to_ticks(cadence),
            cooldown: TickTimer::NONE,
        }
    }

    /// Ticks between two shots.
    pub fn cooldown_ticks(&self) -> u32 {
        self.cooldown_ticks
    }

    /// Current cooldown timer.
    pub fn cooldown(&self) -> TickTimer {
        self.cooldown
    }
}

impl Ability for FireTrigger {
    fn is_busy(&self, ctx: &AbilityContext<'_>) -> bool {
        !self.cooldown.is_expired_or_not_running(ctx.tick)
    }

    fn process_input(&mut self, ctx: &AbilityContext<'_>, desires: &mut WeaponDesires, weapon_busy: bool) {
        if weapon_busy || self.is_busy(ctx) {
            return;
        }

        let fire = match self.mode {
            FireMode::Press => ctx.input.was_pressed(self.button),
            FireMode::Held => ctx.input.is_set(self.button),
        };
        desires.fire |= fire;
    }

    fn apply_tick(&mut self, ctx: &AbilityContext<'_>, desires: &WeaponDesires) {
        if desires.has_fired() {
            self.cooldown = TickTimer::from_ticks(ctx.tick, self.cooldown_ticks);
        }
    }

    fn reset(&mut self) {
        self.cooldown = TickTimer::NONE;
    }

    fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_opt_u32(self.cooldown.expiry());
    }
}
