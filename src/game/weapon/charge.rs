//! Hold-to-charge trigger.
//!
//! Charge grows by one unit per second of hold, capped at the configured
//! maximum. Releasing with a non-zero charge fires once with the charge as a
//! fraction of the cap.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{fixed_div, Fixed, FIXED_ONE};
use crate::core::hash::StateHasher;
use crate::core::time::TickRate;
use crate::game::input::Button;
use crate::game::timer::TickTimer;
use super::{Ability, AbilityContext, WeaponDesires};

/// Charge trigger with a post-shot cooldown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeTrigger {
    button: Button,
    max_charge: Fixed,
    cooldown_ticks: u32,
    cooldown: TickTimer,
    charge: Fixed,
    version: u32,
}

impl ChargeTrigger {
    /// Charge trigger capped at `max_charge` seconds.
    ///
    /// # Panics
    /// Panics if `max_charge` is not positive or `cadence` is zero.
    pub fn new(button: Button, cadence: u32, max_charge: Fixed, rate: TickRate) -> Self {
        assert!(max_charge > 0, "max charge must be positive: {}", max_charge);
        Self {
            button,
            max_charge,
            cooldown_ticks: rate.cadence_to_ticks(cadence),
            cooldown: TickTimer::NONE,
            charge: 0,
            version: 0,
        }
    }

    /// Accumulated charge in seconds.
    pub fn charge(&self) -> Fixed {
        self.charge
    }

    /// Charge as a fraction of the cap.
    pub fn progress(&self) -> Fixed {
        fixed_div(self.charge, self.max_charge).min(FIXED_ONE)
    }

    /// Bumped whenever the charge level changes.
    pub fn version(&self) -> u32 {
        self.version
    }

    fn set_charge(&mut self, charge: Fixed) {
        if charge != self.charge {
            self.charge = charge;
            self.version = self.version.wrapping_add(1);
        }
    }
}

impl Ability for ChargeTrigger {
    fn is_busy(&self, ctx: &AbilityContext<'_>) -> bool {
        !self.cooldown.is_expired_or_not_running(ctx.tick)
    }

    fn process_input(&mut self, ctx: &AbilityContext<'_>, desires: &mut WeaponDesires, weapon_busy: bool) {
        if weapon_busy || self.is_busy(ctx) {
            return;
        }

        if ctx.input.is_set(self.button) {
            let charged = self.charge.saturating_add(ctx.rate.delta()).min(self.max_charge);
            self.set_charge(charged);
        } else if self.charge > 0 {
            desires.fire = true;
            desires.charge_value = self.progress();
            self.set_charge(0);
        }
    }

    fn apply_tick(&mut self, ctx: &AbilityContext<'_>, desires: &WeaponDesires) {
        if desires.has_fired() {
            self.cooldown = TickTimer::from_ticks(ctx.tick, self.cooldown_ticks);
        }
    }

    fn reset(&mut self) {
        self.cooldown = TickTimer::NONE;
        self.set_charge(0);
    }

    fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_opt_u32(self.cooldown.expiry());
        hasher.update_fixed(self.charge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, to_float};
    use crate::core::time::Tick;
    use crate::game::edge::EdgeState;
    use crate::game::input::InputSample;

    fn step(trigger: &mut ChargeTrigger, tick: Tick, rate: TickRate, held: bool) -> WeaponDesires {
        let sample = if held {
            InputSample::IDLE.with_button(Button::Shoot1)
        } else {
            InputSample::IDLE
        };
        let edges = EdgeState::new(sample, InputSample::IDLE);
        let ctx = AbilityContext { tick, rate, input: &edges };
        let busy = trigger.is_busy(&ctx);
        let mut desires = WeaponDesires::default();
        trigger.process_input(&ctx, &mut desires, busy);
        trigger.apply_tick(&ctx, &desires);
        desires
    }

    #[test]
    fn test_half_second_hold_gives_half_charge() {
        let rate = TickRate::new(50);
        let mut trigger = ChargeTrigger::new(Button::Shoot1, 600, to_fixed(1.0), rate);

        for tick in 0..25 {
            assert!(!step(&mut trigger, tick, rate, true).fire);
        }
        let desires = step(&mut trigger, 25, rate, false);
        assert!(desires.has_fired());
        assert!((to_float(desires.charge_value) - 0.5).abs() < 0.001);
        assert_eq!(trigger.charge(), 0);
    }

    #[test]
    fn test_release_without_charge_does_not_fire() {
        let rate = TickRate::new(50);
        let mut trigger = ChargeTrigger::new(Button::Shoot1, 600, to_fixed(1.0), rate);
        assert!(!step(&mut trigger, 0, rate, false).fire);
        assert_eq!(trigger.version(), 0);
    }

    #[test]
    fn test_charge_is_capped() {
        let rate = TickRate::new(50);
        let mut trigger = ChargeTrigger::new(Button::Shoot1, 600, to_fixed(0.2), rate);
        for tick in 0..100 {
            step(&mut trigger, tick, rate, true);
        }
        assert_eq!(trigger.charge(), to_fixed(0.2));
        assert_eq!(trigger.progress(), FIXED_ONE);

        let desires = step(&mut trigger, 100, rate, false);
        assert_eq!(desires.charge_value, FIXED_ONE);
    }

    #[test]
    fn test_version_tracks_changes() {
        let rate = TickRate::new(50);
        let mut trigger = ChargeTrigger::new(Button::Shoot1, 600, to_fixed(0.04), rate);
        step(&mut trigger, 0, rate, true);
        let v1 = trigger.version();
        assert!(v1 > 0);

        // Capped after two ticks; further holding leaves the version alone.
        step(&mut trigger, 1, rate, true);
        let v2 = trigger.version();
        step(&mut trigger, 2, rate, true);
        step(&mut trigger, 3, rate, true);
        assert_eq!(trigger.version(), v2);

        step(&mut trigger, 4, rate, false);
        assert_ne!(trigger.version(), v2);
    }

    #[test]
    fn test_no_charging_during_cooldown() {
        let rate = TickRate::new(60);
        let mut trigger = ChargeTrigger::new(Button::Shoot1, 60, to_fixed(1.0), rate);
        step(&mut trigger, 0, rate, true);
        assert!(step(&mut trigger, 1, rate, false).has_fired());

        // Cooldown of 60 ticks: holding does nothing.
        step(&mut trigger, 2, rate, true);
        assert_eq!(trigger.charge(), 0);
        step(&mut trigger, 61, rate, true);
        assert!(trigger.charge() > 0);
    }
}
