//! Weapons and Their Ability State Machines
//!
//! A [`Weapon`] is a slot plus a list of components. Each tick the current
//! weapon runs two passes over its components:
//!
//! 1. `process_input`: components read the fixed input and fill a shared
//!    [`WeaponDesires`]. Whether the weapon is busy is evaluated once,
//!    before the pass, so components see a consistent answer.
//! 2. `apply_tick`: components react to the final desires (start cooldowns,
//!    reload, consume ammo).
//!
//! Holstered weapons skip the first pass and run the second with empty
//! desires, so their magazines keep reloading.

pub mod trigger;
pub mod charge;
pub mod magazine;
pub mod switch;

use serde::{Serialize, Deserialize};

use crate::config::{TriggerMode, WeaponConfig};
use crate::core::fixed::Fixed;
use crate::core::hash::StateHasher;
use crate::core::time::{Tick, TickRate};
use crate::game::edge::EdgeState;

pub use trigger::{FireMode, FireTrigger};
pub use charge::ChargeTrigger;
pub use magazine::AutoReloadMagazine;
pub use switch::{Loadout, SwitchOutcome, SwitchTiming, WeaponSwitchState};

/// What an ability sees of the current tick.
#[derive(Clone, Copy, Debug)]
pub struct AbilityContext<'a> {
    /// Tick being simulated
    pub tick: Tick,
    /// Simulation rate
    pub rate: TickRate,
    /// Fixed input edges of the owning agent
    pub input: &'a EdgeState,
}

/// Shared scratch filled by components during one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeaponDesires {
    /// A trigger wants to fire
    pub fire: bool,
    /// Charge level of the shot, `0..=FIXED_ONE`
    pub charge_value: Fixed,
    /// Ammunition allows a shot
    pub ammo_available: bool,
}

impl WeaponDesires {
    /// A shot actually leaves the weapon this tick.
    #[inline]
    pub fn has_fired(&self) -> bool {
        self.fire && self.ammo_available
    }
}

impl Default for WeaponDesires {
    fn default() -> Self {
        // Weapons without a magazine are never out of ammo.
        Self {
            fire: false,
            charge_value: 0,
            ammo_available: true,
        }
    }
}

/// A tick-driven weapon component.
pub trait Ability {
    /// True while this component blocks the whole weapon.
    fn is_busy(&self, ctx: &AbilityContext<'_>) -> bool;

    /// Read input and fill `desires`. `weapon_busy` covers every component.
    fn process_input(&mut self, ctx: &AbilityContext<'_>, desires: &mut WeaponDesires, weapon_busy: bool);

    /// Apply the tick's outcome.
    fn apply_tick(&mut self, ctx: &AbilityContext<'_>, desires: &WeaponDesires);

    /// Return to the freshly spawned state.
    fn reset(&mut self);

    /// Hash replicated state.
    fn hash_into(&self, hasher: &mut StateHasher);
}

/// Closed set of components a weapon may carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponComponent {
    /// Cadence-limited trigger
    Trigger(FireTrigger),
    /// Hold-to-charge trigger
    Charge(ChargeTrigger),
    /// Magazine refilling one round at a time
    Magazine(AutoReloadMagazine),
}

impl WeaponComponent {
    fn as_ability(&self) -> &dyn Ability {
        match self {
            WeaponComponent::Trigger(c) => c,
            WeaponComponent::Charge(c) => c,
            WeaponComponent::Magazine(c) => c,
        }
    }

    fn as_ability_mut(&mut self) -> &mut dyn Ability {
        match self {
            WeaponComponent::Trigger(c) => c,
            WeaponComponent::Charge(c) => c,
            WeaponComponent::Magazine(c) => c,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            WeaponComponent::Trigger(_) => 0,
            WeaponComponent::Charge(_) => 1,
            WeaponComponent::Magazine(_) => 2,
        }
    }
}

/// One weapon in a loadout slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    slot: u8,
    components: Vec<WeaponComponent>,
}

impl Weapon {
    /// Empty weapon in `slot`.
    pub fn new(slot: u8) -> Self {
        Self {
            slot,
            components: Vec::new(),
        }
    }

    /// Builder: add a component.
    pub fn with_component(mut self, component: WeaponComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Build from configuration.
    pub fn from_config(config: &WeaponConfig, rate: TickRate) -> Self {
        let trigger = match config.mode {
            TriggerMode::Press => WeaponComponent::Trigger(FireTrigger::new(
                config.fire_button,
                FireMode::Press,
                config.cadence,
                rate,
            )),
            TriggerMode::Held => WeaponComponent::Trigger(FireTrigger::new(
                config.fire_button,
                FireMode::Held,
                config.cadence,
                rate,
            )),
            TriggerMode::Charge => WeaponComponent::Charge(ChargeTrigger::new(
                config.fire_button,
                config.cadence,
                config.max_charge_seconds,
                rate,
            )),
        };

        let mut weapon = Weapon::new(config.slot).with_component(trigger);
        if let Some(magazine) = &config.magazine {
            weapon = weapon.with_component(WeaponComponent::Magazine(AutoReloadMagazine::new(
                magazine.size,
                magazine.reload_seconds,
                magazine.spawn_full,
            )));
        }
        weapon
    }

    /// Loadout slot.
    #[inline]
    pub fn slot(&self) -> u8 {
        self.slot
    }

    /// Components in processing order.
    pub fn components(&self) -> &[WeaponComponent] {
        &self.components
    }

    /// Any component blocking.
    pub fn is_busy(&self, ctx: &AbilityContext<'_>) -> bool {
        self.components.iter().any(|c| c.as_ability().is_busy(ctx))
    }

    /// First pass: collect desires from input.
    pub fn process_input(&mut self, ctx: &AbilityContext<'_>) -> WeaponDesires {
        let busy = self.is_busy(ctx);
        let mut desires = WeaponDesires::default();
        for component in &mut self.components {
            component.as_ability_mut().process_input(ctx, &mut desires, busy);
        }
        desires
    }

    /// Second pass: apply desires.
    pub fn apply_tick(&mut self, ctx: &AbilityContext<'_>, desires: &WeaponDesires) {
        for component in &mut self.components {
            component.as_ability_mut().apply_tick(ctx, desires);
        }
    }

    /// Reset every component.
    pub fn reset(&mut self) {
        for component in &mut self.components {
            component.as_ability_mut().reset();
        }
    }

    /// Rounds in the magazine, if the weapon has one.
    pub fn ammo(&self) -> Option<u32> {
        self.components.iter().find_map(|c| match c {
            WeaponComponent::Magazine(m) => Some(m.ammo()),
            _ => None,
        })
    }

    /// Charge trigger, if any.
    pub fn charge(&self) -> Option<&ChargeTrigger> {
        self.components.iter().find_map(|c| match c {
            WeaponComponent::Charge(t) => Some(t),
            _ => None,
        })
    }

    /// Hash replicated state.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.slot);
        for component in &self.components {
            hasher.update_u8(component.tag());
            component.as_ability().hash_into(hasher);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;
    use crate::game::input::{Button, InputSample};

    fn rifle(rate: TickRate) -> Weapon {
        Weapon::new(0)
            .with_component(WeaponComponent::Trigger(FireTrigger::new(
                Button::Shoot1,
                FireMode::Held,
                600,
                rate,
            )))
            .with_component(WeaponComponent::Magazine(AutoReloadMagazine::new(
                3,
                to_fixed(1.5),
                true,
            )))
    }

    fn run(weapon: &mut Weapon, tick: Tick, rate: TickRate, sample: InputSample) -> WeaponDesires {
        let edges = EdgeState::new(sample, InputSample::IDLE);
        let ctx = AbilityContext { tick, rate, input: &edges };
        let desires = weapon.process_input(&ctx);
        weapon.apply_tick(&ctx, &desires);
        desires
    }

    #[test]
    fn test_default_desires_allow_fire() {
        let desires = WeaponDesires {
            fire: true,
            ..WeaponDesires::default()
        };
        assert!(desires.has_fired());
        assert!(!WeaponDesires::default().has_fired());
    }

    #[test]
    fn test_magazine_gates_trigger() {
        let rate = TickRate::new(60);
        let mut weapon = rifle(rate);
        let hold = InputSample::IDLE.with_button(Button::Shoot1);

        let mut shots = 0;
        for tick in 0..30 {
            if run(&mut weapon, tick, rate, hold).has_fired() {
                shots += 1;
            }
        }
        // Three rounds, six ticks apart, then empty until the first reload.
        assert_eq!(shots, 3);
        assert_eq!(weapon.ammo(), Some(0));
        assert!(weapon.is_busy(&AbilityContext {
            tick: 30,
            rate,
            input: &EdgeState::default(),
        }));
    }

    #[test]
    fn test_reload_button_does_not_refill() {
        let rate = TickRate::new(60);
        let mut pressed = rifle(rate);
        let mut idle = rifle(rate);
        let shoot = InputSample::IDLE.with_button(Button::Shoot1);
        run(&mut pressed, 0, rate, shoot);
        run(&mut idle, 0, rate, shoot);

        // The magazine only refills on its own timer.
        let reload = InputSample::IDLE.with_button(Button::Reload);
        for tick in 1..60 {
            let a = run(&mut pressed, tick, rate, reload);
            let b = run(&mut idle, tick, rate, InputSample::IDLE);
            assert_eq!(a, b);
        }
        assert_eq!(pressed, idle);
        assert_eq!(pressed.ammo(), Some(2));
    }

    #[test]
    fn test_reset_restores_spawn_state() {
        let rate = TickRate::new(60);
        let mut weapon = rifle(rate);
        run(&mut weapon, 0, rate, InputSample::IDLE.with_button(Button::Shoot1));
        assert_eq!(weapon.ammo(), Some(2));

        weapon.reset();
        assert_eq!(weapon, rifle(rate));
    }
}
