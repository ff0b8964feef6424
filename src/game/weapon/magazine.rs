//! Magazine that reloads one round at a time on its own.

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::hash::StateHasher;
use crate::game::timer::TickTimer;
use super::{Ability, AbilityContext, WeaponDesires};

/// Auto-reloading magazine.
///
/// While below capacity a per-round timer runs; each expiry adds one round.
/// Reload is applied before the tick's shot is consumed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoReloadMagazine {
    size: u32,
    reload_seconds: Fixed,
    spawn_full: bool,
    ammo: u32,
    reload: TickTimer,
}

impl AutoReloadMagazine {
    /// Magazine of `size` rounds reloading one round per `reload_seconds`.
    ///
    /// # Panics
    /// Panics on a negative reload time.
    pub fn new(size: u32, reload_seconds: Fixed, spawn_full: bool) -> Self {
        assert!(reload_seconds >= 0, "negative reload time: {}", reload_seconds);
        Self {
            size,
            reload_seconds,
            spawn_full,
            ammo: if spawn_full { size } else { 0 },
            reload: TickTimer::NONE,
        }
    }

    /// Rounds loaded.
    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    /// Capacity.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Timer of the round being reloaded.
    pub fn reload_timer(&self) -> TickTimer {
        self.reload
    }

    /// Overwrite the round count.
    ///
    /// # Panics
    /// Panics if `ammo` exceeds the capacity.
    pub fn set_ammo(&mut self, ammo: u32) {
        assert!(ammo <= self.size, "ammo {} exceeds magazine size {}", ammo, self.size);
        self.ammo = ammo;
    }
}

impl Ability for AutoReloadMagazine {
    fn is_busy(&self, _ctx: &AbilityContext<'_>) -> bool {
        self.ammo == 0
    }

    fn process_input(&mut self, _ctx: &AbilityContext<'_>, desires: &mut WeaponDesires, _weapon_busy: bool) {
        desires.ammo_available = self.ammo > 0;
    }

    fn apply_tick(&mut self, ctx: &AbilityContext<'_>, desires: &WeaponDesires) {
        if self.ammo < self.size && self.reload.is_expired(ctx.tick) {
            self.ammo += 1;
        }

        if desires.has_fired() {
            assert!(self.ammo > 0, "fired from an empty magazine");
            self.ammo -= 1;
        }

        if self.ammo < self.size && self.reload.is_expired_or_not_running(ctx.tick) {
            self.reload = TickTimer::from_seconds(ctx.tick, self.reload_seconds, ctx.rate);
        }
    }

    fn reset(&mut self) {
        self.ammo = if self.spawn_full { self.size } else { 0 };
        self.reload = TickTimer::NONE;
    }

    fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.ammo);
        hasher.update_opt_u32(self.reload.expiry());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;
    use crate::core::time::{Tick, TickRate};
    use crate::game::edge::EdgeState;

    fn apply(mag: &mut AutoReloadMagazine, tick: Tick, fire: bool) -> bool {
        let edges = EdgeState::default();
        let ctx = AbilityContext { tick, rate: TickRate::new(60), input: &edges };
        let mut desires = WeaponDesires {
            fire,
            ..WeaponDesires::default()
        };
        mag.process_input(&ctx, &mut desires, mag.is_busy(&ctx));
        mag.apply_tick(&ctx, &desires);
        desires.has_fired()
    }

    #[test]
    fn test_spawn_full_or_empty() {
        assert_eq!(AutoReloadMagazine::new(3, to_fixed(1.5), true).ammo(), 3);
        assert_eq!(AutoReloadMagazine::new(3, to_fixed(1.5), false).ammo(), 0);
    }

    #[test]
    fn test_fire_consumes_one() {
        let mut mag = AutoReloadMagazine::new(3, to_fixed(1.5), true);
        assert!(apply(&mut mag, 0, true));
        assert_eq!(mag.ammo(), 2);
        // Reload of the missing round starts the same tick.
        assert_eq!(mag.reload_timer().expiry(), Some(90));
    }

    #[test]
    fn test_empty_magazine_blocks() {
        let mut mag = AutoReloadMagazine::new(1, to_fixed(1.0), true);
        assert!(apply(&mut mag, 0, true));
        assert_eq!(mag.ammo(), 0);
        assert!(!apply(&mut mag, 1, true));
        assert_eq!(mag.ammo(), 0);
    }

    #[test]
    fn test_reload_one_round_per_interval() {
        let mut mag = AutoReloadMagazine::new(3, to_fixed(1.0), false);
        apply(&mut mag, 0, false);
        assert_eq!(mag.reload_timer().expiry(), Some(60));

        for tick in 1..60 {
            apply(&mut mag, tick, false);
            assert_eq!(mag.ammo(), 0);
        }
        apply(&mut mag, 60, false);
        assert_eq!(mag.ammo(), 1);
        assert_eq!(mag.reload_timer().expiry(), Some(120));

        for tick in 61..=180 {
            apply(&mut mag, tick, false);
        }
        assert_eq!(mag.ammo(), 3);
    }

    #[test]
    fn test_reload_before_consumption() {
        // Empty magazine whose round arrives on the tick the trigger is pulled.
        let mut mag = AutoReloadMagazine::new(2, to_fixed(1.0), false);
        apply(&mut mag, 0, false);
        let edges = EdgeState::default();
        let ctx = AbilityContext { tick: 60, rate: TickRate::new(60), input: &edges };
        let desires = WeaponDesires {
            fire: true,
            ..WeaponDesires::default()
        };
        mag.apply_tick(&ctx, &desires);
        assert_eq!(mag.ammo(), 0);
        assert_eq!(mag.reload_timer().expiry(), Some(120));
    }

    #[test]
    #[should_panic(expected = "exceeds magazine size")]
    fn test_set_ammo_over_capacity_panics() {
        let mut mag = AutoReloadMagazine::new(3, to_fixed(1.0), true);
        mag.set_ammo(4);
    }
}
