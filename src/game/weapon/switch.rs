//! Weapon Switching
//!
//! A switch runs on one timer of `duration_ticks`. The equipped slot changes
//! once `swap_ticks` have elapsed; the rest of the duration is recovery during
//! which no weapon takes input.
//!
//! Before the swap point a new request only redirects the pending slot, so
//! quickly scrolling through slots produces one switch to the final one.
//! After the swap point a request starts a fresh switch.

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::hash::StateHasher;
use crate::core::time::{Tick, TickRate};
use crate::game::timer::TickTimer;
use crate::MAX_WEAPON_SLOTS;
use super::Weapon;

/// Switch timing in ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwitchTiming {
    /// Total length of a switch
    pub duration_ticks: u32,
    /// Point at which the equipped slot changes
    pub swap_ticks: u32,
}

impl SwitchTiming {
    /// Convert second-based settings.
    ///
    /// # Panics
    /// Panics on negative durations.
    pub fn from_seconds(duration: Fixed, swap: Fixed, rate: TickRate) -> Self {
        Self {
            duration_ticks: rate.seconds_to_ticks(duration),
            swap_ticks: rate.seconds_to_ticks(swap),
        }
    }
}

/// Result of a slot request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Already pending, or the slot is empty
    Ignored,
    /// Pending slot changed, running timer kept
    Redirected,
    /// Fresh switch started
    Started,
    /// Equipped at once
    Committed,
}

/// Replicated switch sequencer state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeaponSwitchState {
    current_slot: u8,
    pending_slot: u8,
    timer: TickTimer,
}

impl WeaponSwitchState {
    /// Equipped slot.
    pub fn current_slot(&self) -> u8 {
        self.current_slot
    }

    /// Slot being switched to (equal to current when idle).
    pub fn pending_slot(&self) -> u8 {
        self.pending_slot
    }

    /// Switch timer.
    pub fn timer(&self) -> TickTimer {
        self.timer
    }

    /// A switch is in progress; weapons take no input.
    pub fn is_switching(&self, now: Tick) -> bool {
        self.timer.is_running(now)
    }

    /// Ticks since the switch started; the full duration when idle.
    pub fn elapsed_ticks(&self, now: Tick, timing: &SwitchTiming) -> u32 {
        timing
            .duration_ticks
            .saturating_sub(self.timer.remaining_ticks(now).unwrap_or(0))
    }

    /// Request `slot`.
    pub fn request(&mut self, now: Tick, slot: u8, timing: &SwitchTiming) -> SwitchOutcome {
        if slot == self.pending_slot {
            return SwitchOutcome::Ignored;
        }

        let elapsed = self.elapsed_ticks(now, timing);
        self.pending_slot = slot;

        if elapsed < timing.swap_ticks {
            return SwitchOutcome::Redirected;
        }

        self.timer = TickTimer::from_ticks(now, timing.duration_ticks);
        SwitchOutcome::Started
    }

    /// Equip `slot` without a timer.
    pub fn switch_immediate(&mut self, slot: u8) {
        self.current_slot = slot;
        self.pending_slot = slot;
        self.timer = TickTimer::NONE;
    }

    /// Commit the pending slot once the swap point is reached.
    pub fn commit_due(&mut self, now: Tick, timing: &SwitchTiming) -> Option<u8> {
        if self.current_slot == self.pending_slot {
            return None;
        }
        if self.elapsed_ticks(now, timing) < timing.swap_ticks {
            return None;
        }
        self.current_slot = self.pending_slot;
        Some(self.current_slot)
    }

    /// Hash replicated state.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.current_slot);
        hasher.update_u8(self.pending_slot);
        hasher.update_opt_u32(self.timer.expiry());
    }
}

/// The weapons an agent carries, one per slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loadout {
    slots: Vec<Option<Weapon>>,
    timing: SwitchTiming,
    switch: WeaponSwitchState,
    version: u32,
}

impl Loadout {
    /// Empty loadout.
    pub fn new(timing: SwitchTiming) -> Self {
        Self {
            slots: vec![None; MAX_WEAPON_SLOTS],
            timing,
            switch: WeaponSwitchState::default(),
            version: 0,
        }
    }

    /// Put `weapon` into its slot, returning whatever was there.
    ///
    /// # Panics
    /// Panics if the weapon's slot is not below [`MAX_WEAPON_SLOTS`].
    pub fn add(&mut self, weapon: Weapon) -> Option<Weapon> {
        let slot = Self::check_slot(weapon.slot());
        self.version = self.version.wrapping_add(1);
        self.slots[slot].replace(weapon)
    }

    /// Take the weapon out of `slot`.
    ///
    /// # Panics
    /// Panics if `slot` is not below [`MAX_WEAPON_SLOTS`].
    pub fn remove(&mut self, slot: u8) -> Option<Weapon> {
        let removed = self.slots[Self::check_slot(slot)].take();
        if removed.is_some() {
            self.version = self.version.wrapping_add(1);
        }
        removed
    }

    /// Weapon in `slot`.
    pub fn weapon(&self, slot: u8) -> Option<&Weapon> {
        self.slots.get(slot as usize).and_then(Option::as_ref)
    }

    /// Equipped weapon.
    pub fn current(&self) -> Option<&Weapon> {
        self.weapon(self.switch.current_slot)
    }

    /// Equipped weapon, mutably.
    pub fn current_mut(&mut self) -> Option<&mut Weapon> {
        let slot = self.switch.current_slot as usize;
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Every carried weapon, in slot order.
    pub fn weapons(&self) -> impl Iterator<Item = &Weapon> {
        self.slots.iter().flatten()
    }

    /// Every carried weapon, mutably, in slot order.
    pub fn weapons_mut(&mut self) -> impl Iterator<Item = &mut Weapon> {
        self.slots.iter_mut().flatten()
    }

    /// Switch sequencer state.
    pub fn switch_state(&self) -> &WeaponSwitchState {
        &self.switch
    }

    /// Switch timing.
    pub fn timing(&self) -> &SwitchTiming {
        &self.timing
    }

    /// Bumped on add, remove and every committed switch.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// A switch is in progress.
    pub fn is_switching(&self, now: Tick) -> bool {
        self.switch.is_switching(now)
    }

    /// Request a switch to `slot`. Empty slots are ignored.
    ///
    /// # Panics
    /// Panics if `slot` is not below [`MAX_WEAPON_SLOTS`].
    pub fn request_switch(&mut self, now: Tick, slot: u8, immediate: bool) -> SwitchOutcome {
        if self.slots[Self::check_slot(slot)].is_none() {
            return SwitchOutcome::Ignored;
        }

        if immediate || self.timing.duration_ticks == 0 {
            if self.switch.current_slot == slot && self.switch.pending_slot == slot {
                return SwitchOutcome::Ignored;
            }
            self.switch.switch_immediate(slot);
            self.version = self.version.wrapping_add(1);
            return SwitchOutcome::Committed;
        }

        self.switch.request(now, slot, &self.timing)
    }

    /// Commit a due switch. Returns the newly equipped slot.
    pub fn update_switch(&mut self, now: Tick) -> Option<u8> {
        let committed = self.switch.commit_due(now, &self.timing);
        if committed.is_some() {
            self.version = self.version.wrapping_add(1);
        }
        committed
    }

    /// Equip the lowest occupied slot at once.
    pub fn equip_first(&mut self) {
        let first = self.weapons().map(Weapon::slot).next();
        if let Some(slot) = first {
            self.switch.switch_immediate(slot);
            self.version = self.version.wrapping_add(1);
        }
    }

    /// Next occupied slot after `from`, wrapping; 0 if none.
    pub fn next_slot(&self, from: u8, skip_zero: bool) -> u8 {
        let len = self.slots.len();
        (0..len)
            .map(|i| (from as usize + i + 1) % len)
            .find(|&slot| !(slot == 0 && skip_zero) && self.slots[slot].is_some())
            .map_or(0, |slot| slot as u8)
    }

    /// Previous occupied slot before `from`, wrapping; 0 if none.
    pub fn previous_slot(&self, from: u8, skip_zero: bool) -> u8 {
        let len = self.slots.len();
        (0..len)
            .map(|i| (len + from as usize % len - i - 1) % len)
            .find(|&slot| !(slot == 0 && skip_zero) && self.slots[slot].is_some())
            .map_or(0, |slot| slot as u8)
    }

    /// Back to spawn state: weapons reset, first slot equipped, no timer.
    pub fn reset(&mut self) {
        for weapon in self.weapons_mut() {
            weapon.reset();
        }
        self.switch = WeaponSwitchState::default();
        self.equip_first();
    }

    /// Hash replicated state.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        self.switch.hash_into(hasher);
        for weapon in self.weapons() {
            weapon.hash_into(hasher);
        }
    }

    fn check_slot(slot: u8) -> usize {
        assert!(
            (slot as usize) < MAX_WEAPON_SLOTS,
            "weapon slot {} out of range (max {})", slot, MAX_WEAPON_SLOTS
        );
        slot as usize
    }
}
