//! Input Samples and Recording
//!
//! An [`InputSample`] is what one controlling party produced for one tick:
//! a quantized move direction, a button bitset and an optional weapon-slot
//! request. Directions travel as `i8` per axis and are decoded through
//! [`MOVE_LUT`], so every peer decodes the exact same `Fixed` value.

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::hash::{StateHash, StateHasher};
use crate::core::time::Tick;
use crate::core::vec2::FixedVec2;
use crate::game::state::EntityId;
use crate::MAX_WEAPON_SLOTS;

// =============================================================================
// MOVE LOOKUP TABLE (Critical for Determinism)
// =============================================================================

/// Lookup table for converting i8 move input to Fixed.
///
/// Converting i8 [-127..+127] to Fixed [-1.0..+1.0] requires
/// `value * 65536 / 127`, which is not an integer, so the floor division
/// result for all 256 possible values is precomputed here.
///
/// Index 128 (-128 as i8) maps to 0 and reads as "no input".
pub static MOVE_LUT: [Fixed; 256] = {
    let mut lut = [0i32; 256];
    let mut i = 0i32;
    while i < 256 {
        // Treat as signed: 0..127 = positive, 128..255 = negative (-128..-1)
        let signed = if i < 128 { i } else { i - 256 };

        if signed == -128 {
            lut[i as usize] = 0;
        } else {
            lut[i as usize] = (signed * 65536) / 127;
        }
        i += 1;
    }
    lut
};

/// Convert i8 move input to Fixed using lookup table.
#[inline]
pub fn move_to_fixed(input: i8) -> Fixed {
    MOVE_LUT[(input as u8) as usize]
}

/// Quantize a device axis value in `[-1, 1]` to the wire representation.
///
/// Only called on the client before a sample leaves the device layer.
#[inline]
pub fn axis_from_float(value: f32) -> i8 {
    if !value.is_finite() {
        return 0;
    }
    (value.clamp(-1.0, 1.0) * 127.0).round() as i8
}

// =============================================================================
// BUTTONS
// =============================================================================

/// Logical buttons the simulation reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Button {
    /// Primary fire
    Shoot1 = 0,
    /// Secondary fire
    Shoot2 = 1,
    /// Jump
    Jump = 2,
    /// Manual reload
    Reload = 3,
}

impl Button {
    /// Every logical button, in bit order.
    pub const ALL: [Button; 4] = [Button::Shoot1, Button::Shoot2, Button::Jump, Button::Reload];

    /// Bit mask of this button.
    #[inline]
    pub const fn mask(self) -> u32 {
        1 << (self as u8)
    }
}

/// Fixed-width button bitset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Buttons(pub u32);

impl Buttons {
    /// No buttons held.
    pub const NONE: Self = Self(0);

    /// Is `button` set?
    #[inline]
    pub fn is_set(self, button: Button) -> bool {
        self.0 & button.mask() != 0
    }

    /// Set or clear `button`.
    #[inline]
    pub fn set(&mut self, button: Button, held: bool) {
        if held {
            self.0 |= button.mask();
        } else {
            self.0 &= !button.mask();
        }
    }

    /// Builder form of [`Buttons::set`].
    #[inline]
    pub fn with(mut self, button: Button) -> Self {
        self.set(button, true);
        self
    }

    /// Buttons set here but not in `base`.
    #[inline]
    pub fn pressed_since(self, base: Buttons) -> Buttons {
        Buttons(self.0 & !base.0)
    }

    /// Buttons set in `base` but not here.
    #[inline]
    pub fn released_since(self, base: Buttons) -> Buttons {
        Buttons(base.0 & !self.0)
    }

    /// Union of both sets.
    #[inline]
    pub fn union(self, other: Buttons) -> Buttons {
        Buttons(self.0 | other.0)
    }

    /// True if nothing is set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// INPUT SAMPLE
// =============================================================================

/// Input for one entity for one tick (or one render frame).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSample {
    /// Movement X direction: -127 (left) to +127 (right)
    pub move_x: i8,

    /// Movement Y direction: -127 (down) to +127 (up)
    pub move_y: i8,

    /// Held buttons
    pub buttons: Buttons,

    /// Requested weapon slot plus one; 0 means no request
    pub weapon_slot: u8,
}

impl InputSample {
    /// Empty sample: no direction, no buttons, no slot request.
    pub const IDLE: Self = Self {
        move_x: 0,
        move_y: 0,
        buttons: Buttons::NONE,
        weapon_slot: 0,
    };

    /// Sample with a movement direction only.
    pub const fn with_movement(move_x: i8, move_y: i8) -> Self {
        Self {
            move_x,
            move_y,
            buttons: Buttons::NONE,
            weapon_slot: 0,
        }
    }

    /// Builder: hold `button`.
    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.set(button, true);
        self
    }

    /// Builder: request weapon `slot`.
    ///
    /// # Panics
    /// Panics if `slot` is not below [`MAX_WEAPON_SLOTS`].
    pub fn with_weapon_slot(mut self, slot: u8) -> Self {
        assert!(
            (slot as usize) < MAX_WEAPON_SLOTS,
            "weapon slot {} out of range (max {})", slot, MAX_WEAPON_SLOTS
        );
        self.weapon_slot = slot + 1;
        self
    }

    /// Movement as fixed-point vector, decoded via [`MOVE_LUT`].
    #[inline]
    pub fn direction(&self) -> FixedVec2 {
        FixedVec2 {
            x: move_to_fixed(self.move_x),
            y: move_to_fixed(self.move_y),
        }
    }

    /// Requested weapon slot, if any.
    #[inline]
    pub fn weapon_slot_request(&self) -> Option<u8> {
        self.weapon_slot.checked_sub(1)
    }

    /// Is `button` held in this sample?
    #[inline]
    pub fn is_set(&self, button: Button) -> bool {
        self.buttons.is_set(button)
    }

    /// Hash this sample.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.move_x as u8);
        hasher.update_u8(self.move_y as u8);
        hasher.update_u32(self.buttons.0);
        hasher.update_u8(self.weapon_slot);
    }
}

/// Delta-compressed history entry: the sample in effect from `tick` onward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDelta {
    /// Tick when this input state began
    pub tick: Tick,
    /// The new input state
    pub sample: InputSample,
}

// =============================================================================
// INPUT HISTORY
// =============================================================================

/// Recorded fixed samples of one entity, used to drive resimulation.
///
/// Only ticks where the sample changed are stored. Looking up a tick between
/// two deltas yields the earlier one, which is exactly the "last known input"
/// fallback the fixed timeline applies when a tick's sample is missing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputHistory {
    /// Entity these samples belong to
    pub entity: EntityId,

    /// First tick covered
    pub start_tick: Tick,

    /// Last tick recorded
    pub end_tick: Tick,

    deltas: Vec<InputDelta>,

    #[serde(skip)]
    last_sample: Option<InputSample>,
}

impl InputHistory {
    /// Create an empty history.
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            start_tick: 0,
            end_tick: 0,
            deltas: Vec::with_capacity(256),
            last_sample: None,
        }
    }

    /// Record the sample for `tick`.
    ///
    /// Returns `false` (and records nothing) if `tick` is older than the last
    /// recorded tick; samples are immutable once recorded.
    pub fn record(&mut self, tick: Tick, sample: InputSample) -> bool {
        if self.deltas.is_empty() {
            self.start_tick = tick;
        } else if tick <= self.end_tick {
            return false;
        }

        self.end_tick = tick;

        if self.last_sample != Some(sample) {
            self.deltas.push(InputDelta { tick, sample });
            self.last_sample = Some(sample);
        }
        true
    }

    /// Sample in effect at `tick`, or `None` outside the recorded range.
    pub fn sample_at(&self, tick: Tick) -> Option<InputSample> {
        if self.deltas.is_empty() || tick < self.start_tick || tick > self.end_tick {
            return None;
        }

        // Binary search for the last delta at or before this tick
        let idx = self.deltas.partition_point(|d| d.tick <= tick);
        idx.checked_sub(1).map(|i| self.deltas[i].sample)
    }

    /// Drop everything before `tick` while keeping `sample_at(tick)` intact.
    pub fn discard_before(&mut self, tick: Tick) {
        if tick <= self.start_tick {
            return;
        }
        let idx = self.deltas.partition_point(|d| d.tick <= tick);
        if idx > 1 {
            self.deltas.drain(..idx - 1);
        }
        self.start_tick = tick.min(self.end_tick);
        if let Some(first) = self.deltas.first_mut() {
            first.tick = first.tick.max(self.start_tick);
        }
    }

    /// All deltas.
    pub fn deltas(&self) -> &[InputDelta] {
        &self.deltas
    }

    /// Number of delta entries.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Iterate every recorded tick in order.
    pub fn replay_iter(&self) -> ReplayIterator<'_> {
        ReplayIterator {
            history: self,
            current_tick: self.start_tick,
            delta_idx: 0,
            current: InputSample::IDLE,
            done: self.deltas.is_empty(),
        }
    }

    /// Hash of the recorded stream, for comparing two recordings.
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_input_history();
        hasher.update_uuid(self.entity.as_bytes());
        hasher.update_u32(self.start_tick);
        hasher.update_u32(self.end_tick);
        for delta in &self.deltas {
            hasher.update_u32(delta.tick);
            delta.sample.hash_into(&mut hasher);
        }
        hasher.finalize()
    }
}

/// Iterator for replaying samples tick-by-tick.
pub struct ReplayIterator<'a> {
    history: &'a InputHistory,
    current_tick: Tick,
    delta_idx: usize,
    current: InputSample,
    done: bool,
}

impl Iterator for ReplayIterator<'_> {
    type Item = (Tick, InputSample);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.current_tick > self.history.end_tick {
            return None;
        }

        while let Some(delta) = self.history.deltas.get(self.delta_idx) {
            if delta.tick > self.current_tick {
                break;
            }
            self.current = delta.sample;
            self.delta_idx += 1;
        }

        let result = (self.current_tick, self.current);
        if self.current_tick == self.history.end_tick {
            self.done = true;
        } else {
            self.current_tick += 1;
        }
        Some(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
