//! Button Edge Detection
//!
//! Edges are derived by comparing the current sample against a base sample.
//! Two timelines keep their own pair:
//!
//! - [`FixedInput`] advances once per simulation tick and is part of the
//!   snapshot, so a resimulated tick sees the same edges as the original run.
//! - [`RenderInput`] advances once per displayed frame on the owning client
//!   and never feeds the simulation.
//!
//! The two are different types so render-frame input cannot reach the
//! authoritative tick by accident.

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use crate::game::input::{Button, Buttons, InputSample};

/// A `(current, base)` sample pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeState {
    current: InputSample,
    base: InputSample,
}

impl EdgeState {
    /// Pair with explicit current and base.
    pub const fn new(current: InputSample, base: InputSample) -> Self {
        Self { current, base }
    }

    /// Shift: the old current becomes the base.
    #[inline]
    pub fn advance(&mut self, next: InputSample) {
        self.base = self.current;
        self.current = next;
    }

    /// Replace the base only.
    #[inline]
    pub fn rebase(&mut self, base: InputSample) {
        self.base = base;
    }

    /// Current sample.
    #[inline]
    pub fn current(&self) -> InputSample {
        self.current
    }

    /// Base sample edges are measured against.
    #[inline]
    pub fn base(&self) -> InputSample {
        self.base
    }

    /// Current move direction.
    #[inline]
    pub fn direction(&self) -> FixedVec2 {
        self.current.direction()
    }

    /// Held in the current sample.
    #[inline]
    pub fn is_set(&self, button: Button) -> bool {
        self.current.buttons.is_set(button)
    }

    /// Held now, not held in the base.
    #[inline]
    pub fn was_pressed(&self, button: Button) -> bool {
        self.current.buttons.is_set(button) && !self.base.buttons.is_set(button)
    }

    /// Held in the base, not held now.
    #[inline]
    pub fn was_released(&self, button: Button) -> bool {
        !self.current.buttons.is_set(button) && self.base.buttons.is_set(button)
    }

    /// Every button with a press edge.
    #[inline]
    pub fn pressed_buttons(&self) -> Buttons {
        self.current.buttons.pressed_since(self.base.buttons)
    }

    /// Every button with a release edge.
    #[inline]
    pub fn released_buttons(&self) -> Buttons {
        self.current.buttons.released_since(self.base.buttons)
    }
}

/// Fixed-tick input of one agent.
///
/// `last_known` is replicated with the rest of the agent so that the first
/// tick after a correction compares against the authoritative previous
/// sample instead of an empty one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixedInput {
    edges: EdgeState,
    last_known: InputSample,
}

impl FixedInput {
    /// Prepare edges for the coming tick.
    ///
    /// A missing sample repeats the last known one, which yields no edges.
    pub fn before_tick(&mut self, delivered: Option<InputSample>) {
        let current = delivered.unwrap_or(self.last_known);
        self.edges = EdgeState::new(current, self.last_known);
        if let Some(sample) = delivered {
            self.last_known = sample;
        }
    }

    /// Drop all input while the agent cannot act.
    pub fn block(&mut self) {
        *self = Self::default();
    }

    /// Edges for the current tick.
    #[inline]
    pub fn edges(&self) -> &EdgeState {
        &self.edges
    }

    /// Current tick sample.
    #[inline]
    pub fn current(&self) -> InputSample {
        self.edges.current
    }

    /// Last sample actually delivered.
    #[inline]
    pub fn last_known(&self) -> InputSample {
        self.last_known
    }
}

/// Per-frame input of the locally controlled agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderInput {
    edges: EdgeState,
}

impl RenderInput {
    /// Start a displayed frame with a fresh device sample.
    #[inline]
    pub fn begin_frame(&mut self, sample: InputSample) {
        self.edges.advance(sample);
    }

    /// After a tick ran, measure the next render edges from the tick's sample.
    #[inline]
    pub fn sync_to_tick(&mut self, fixed: &FixedInput) {
        self.edges.rebase(fixed.current());
    }

    /// Drop all input.
    pub fn block(&mut self) {
        *self = Self::default();
    }

    /// Edges for the current frame.
    #[inline]
    pub fn edges(&self) -> &EdgeState {
        &self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(button: Button) -> InputSample {
        InputSample::IDLE.with_button(button)
    }

    #[test]
    fn test_press_and_release_edges() {
        let edges = EdgeState::new(held(Button::Jump), InputSample::IDLE);
        assert!(edges.was_pressed(Button::Jump));
        assert!(!edges.was_released(Button::Jump));
        assert!(edges.is_set(Button::Jump));

        let edges = EdgeState::new(InputSample::IDLE, held(Button::Jump));
        assert!(!edges.was_pressed(Button::Jump));
        assert!(edges.was_released(Button::Jump));
        assert!(!edges.is_set(Button::Jump));
        assert_eq!(edges.released_buttons(), Buttons::NONE.with(Button::Jump));
    }

    #[test]
    fn test_held_button_presses_once() {
        let mut fixed = FixedInput::default();
        let mut presses = 0;
        for _ in 0..10 {
            fixed.before_tick(Some(held(Button::Shoot1)));
            let edges = fixed.edges();
            assert!(!(edges.was_pressed(Button::Shoot1) && edges.was_released(Button::Shoot1)));
            if edges.was_pressed(Button::Shoot1) {
                presses += 1;
            }
            assert!(edges.is_set(Button::Shoot1));
        }
        assert_eq!(presses, 1);
    }

    #[test]
    fn test_missing_sample_repeats_last_known() {
        let mut fixed = FixedInput::default();
        let sample = held(Button::Shoot1).with_weapon_slot(1);
        fixed.before_tick(Some(sample));
        assert!(fixed.edges().was_pressed(Button::Shoot1));

        fixed.before_tick(None);
        assert_eq!(fixed.current(), sample);
        assert!(!fixed.edges().was_pressed(Button::Shoot1));
        assert!(!fixed.edges().was_released(Button::Shoot1));
        assert_eq!(fixed.last_known(), sample);
    }

    #[test]
    fn test_base_is_last_known_not_previous_current() {
        let mut fixed = FixedInput::default();
        fixed.before_tick(Some(held(Button::Jump)));
        fixed.before_tick(None);
        fixed.before_tick(Some(InputSample::IDLE));
        assert!(fixed.edges().was_released(Button::Jump));
    }

    #[test]
    fn test_block_resets() {
        let mut fixed = FixedInput::default();
        fixed.before_tick(Some(held(Button::Jump)));
        fixed.block();
        assert_eq!(fixed, FixedInput::default());

        // After unblocking the held button presses again.
        fixed.before_tick(Some(held(Button::Jump)));
        assert!(fixed.edges().was_pressed(Button::Jump));
    }

    #[test]
    fn test_render_rebases_on_tick() {
        let mut fixed = FixedInput::default();
        let mut render = RenderInput::default();

        // Frame 1: press shows up on render first.
        render.begin_frame(held(Button::Shoot1));
        assert!(render.edges().was_pressed(Button::Shoot1));

        // Tick consumes the press; next frame still holds.
        fixed.before_tick(Some(held(Button::Shoot1)));
        render.sync_to_tick(&fixed);
        assert!(!render.edges().was_pressed(Button::Shoot1));

        // Frame 2: held, no new edge.
        render.begin_frame(held(Button::Shoot1));
        assert!(!render.edges().was_pressed(Button::Shoot1));
        assert!(render.edges().is_set(Button::Shoot1));

        // Fixed edges untouched by render frames.
        assert!(fixed.edges().was_pressed(Button::Shoot1));
    }
}
