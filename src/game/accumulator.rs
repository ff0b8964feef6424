//! Render-Frame Input Accumulation
//!
//! A client usually renders several frames per simulation tick. Every frame
//! contributes its device sample, weighted by the frame's duration, so a
//! direction held only for the last frame before a tick moves the agent by
//! that share of the tick rather than the whole tick.
//!
//! This lives on the prediction side only. Floats are quantized here, before
//! a sample reaches the simulation.

use crate::game::input::{axis_from_float, Buttons, InputSample};

/// One device reading for one displayed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawInput {
    /// Stick or key direction, each axis in `[-1, 1]`
    pub direction: [f32; 2],
    /// Held buttons
    pub buttons: Buttons,
    /// Weapon slot plus one, 0 for none
    pub weapon_slot_request: u8,
}

impl RawInput {
    /// Quantized sample for this frame alone.
    pub fn to_sample(&self) -> InputSample {
        InputSample {
            move_x: axis_from_float(self.direction[0]),
            move_y: axis_from_float(self.direction[1]),
            buttons: self.buttons,
            weapon_slot: self.weapon_slot_request,
        }
    }
}

/// Combines every displayed frame since the last poll into one tick sample.
#[derive(Clone, Debug, Default)]
pub struct InputAccumulator {
    direction_sum: [f32; 2],
    duration: f32,
    cached: InputSample,
    reset_pending: bool,
}

impl InputAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one displayed frame of duration `dt` seconds.
    ///
    /// Returns the frame's own quantized sample for render-side use.
    pub fn push_frame(&mut self, raw: &RawInput, dt: f32) -> InputSample {
        self.apply_pending_reset();

        let sample = raw.to_sample();
        let weight = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        // Non-finite readings count as neutral, like their quantized sample.
        let axis = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };

        self.direction_sum[0] += axis(raw.direction[0]) * weight;
        self.direction_sum[1] += axis(raw.direction[1]) * weight;
        self.duration += weight;

        if self.duration > 0.0 {
            self.cached.move_x = axis_from_float(self.direction_sum[0] / self.duration);
            self.cached.move_y = axis_from_float(self.direction_sum[1] / self.duration);
        } else {
            self.cached.move_x = sample.move_x;
            self.cached.move_y = sample.move_y;
        }

        self.cached.buttons = self.cached.buttons.union(sample.buttons);
        if sample.weapon_slot != 0 {
            self.cached.weapon_slot = sample.weapon_slot;
        }

        sample
    }

    /// A displayed frame in which input is blocked; only the deferred reset runs.
    pub fn skip_frame(&mut self) {
        self.apply_pending_reset();
    }

    /// Hand the accumulated sample to a tick.
    ///
    /// The reset is deferred to the next frame, so polling several ticks within
    /// one frame yields the same sample each time.
    pub fn consume(&mut self) -> InputSample {
        self.reset_pending = true;
        self.cached
    }

    /// Accumulated sample without consuming it.
    pub fn peek(&self) -> InputSample {
        self.cached
    }

    fn apply_pending_reset(&mut self) {
        if self.reset_pending {
            *self = Self::default();
        }
    }
}
