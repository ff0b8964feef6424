//! Simulation Clock
//!
//! Ticks are the only notion of time inside the simulation. Durations given in
//! seconds are converted to tick counts once, through the configured tick rate,
//! and everything downstream compares integers.

use super::fixed::{Fixed, FIXED_ONE};

/// One fixed-rate simulation step index.
pub type Tick = u32;

/// Fixed simulation rate in ticks per second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickRate {
    hz: u32,
}

impl TickRate {
    /// Create a tick rate.
    ///
    /// # Panics
    /// Panics if `hz` is zero.
    pub const fn new(hz: u32) -> Self {
        assert!(hz > 0, "tick rate must be positive");
        Self { hz }
    }

    /// Ticks per second.
    #[inline]
    pub const fn hz(self) -> u32 {
        self.hz
    }

    /// Duration of one tick in seconds, rounded to the nearest Q16.16 step.
    ///
    /// 60 Hz gives 1092, i.e. `round(65536 / 60)`.
    #[inline]
    pub const fn delta(self) -> Fixed {
        ((FIXED_ONE as i64 + self.hz as i64 / 2) / self.hz as i64) as Fixed
    }

    /// Convert a duration in seconds to a tick count, rounding up.
    ///
    /// # Panics
    /// Panics on negative durations.
    #[inline]
    pub fn seconds_to_ticks(self, seconds: Fixed) -> u32 {
        assert!(seconds >= 0, "negative duration: {}", seconds);
        let scaled = seconds as i64 * self.hz as i64;
        let one = FIXED_ONE as i64;
        ((scaled + one - 1) / one) as u32
    }

    /// Convert a tick count to seconds.
    #[inline]
    pub fn ticks_to_seconds(self, ticks: u32) -> Fixed {
        ((ticks as i64 * FIXED_ONE as i64) / self.hz as i64) as Fixed
    }

    /// Ticks between shots for a cadence given in rounds per minute.
    ///
    /// Equivalent to `ceil(60 / cadence / tick_delta)` evaluated exactly.
    ///
    /// # Panics
    /// Panics if `rounds_per_minute` is zero.
    #[inline]
    pub fn cadence_to_ticks(self, rounds_per_minute: u32) -> u32 {
        assert!(rounds_per_minute > 0, "cadence must be positive");
        let numerator = 60 * self.hz as u64;
        numerator.div_ceil(rounds_per_minute as u64) as u32
    }
}

impl Default for TickRate {
    fn default() -> Self {
        Self::new(crate::DEFAULT_TICK_RATE)
    }
}
