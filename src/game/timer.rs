//! Tick-Relative Timer
//!
//! A timer is nothing but an optional expiry tick. Every query takes the
//! current tick as an argument, so the same timer value answers the same way
//! on the first run and on every resimulation of that tick.
//!
//! Two "done" predicates exist on purpose:
//! - [`TickTimer::is_expired_or_not_running`] gates "ready to act"
//!   (a cooldown that never started is ready).
//! - [`TickTimer::is_expired`] gates "time's up, act now"
//!   (a reload that never started must not hand out a bullet).

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::time::{Tick, TickRate};

/// Countdown measured in simulation ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickTimer {
    expiry: Option<Tick>,
}

impl TickTimer {
    /// Timer that is not running.
    pub const NONE: Self = Self { expiry: None };

    /// Timer expiring `ticks` after `now`.
    #[inline]
    pub fn from_ticks(now: Tick, ticks: u32) -> Self {
        Self {
            expiry: Some(now.wrapping_add(ticks)),
        }
    }

    /// Timer expiring after `seconds`, rounded up to whole ticks.
    ///
    /// # Panics
    /// Panics on negative durations.
    #[inline]
    pub fn from_seconds(now: Tick, seconds: Fixed, rate: TickRate) -> Self {
        Self::from_ticks(now, rate.seconds_to_ticks(seconds))
    }

    /// Expiry tick, if running or expired.
    #[inline]
    pub fn expiry(self) -> Option<Tick> {
        self.expiry
    }

    /// True if the timer was started and `now` has reached its expiry.
    #[inline]
    pub fn is_expired(self, now: Tick) -> bool {
        matches!(self.expiry, Some(expiry) if now >= expiry)
    }

    /// True if the timer was never started or has expired.
    #[inline]
    pub fn is_expired_or_not_running(self, now: Tick) -> bool {
        match self.expiry {
            None => true,
            Some(expiry) => now >= expiry,
        }
    }

    /// True while started and not yet expired.
    #[inline]
    pub fn is_running(self, now: Tick) -> bool {
        !self.is_expired_or_not_running(now)
    }

    /// Ticks left until expiry. `None` when not running, `Some(0)` once expired.
    #[inline]
    pub fn remaining_ticks(self, now: Tick) -> Option<u32> {
        self.expiry.map(|expiry| expiry.saturating_sub(now))
    }

    /// Seconds left until expiry. `None` when not running, `Some(0)` once expired.
    #[inline]
    pub fn remaining(self, now: Tick, rate: TickRate) -> Option<Fixed> {
        self.remaining_ticks(now).map(|ticks| rate.ticks_to_seconds(ticks))
    }
}
