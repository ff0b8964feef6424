//! Q16.16 Fixed-Point Arithmetic
//!
//! This module provides deterministic fixed-point math for the tick simulation.
//! All operations use integer arithmetic only - no floats in gameplay logic.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why fixed-point?
//!
//! A rollback client re-runs past ticks after every correction. Float results
//! may differ between compilers, instruction sets and optimisation levels;
//! integer results never do, so a resimulated tick lands on the same bits as
//! the server's.

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE; // 65536

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1; // 32768

/// cos(45°) = sin(45°) ≈ 0.7071 = floor(0.70710678 * 65536)
pub const COS_45: Fixed = 46340;

/// cos(135°) ≈ -0.7071
pub const COS_135: Fixed = -COS_45;

// =============================================================================
// CORE OPERATIONS (All deterministic, wrapping semantics)
// =============================================================================

/// Convert a float to fixed-point.
///
/// # Warning
/// Only use at compile-time or when loading configuration. NEVER in the tick loop.
///
/// # Example
/// ```
/// use recoil_sim::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float for display/rendering.
///
/// # Warning
/// Only use for visual output. NEVER use result in game logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers.
///
/// Pre-shifts numerator to maintain precision.
/// Returns 0 on divide-by-zero.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0; // Deterministic: don't panic
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Square root using Newton-Raphson iteration.
///
/// Returns 0 for non-positive inputs.
/// Uses exactly 6 iterations for determinism.
#[inline]
pub fn fixed_sqrt(x: Fixed) -> Fixed {
    if x <= 0 {
        return 0;
    }

    // Initial guess: x/2, but never zero
    let mut guess = (x >> 1).max(1);

    // Newton-Raphson: guess = (guess + x/guess) / 2
    for _ in 0..6 {
        let div = fixed_div(x, guess);
        guess = (guess.wrapping_add(div)) >> 1;

        if guess == 0 {
            guess = 1;
        }
    }

    guess
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    value.max(min).min(max)
}

/// Move `value` toward zero by `step` without crossing it.
///
/// Positive values never become negative and vice versa; zero stays zero.
/// `step` must be non-negative.
#[inline]
pub fn fixed_approach_zero(value: Fixed, step: Fixed) -> Fixed {
    debug_assert!(step >= 0, "approach step must be non-negative, got {}", step);
    if value > 0 {
        value.saturating_sub(step).max(0)
    } else if value < 0 {
        value.saturating_add(step).min(0)
    } else {
        0
    }
}

// =============================================================================
// SERDE ADAPTER
// =============================================================================

/// Serialize a [`Fixed`] as a decimal number and read it back with [`to_fixed`].
///
/// Used on configuration structs so JSON files carry `-20.0` rather than
/// `-1310720`. Use with `#[serde(with = "crate::core::fixed::decimal")]`.
pub mod decimal {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{to_fixed, Fixed, FIXED_ONE};

    /// Write the value as `f64`.
    pub fn serialize<S: Serializer>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value as f64 / FIXED_ONE as f64)
    }

    /// Read an `f64` and convert it once.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fixed, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(to_fixed(value))
    }
}

// =============================================================================
// TESTS
// =============================================================================
