//! Fixed-Point 2D Vector
//!
//! Deterministic 2D vector operations for character movement.
//! X is horizontal, Y is vertical (positive up).

use std::fmt;
use std::ops::{Add, Sub, Neg};
use serde::{Serialize, Deserialize};

use super::fixed::{
    Fixed, FIXED_ONE, FIXED_SCALE,
    fixed_mul, fixed_approach_zero,
};

/// 2D vector with fixed-point components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point)
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Unit vector pointing right (+X)
    pub const RIGHT: Self = Self { x: FIXED_ONE, y: 0 };

    /// Unit vector pointing up (+Y)
    pub const UP: Self = Self { x: 0, y: FIXED_ONE };

    /// Unit vector pointing left (-X)
    pub const LEFT: Self = Self { x: -FIXED_ONE, y: 0 };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Add another vector.
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_add(other.x),
            y: self.y.wrapping_add(other.y),
        }
    }

    /// Subtract another vector.
    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(other.x),
            y: self.y.wrapping_sub(other.y),
        }
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, scalar),
            y: fixed_mul(self.y, scalar),
        }
    }

    /// Scale by an integer scalar (faster than fixed multiply).
    #[inline]
    pub fn scale_int(self, scalar: i32) -> Self {
        Self {
            x: self.x.wrapping_mul(scalar),
            y: self.y.wrapping_mul(scalar),
        }
    }

    /// True when both components are exactly zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Move each component toward zero by `step`, independently, never crossing zero.
    #[inline]
    pub fn approach_zero(self, step: Fixed) -> Self {
        Self {
            x: fixed_approach_zero(self.x, step),
            y: fixed_approach_zero(self.y, step),
        }
    }

    /// Rotate 90 degrees counter-clockwise.
    #[inline]
    pub fn perpendicular(self) -> Self {
        Self {
            x: self.y.wrapping_neg(),
            y: self.x,
        }
    }

    /// Negate both components.
    #[inline]
    pub fn negate(self) -> Self {
        Self {
            x: self.x.wrapping_neg(),
            y: self.y.wrapping_neg(),
        }
    }

    /// Convert to float tuple for rendering.
    #[inline]
    pub fn to_floats(self) -> (f32, f32) {
        (
            self.x as f32 / FIXED_ONE as f32,
            self.y as f32 / FIXED_ONE as f32,
        )
    }
}

// Operator overloads for ergonomics
impl Add for FixedVec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        FixedVec2::add(self, rhs)
    }
}

impl Sub for FixedVec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        FixedVec2::sub(self, rhs)
    }
}

impl Neg for FixedVec2 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.negate()
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "Vec2({:.3}, {:.3})", fx, fy)
    }
}

impl fmt::Display for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "({:.3}, {:.3})", fx, fy)
    }
}

// =============================================================================
// TESTS
// =============================================================================
