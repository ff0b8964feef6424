//! Core deterministic primitives.
//!
//! All types in this module are designed for perfect cross-platform determinism.
//! They form the foundation the tick simulation and its resimulation rely on.

pub mod fixed;
pub mod vec2;
pub mod time;
pub mod hash;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec2::FixedVec2;
pub use time::{Tick, TickRate};
pub use hash::{StateHash, StateHasher, compute_state_hash};
