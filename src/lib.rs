//! # Recoil Sim
//!
//! Deterministic tick core for a rollback/prediction multiplayer game: agents
//! that move, jump and launch themselves with weapon recoil.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        RECOIL SIM                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Deterministic primitives                │
//! │  ├── fixed.rs      - Q16.16 fixed-point arithmetic           │
//! │  ├── vec2.rs       - 2D vector with fixed-point              │
//! │  ├── time.rs       - Ticks and tick rate                     │
//! │  └── hash.rs       - State hashing for verification          │
//! │                                                              │
//! │  game/             - Simulation (deterministic)              │
//! │  ├── timer.rs      - Tick timers                             │
//! │  ├── input.rs      - Input samples and history               │
//! │  ├── edge.rs       - Press/release edges                     │
//! │  ├── weapon/       - Trigger, charge, magazine, switching    │
//! │  ├── movement.rs   - Character movement                      │
//! │  ├── state.rs      - Agent state and snapshot                │
//! │  ├── agent.rs      - Per-agent tick pipeline                 │
//! │  └── world.rs      - Simulation loop                         │
//! │                                                              │
//! │  game/             - Client side (outside the snapshot)      │
//! │  ├── accumulator.rs- Render frames to tick samples           │
//! │  └── prediction.rs - Input timeline, reconciliation          │
//! │                                                              │
//! │  config.rs         - Tuning, JSON loading, validation        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` module and the simulation part of `game/` are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies, only tick counts
//!
//! Given the same snapshot and the same input samples, the simulation produces
//! **identical results** on any platform, which is what rollback relies on.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod config;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::time::{Tick, TickRate};
pub use core::hash::StateHash;
pub use config::{ConfigError, SimulationConfig};
pub use game::input::{Button, Buttons, InputSample};
pub use game::state::{AgentState, EntityId, SimSnapshot};
pub use game::world::{Simulation, SimulationError, TickResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default simulation tick rate (Hz)
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Weapon slots per agent
pub const MAX_WEAPON_SLOTS: usize = 8;
