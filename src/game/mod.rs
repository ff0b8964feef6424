//! Game Logic Module
//!
//! All simulation code. 100% deterministic except `accumulator` and
//! `prediction`, which run on the client outside the replicated state.
//!
//! ## Module Structure
//!
//! - `timer`: Tick-based timers
//! - `input`: Input samples, buttons, recorded input history
//! - `edge`: Press/release edge detection for the tick and render timelines
//! - `accumulator`: Render-frame input folded into one tick sample
//! - `weapon`: Trigger, charge, magazine and weapon switch state machines
//! - `movement`: Character movement integration
//! - `state`: Agent state and the replicated snapshot
//! - `agent`: Per-agent tick pipeline
//! - `events`: Simulation events for presentation and logging
//! - `world`: The simulation loop
//! - `prediction`: Input timeline, local player, reconciliation

pub mod timer;
pub mod input;
pub mod edge;
pub mod accumulator;
pub mod weapon;
pub mod movement;
pub mod state;
pub mod agent;
pub mod events;
pub mod world;
pub mod prediction;

// Re-export key types
pub use input::{Button, Buttons, InputSample, InputHistory, MOVE_LUT};
pub use edge::{EdgeState, FixedInput, RenderInput};
pub use accumulator::{InputAccumulator, RawInput};
pub use movement::{CharacterCollider, FlatGround, MovementIntegrator, MovementState};
pub use state::{AgentState, EntityId, SimSnapshot};
pub use events::{SimEvent, SimEventData};
pub use world::{Simulation, SimulationError, TickResult};
pub use prediction::{Correction, InputTimeline, LocalPlayer, Reconciler};
