//! Agent behavior for the Skeld simulation.
//!
//! Everything here operates on in-memory agent state without I/O. An agent
//! reads the world through a [`TickContext`] and hands back [`AgentEvent`]s;
//! the orchestrator in `skeld-core` applies them.
//!
//! # Modules
//!
//! - [`agent`] -- The per-agent state machine ([`Agent`]), perception, body
//!   reporting, and human control.
//! - [`impostor`] -- Kill scoring, hunting, vents, fake tasks, sabotage, and
//!   the shapeshift and phantom abilities ([`ImpostorKit`]).
//! - [`knowledge`] -- Meeting summaries built from memory.
//! - [`memory`] -- Companions, sightings, suspicions, the clear list, and
//!   the witness record ([`SocialMemory`]).
//! - [`personality`] -- Per-agent traits.
//! - [`task`] -- Task catalogue, balanced assignment, and progress.
//! - [`timers`] -- Per-agent countdowns ([`TimerRegistry`]).
//! - [`tuning`] -- Behavior knobs ([`Tuning`]).

pub mod agent;
pub mod impostor;
pub mod knowledge;
pub mod memory;
pub mod personality;
pub mod task;
pub mod timers;
pub mod tuning;

// Re-export primary types at crate root.
pub use agent::{
    Agent, AgentEvent, Body, DecisionRecord, Presence, SocialCommand, TickContext,
};
pub use impostor::{ImpostorKit, KillRecord};
pub use knowledge::knowledge_summary;
pub use memory::{AlibiSnapshot, Companion, Observation, Sighting, SocialMemory, Witness};
pub use personality::Personality;
pub use task::{CATALOGUE, StepOutcome, TaskDef, TaskList, TaskStep, assign_tasks, find_task};
pub use timers::{Countdown, TimerRegistry, jittered};
pub use tuning::{AgentTuning, ImpostorTuning, Tuning};
