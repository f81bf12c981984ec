//! Shared type definitions for the Skeld simulation.
//!
//! This crate is the single source of truth for the vocabulary used across
//! the Skeld workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for a renderer that draws the ship from read-only snapshots.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agent and meeting identifiers
//! - [`enums`] -- Closed enumerations (colors, rooms, roles, phases, votes)
//! - [`geometry`] -- Points and axis-aligned rectangles on the ship plane
//! - [`snapshot`] -- Read-only game snapshots handed to the renderer

pub mod enums;
pub mod geometry;
pub mod ids;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use enums::{
    Activity, AgentState, Color, ExtraRole, GamePhase, MeetingKind, MeetingPhase, Role, RoomId,
    SabotageKind, TaskCategory, Vote, Winner,
};
pub use geometry::{Point, Rect};
pub use ids::{AgentId, MeetingId};
pub use snapshot::{
    AgentSnapshot, BodySnapshot, ChatLineSnapshot, GameSnapshot, KillFeedEntry, MeetingSnapshot,
};
