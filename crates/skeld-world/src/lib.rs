//! Ship geography and navigation for the Skeld simulation.
//!
//! This crate models the physical ship: rooms and corridors as walkable
//! rectangles, a sparse waypoint graph for navigation, one-way vents, and a
//! room adjacency table used when agents reason about "next door".
//!
//! # Modules
//!
//! - [`error`] -- Error types for map construction.
//! - [`map`] -- [`ShipMap`] with spatial queries (room at point, nearest
//!   waypoint, walkability, wall collision, vents).
//! - [`pathfinding`] -- A* over the waypoint graph and point-to-point
//!   polylines.
//! - [`skeld`] -- The default Skeld layout.

pub mod error;
pub mod map;
pub mod pathfinding;
pub mod skeld;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use map::{Area, Corridor, Room, ShipMap, Vent, VentId, Waypoint, WaypointId};
pub use skeld::{MAP_HEIGHT, MAP_WIDTH, build_skeld};
