//! Error types for the `skeld-world` crate.
//!
//! Errors only arise while building a map. Once a [`ShipMap`] exists, every
//! query is infallible and reports absence through `Option`.
//!
//! [`ShipMap`]: crate::ShipMap

use skeld_types::RoomId;

use crate::map::{VentId, WaypointId};

/// Errors that can occur while assembling the ship map.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A room was registered twice.
    #[error("duplicate room: {0}")]
    DuplicateRoom(RoomId),

    /// An edge or lookup referenced a waypoint that does not exist.
    #[error("unknown waypoint: {0}")]
    UnknownWaypoint(WaypointId),

    /// A vent link referenced a vent that does not exist.
    #[error("unknown vent: {0}")]
    UnknownVent(String),

    /// A vent with the same name was registered twice.
    #[error("duplicate vent: {0}")]
    DuplicateVent(String),

    /// A vent, waypoint, or adjacency entry referenced an unregistered room.
    #[error("room not registered: {0}")]
    RoomNotFound(RoomId),

    /// A vent was linked to itself.
    #[error("vent {0} links to itself")]
    SelfLinkedVent(VentId),

    /// The map has no waypoints, so nothing can navigate.
    #[error("map has no waypoints")]
    EmptyMap,
}
