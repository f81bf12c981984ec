//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Agents are addressed by [`Color`](crate::Color) inside the simulation,
//! since a color is what every other agent can observe. The UUID identifiers
//! here tag agents and meetings for logs and for the renderer, where a color
//! may be disguised by a shapeshifter.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Unique identifier for an agent on the ship.
    AgentId
}

define_id! {
    /// Unique identifier for a single meeting (body report or emergency).
    MeetingId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(AgentId::new(), AgentId::new());
        assert_ne!(MeetingId::new(), MeetingId::new());
    }

    #[test]
    fn id_displays_as_uuid() {
        let raw = Uuid::now_v7();
        let id = AgentId::from(raw);
        assert_eq!(id.to_string(), raw.to_string());
        assert_eq!(id.into_inner(), raw);
    }
}
