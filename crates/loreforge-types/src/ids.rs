//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the game backend has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. All IDs use UUID v7
//! (time-ordered) for efficient database indexing.
//!
//! The `new()` constructors exist for app-side generation (session
//! creation, simulation events, tests); repositories never invent IDs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
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

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a game session.
    SessionId
}

define_id! {
    /// Unique identifier for a user account.
    UserId
}

define_id! {
    /// Unique identifier for a player character.
    CharacterId
}

define_id! {
    /// Unique identifier for a faction within a session.
    FactionId
}

define_id! {
    /// Unique identifier for a non-player character.
    NpcId
}

define_id! {
    /// Unique identifier for an NPC goal.
    GoalId
}

define_id! {
    /// Unique identifier for a persisted world event.
    WorldEventId
}

define_id! {
    /// Unique identifier for a faction memory entry.
    MemoryId
}

define_id! {
    /// Unique identifier for a faction agenda.
    AgendaId
}

define_id! {
    /// Unique identifier for a settlement.
    SettlementId
}

define_id! {
    /// Unique identifier for a culture.
    CultureId
}

define_id! {
    /// Unique identifier for a simulation log record.
    SimulationLogId
}

define_id! {
    /// Unique identifier for a stored refresh-token record.
    RefreshTokenId
}

define_id! {
    /// Unique identifier for a generated character class.
    ClassId
}

define_id! {
    /// Unique identifier for a generated encounter.
    EncounterId
}
