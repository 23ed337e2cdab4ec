//! Error types for the data layer.
//!
//! All repository operations return [`DbError`]. Lookup misses are the
//! distinguished [`DbError::NotFound`] kind so callers can translate
//! them (e.g. "session not found") instead of treating them as
//! infrastructure failures; unique-constraint violations surface as
//! [`DbError::Conflict`].

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A lookup did not find the requested record.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The aggregate that was queried.
        entity: &'static str,
        /// The identifier that missed.
        id: String,
    },

    /// A uniqueness constraint rejected the write (join code,
    /// participant tuple).
    #[error("conflict: {reason}")]
    Conflict {
        /// What collided.
        reason: String,
    },

    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Build a [`DbError::NotFound`] for an entity and identifier.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Build a [`DbError::Conflict`] with a reason.
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Whether this error is a lookup miss.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error is a uniqueness violation.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
