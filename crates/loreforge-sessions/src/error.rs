//! Error surface of the session orchestrator.
//!
//! Precondition violations abort the mutation before anything is
//! persisted; the messages below are what the HTTP layer shows players.

use loreforge_db::DbError;

/// Errors that can occur while orchestrating sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The caller violated a request precondition.
    #[error("{0}")]
    InvalidInput(String),

    /// The session does not exist.
    #[error("session not found")]
    NotFound,

    /// Every non-referee seat is taken.
    #[error("session is full (max {max} players)")]
    Full {
        /// Seats available to non-referee players.
        max: u32,
    },

    /// The caller is not allowed to do this.
    #[error("{0}")]
    Forbidden(String),

    /// The user is already attached to the session.
    #[error("user is already in this session")]
    AlreadyJoined,

    /// The system's entropy source failed while issuing a join code.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// An unexpected data-layer failure.
    #[error(transparent)]
    Repository(DbError),
}

impl From<DbError> for SessionError {
    fn from(err: DbError) -> Self {
        if err.is_not_found() {
            Self::NotFound
        } else {
            Self::Repository(err)
        }
    }
}
