//! Error types for the faction personality engine.
//!
//! LLM failures never surface here: every LLM-assisted path has a
//! deterministic fallback. What does surface is repository trouble and
//! caller cancellation.

use loreforge_db::DbError;

/// Errors that can occur in the personality engine.
#[derive(Debug, thiserror::Error)]
pub enum FactionError {
    /// A repository operation failed.
    #[error(transparent)]
    Repository(#[from] DbError),

    /// A decision was posed with no options to choose from.
    #[error("decision has no options")]
    NoOptions,

    /// The caller's context was cancelled.
    #[error("personality operation cancelled")]
    Cancelled,
}

impl FactionError {
    /// Whether the underlying failure was a repository lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Repository(db) if db.is_not_found())
    }
}
