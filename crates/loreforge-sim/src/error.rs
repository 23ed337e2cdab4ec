//! Error types for the world simulator.
//!
//! The simulator fails open: a sub-simulation's trouble is recorded in
//! the step's log details and never aborts the step. Only cancellation
//! and a failed world-state update surface to the caller.

use loreforge_db::DbError;

/// Errors that can abort a simulation step.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A repository operation on the step's own bookkeeping failed.
    #[error(transparent)]
    Repository(#[from] DbError),

    /// The caller's context was cancelled between sub-simulations.
    #[error("simulation cancelled")]
    Cancelled,
}
