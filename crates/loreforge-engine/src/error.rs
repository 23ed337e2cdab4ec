//! Error types for the engine binary.

use loreforge_db::DbError;
use loreforge_llm::LlmError;

/// Errors that can occur during engine startup or scheduling.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration could not be read or parsed.
    #[error("configuration error: {message}")]
    Config {
        /// What went wrong.
        message: String,
    },

    /// The data layer failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The LLM gateway could not be constructed.
    #[error(transparent)]
    Llm(#[from] LlmError),
}
