//! Error surface of the content generators.
//!
//! The phrasing is part of the API contract with the HTTP layer:
//! upstream trouble reads "failed to generate <kind>", undecodable
//! responses read "failed to parse <kind> response", and rejected
//! artifacts read "<kind> validation failed: <reason>" with the reason
//! verbatim. Nothing is persisted on any of these paths.

use loreforge_db::DbError;
use loreforge_llm::LlmError;

/// Errors that can occur while generating content.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The caller violated a request precondition.
    #[error("{0}")]
    Input(String),

    /// The LLM gateway failed.
    #[error("failed to generate {kind}")]
    Upstream {
        /// The content kind being generated.
        kind: &'static str,
        /// The gateway failure.
        #[source]
        source: LlmError,
    },

    /// The LLM response could not be decoded into the expected shape.
    #[error("failed to parse {kind} response")]
    Parse {
        /// The content kind being generated.
        kind: &'static str,
    },

    /// A domain invariant rejected the decoded artifact.
    #[error("{kind} validation failed: {reason}")]
    Validation {
        /// The content kind being generated.
        kind: &'static str,
        /// The invariant that failed, verbatim.
        reason: String,
    },

    /// A prompt template failed to render.
    #[error("template error: {0}")]
    Template(String),

    /// Persisting the artifact failed.
    #[error(transparent)]
    Repository(#[from] DbError),

    /// The caller's context was cancelled.
    #[error("generation cancelled")]
    Cancelled,
}

impl GenerateError {
    /// Wrap a gateway failure, keeping cancellation distinct.
    pub fn upstream(kind: &'static str, source: LlmError) -> Self {
        match source {
            LlmError::Cancelled => Self::Cancelled,
            other => Self::Upstream {
                kind,
                source: other,
            },
        }
    }

    /// Build a validation failure with a verbatim reason.
    pub fn validation(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            kind,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_the_contract() {
        let upstream = GenerateError::upstream(
            "class",
            LlmError::Transport {
                provider: "mock",
                message: String::from("offline"),
            },
        );
        assert_eq!(upstream.to_string(), "failed to generate class");

        let parse = GenerateError::Parse { kind: "encounter" };
        assert_eq!(parse.to_string(), "failed to parse encounter response");

        let validation = GenerateError::validation("class", "invalid hit die");
        assert_eq!(
            validation.to_string(),
            "class validation failed: invalid hit die"
        );
    }

    #[test]
    fn cancellation_stays_distinct_from_upstream() {
        let wrapped = GenerateError::upstream("npc", LlmError::Cancelled);
        assert!(matches!(wrapped, GenerateError::Cancelled));
    }
}
