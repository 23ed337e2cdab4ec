//! Error types for the LLM gateway.
//!
//! The gateway returns failures, it never panics and never retries;
//! retry and fallback policy belongs to the content generators that
//! call it.

/// Errors that can occur during a completion call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The HTTP request could not be built or sent (network error,
    /// client construction failure, timeout).
    #[error("{provider} request failed: {message}")]
    Transport {
        /// The provider being called.
        provider: &'static str,
        /// Description of the transport failure.
        message: String,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("{provider} returned {status}: {body}")]
    Status {
        /// The provider being called.
        provider: &'static str,
        /// The HTTP status code.
        status: u16,
        /// The response body, for diagnosis.
        body: String,
    },

    /// The response JSON lacked the provider-specific content path, or
    /// the content list was empty.
    #[error("{provider} response missing {path}")]
    MissingContent {
        /// The provider being called.
        provider: &'static str,
        /// The JSON path that was expected.
        path: &'static str,
    },

    /// The caller's context was cancelled mid-call.
    #[error("completion cancelled")]
    Cancelled,
}
