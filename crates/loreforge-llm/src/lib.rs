//! Provider-agnostic LLM completion gateway.
//!
//! One capability -- `generate_completion(ctx, user, system)` -- over
//! four backends: OpenAI-compatible, Anthropic, OpenRouter, and an
//! in-process mock. Failures are returned, never thrown; the gateway
//! performs no retries.
//!
//! # Modules
//!
//! - [`client`] -- the [`LlmClient`] enum, the shared wire-parameterized
//!   HTTP transport, and the recording mock
//! - [`config`] -- provider selection and credentials
//! - [`parse`] -- JSON extraction from prose-wrapped responses
//! - [`error`] -- [`LlmError`]

pub mod client;
pub mod config;
pub mod error;
pub mod parse;

pub use client::{HttpBackend, LlmClient, MockClient, RecordedPrompt};
pub use config::{LlmConfig, ProviderKind};
pub use error::LlmError;
pub use parse::{ParseError, decode_response, extract_json_object};
