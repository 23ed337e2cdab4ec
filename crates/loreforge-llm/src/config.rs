//! Gateway configuration.
//!
//! The engine binary deserializes this from its YAML config file; tests
//! construct it directly. The provider kind selects the wire format, the
//! rest is credentials and model choice.

use serde::Deserialize;

/// Which completion provider to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI chat completions API (also covers compatible endpoints).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// OpenRouter's OpenAI-compatible routing API.
    OpenRouter,
    /// Canned in-process responses for tests and offline runs.
    Mock,
}

/// Configuration for one LLM backend.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// The provider wire format to use.
    pub provider: ProviderKind,
    /// Base URL of the API (e.g. `https://api.openai.com/v1`). When
    /// empty, the provider's default is used.
    #[serde(default)]
    pub api_url: String,
    /// API key sent with each request.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier (provider-specific).
    #[serde(default)]
    pub model: String,
}

impl LlmConfig {
    /// The effective base URL: the configured one, or the provider
    /// default when none was given.
    pub fn effective_url(&self) -> &str {
        if !self.api_url.is_empty() {
            return &self.api_url;
        }
        match self.provider {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Mock => "",
        }
    }
}
