//! Completion backends.
//!
//! A completion call is the same everywhere in this workspace: system
//! prompt and user prompt in, one string out. The three remote
//! providers all speak JSON over HTTP but disagree on three things --
//! which endpoint to hit, how to authenticate, and where in the
//! response the reply text lives. Those differences are small enough to
//! be data, so a single [`HttpBackend`] carries a [`WireFormat`] value
//! instead of each provider getting its own client type, and one
//! path-walking helper digs the reply out of any of them.
//!
//! The fourth backend, [`MockClient`], answers from memory for tests
//! and offline runs and records every prompt it sees.
//!
//! Every call has a 30-second ceiling and stops early when the caller's
//! token is cancelled. Failures are returned as values; retrying is the
//! caller's decision, never the gateway's.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{LlmConfig, ProviderKind};
use crate::error::LlmError;

/// Hard ceiling for one completion call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Token budget requested from the provider per completion.
const MAX_TOKENS: u32 = 1024;

/// Sampling temperature for generation.
const TEMPERATURE: f64 = 0.7;

/// A configured completion backend.
///
/// One enum rather than a trait object: the set of providers is closed
/// and known at configuration time, and matching keeps the async call
/// sites plain.
pub enum LlmClient {
    /// OpenAI chat completions (and compatible endpoints).
    OpenAi(HttpBackend),
    /// Anthropic Messages API.
    Anthropic(HttpBackend),
    /// OpenRouter's routing API (OpenAI body shape on its own host).
    OpenRouter(HttpBackend),
    /// Canned in-process responses.
    Mock(MockClient),
}

impl LlmClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Transport`] if the HTTP client cannot be
    /// constructed (TLS backend initialization failure).
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(match config.provider {
            ProviderKind::OpenAi => {
                Self::OpenAi(HttpBackend::new(config, WireFormat::OpenAiChat, "OpenAI")?)
            }
            ProviderKind::Anthropic => Self::Anthropic(HttpBackend::new(
                config,
                WireFormat::AnthropicMessages,
                "Anthropic",
            )?),
            ProviderKind::OpenRouter => Self::OpenRouter(HttpBackend::new(
                config,
                WireFormat::OpenAiChat,
                "OpenRouter",
            )?),
            ProviderKind::Mock => Self::Mock(MockClient::returning("{}")),
        })
    }

    /// Run one completion and return the reply text.
    ///
    /// Returns [`LlmError::Cancelled`] as soon as `ctx` is cancelled,
    /// even while the HTTP call is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on transport trouble, a non-success status
    /// (the message carries status and body), or a response without the
    /// expected reply text.
    pub async fn generate_completion(
        &self,
        ctx: &CancellationToken,
        user_prompt: &str,
        system_prompt: &str,
    ) -> Result<String, LlmError> {
        if ctx.is_cancelled() {
            return Err(LlmError::Cancelled);
        }
        let call = async {
            match self {
                Self::OpenAi(backend) | Self::Anthropic(backend) | Self::OpenRouter(backend) => {
                    backend.complete(user_prompt, system_prompt).await
                }
                Self::Mock(mock) => mock.complete(user_prompt, system_prompt),
            }
        };
        tokio::select! {
            () = ctx.cancelled() => Err(LlmError::Cancelled),
            result = call => result,
        }
    }

    /// Label used in log lines.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
            Self::OpenRouter(_) => "openrouter",
            Self::Mock(_) => "mock",
        }
    }
}

// ---------------------------------------------------------------------------
// Remote transport
// ---------------------------------------------------------------------------

/// Where a provider deviates from the others on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireFormat {
    /// `POST {base}/chat/completions`, bearer auth, both prompts in the
    /// messages array, reply under `choices.0.message.content`.
    OpenAiChat,
    /// `POST {base}/messages`, `x-api-key` auth plus a version header,
    /// system prompt as a top-level field, reply under
    /// `content.0.text`.
    AnthropicMessages,
}

impl WireFormat {
    /// Path segment appended to the base URL.
    const fn endpoint(self) -> &'static str {
        match self {
            Self::OpenAiChat => "chat/completions",
            Self::AnthropicMessages => "messages",
        }
    }

    /// Dotted path to the reply text inside the response document.
    const fn reply_path(self) -> &'static str {
        match self {
            Self::OpenAiChat => "choices.0.message.content",
            Self::AnthropicMessages => "content.0.text",
        }
    }

    /// Assemble the request body for this wire format.
    fn body(self, model: &str, user_prompt: &str, system_prompt: &str) -> serde_json::Value {
        match self {
            Self::OpenAiChat => serde_json::json!({
                "model": model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt}
                ],
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS,
            }),
            Self::AnthropicMessages => serde_json::json!({
                "model": model,
                "max_tokens": MAX_TOKENS,
                "system": system_prompt,
                "messages": [
                    {"role": "user", "content": user_prompt}
                ]
            }),
        }
    }
}

/// One remote provider, fully configured.
pub struct HttpBackend {
    http: reqwest::Client,
    wire: WireFormat,
    base_url: String,
    api_key: String,
    model: String,
    provider: &'static str,
}

impl HttpBackend {
    /// Configure a backend for the given wire format.
    fn new(
        config: &LlmConfig,
        wire: WireFormat,
        provider: &'static str,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Transport {
                provider,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            wire,
            base_url: config.effective_url().trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            provider,
        })
    }

    /// Run one completion against the remote provider.
    async fn complete(&self, user_prompt: &str, system_prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/{}", self.base_url, self.wire.endpoint());
        let request = self.http.post(&url).header("Content-Type", "application/json");
        let request = match self.wire {
            WireFormat::OpenAiChat => request.bearer_auth(&self.api_key),
            WireFormat::AnthropicMessages => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01"),
        };

        let response = request
            .json(&self.wire.body(&self.model, user_prompt, system_prompt))
            .send()
            .await
            .map_err(|e| LlmError::Transport {
                provider: self.provider,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unreadable error body"));
            return Err(LlmError::Status {
                provider: self.provider,
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value =
            response.json().await.map_err(|e| LlmError::Transport {
                provider: self.provider,
                message: format!("malformed response body: {e}"),
            })?;

        pluck_text(&payload, self.wire.reply_path()).ok_or(LlmError::MissingContent {
            provider: self.provider,
            path: self.wire.reply_path(),
        })
    }
}

/// Follow a dotted path through a JSON document and take the string at
/// its end. Segments that parse as numbers index into arrays, so
/// `"choices.0.message.content"` reads `choices[0].message.content`.
/// An empty list, a missing key, or a non-string leaf all yield `None`.
fn pluck_text(payload: &serde_json::Value, path: &str) -> Option<String> {
    let mut cursor = payload;
    for segment in path.split('.') {
        cursor = match segment.parse::<usize>() {
            Ok(index) => cursor.get(index)?,
            Err(_) => cursor.get(segment)?,
        };
    }
    cursor.as_str().map(str::to_owned)
}

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

/// One recorded prompt pair, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPrompt {
    /// The system prompt that was sent.
    pub system: String,
    /// The user prompt that was sent.
    pub user: String,
}

/// In-process backend returning canned responses without I/O.
///
/// Records every prompt it receives so tests can assert on prompt
/// assembly. Cloning shares the recording buffer.
#[derive(Debug, Clone)]
pub struct MockClient {
    response: Result<String, String>,
    calls: Arc<Mutex<Vec<RecordedPrompt>>>,
}

impl MockClient {
    /// A mock that answers every call with `text`.
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A mock that fails every call with a transport error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Prompts received so far, in call order.
    pub fn calls(&self) -> Vec<RecordedPrompt> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Record the prompt and return the canned response.
    fn complete(&self, user_prompt: &str, system_prompt: &str) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedPrompt {
                system: system_prompt.to_owned(),
                user: user_prompt.to_owned(),
            });
        }
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(LlmError::Transport {
                provider: "mock",
                message: message.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pluck_text_walks_the_openai_shape() {
        let payload = json!({
            "choices": [{
                "message": {"content": "{\"name\": \"Shadowdancer\"}"}
            }]
        });
        let text = pluck_text(&payload, WireFormat::OpenAiChat.reply_path());
        assert!(text.is_some_and(|t| t.contains("Shadowdancer")));
    }

    #[test]
    fn pluck_text_walks_the_anthropic_shape() {
        let payload = json!({
            "content": [{"type": "text", "text": "{\"mood\": \"confident\"}"}]
        });
        let text = pluck_text(&payload, WireFormat::AnthropicMessages.reply_path());
        assert!(text.is_some_and(|t| t.contains("confident")));
    }

    #[test]
    fn pluck_text_misses_on_empty_lists_and_wrong_shapes() {
        assert_eq!(
            pluck_text(&json!({"choices": []}), "choices.0.message.content"),
            None
        );
        assert_eq!(pluck_text(&json!({"content": []}), "content.0.text"), None);
        assert_eq!(
            pluck_text(&json!({"error": "rate_limit"}), "choices.0.message.content"),
            None
        );
        // A non-string leaf is a miss, not a stringification.
        assert_eq!(
            pluck_text(&json!({"content": [{"text": 7}]}), "content.0.text"),
            None
        );
    }

    #[test]
    fn wire_formats_know_their_endpoints_and_paths() {
        assert_eq!(WireFormat::OpenAiChat.endpoint(), "chat/completions");
        assert_eq!(WireFormat::AnthropicMessages.endpoint(), "messages");
        assert_eq!(
            WireFormat::OpenAiChat.reply_path(),
            "choices.0.message.content"
        );
        assert_eq!(WireFormat::AnthropicMessages.reply_path(), "content.0.text");
    }

    #[test]
    fn request_bodies_place_the_system_prompt_correctly() {
        let openai = WireFormat::OpenAiChat.body("m", "ask", "voice");
        let roles: Vec<&str> = openai
            .get("messages")
            .and_then(serde_json::Value::as_array)
            .map(|msgs| {
                msgs.iter()
                    .filter_map(|m| m.get("role").and_then(serde_json::Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        assert_eq!(roles, vec!["system", "user"]);
        assert!(openai.get("system").is_none());

        let anthropic = WireFormat::AnthropicMessages.body("m", "ask", "voice");
        assert_eq!(
            anthropic.get("system").and_then(serde_json::Value::as_str),
            Some("voice")
        );
        let message_count = anthropic
            .get("messages")
            .and_then(serde_json::Value::as_array)
            .map(Vec::len);
        assert_eq!(message_count, Some(1));
    }

    #[test]
    fn provider_kinds_map_onto_backends() {
        let base = LlmConfig {
            provider: ProviderKind::OpenAi,
            api_url: String::new(),
            api_key: String::from("test"),
            model: String::from("test-model"),
        };
        let openai = LlmClient::from_config(&base);
        assert_eq!(openai.ok().map(|c| c.name()), Some("openai-compatible"));

        let anthropic = LlmClient::from_config(&LlmConfig {
            provider: ProviderKind::Anthropic,
            ..base.clone()
        });
        assert_eq!(anthropic.ok().map(|c| c.name()), Some("anthropic"));

        let router = LlmClient::from_config(&LlmConfig {
            provider: ProviderKind::OpenRouter,
            ..base.clone()
        });
        assert_eq!(router.ok().map(|c| c.name()), Some("openrouter"));

        let mock = LlmClient::from_config(&LlmConfig {
            provider: ProviderKind::Mock,
            ..base
        });
        assert_eq!(mock.ok().map(|c| c.name()), Some("mock"));
    }

    #[test]
    fn openrouter_shares_the_openai_wire_format() {
        let config = LlmConfig {
            provider: ProviderKind::OpenRouter,
            api_url: String::new(),
            api_key: String::new(),
            model: String::new(),
        };
        let client = LlmClient::from_config(&config).ok();
        assert!(matches!(client, Some(LlmClient::OpenRouter(_))));
        let Some(LlmClient::OpenRouter(backend)) = client else {
            return;
        };
        assert_eq!(backend.wire, WireFormat::OpenAiChat);
        assert!(backend.base_url.contains("openrouter.ai"));
    }

    #[tokio::test]
    async fn mock_answers_and_records_prompts() {
        let mock = MockClient::returning("{\"ok\": true}");
        let client = LlmClient::Mock(mock.clone());
        let ctx = CancellationToken::new();

        let result = client
            .generate_completion(&ctx, "user prompt", "system prompt")
            .await;
        assert_eq!(result.ok().as_deref(), Some("{\"ok\": true}"));

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls.first().map(|c| c.user.as_str()), Some("user prompt"));
        assert_eq!(
            calls.first().map(|c| c.system.as_str()),
            Some("system prompt")
        );
    }

    #[tokio::test]
    async fn mock_failure_surfaces_as_transport_error() {
        let client = LlmClient::Mock(MockClient::failing("provider offline"));
        let ctx = CancellationToken::new();

        let result = client.generate_completion(&ctx, "u", "s").await;
        assert!(matches!(result, Err(LlmError::Transport { .. })));
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let client = LlmClient::Mock(MockClient::returning("{}"));
        let ctx = CancellationToken::new();
        ctx.cancel();

        let result = client.generate_completion(&ctx, "u", "s").await;
        assert!(matches!(result, Err(LlmError::Cancelled)));
    }
}
