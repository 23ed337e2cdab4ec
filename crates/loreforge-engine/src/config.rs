//! Engine configuration, loaded from `loreforge-config.yaml`.
//!
//! Every field has a sensible default so the binary runs with no config
//! file at all: an in-memory store, the mock LLM backend, and a
//! fifteen-minute simulation interval.

use std::path::Path;

use serde::Deserialize;

use loreforge_llm::{LlmConfig, ProviderKind};

use crate::error::EngineError;

/// Default seconds between scheduler passes.
const DEFAULT_INTERVAL_SECS: u64 = 900;

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// LLM backend configuration.
    #[serde(default = "default_llm")]
    pub llm: LlmConfig,
    /// Seconds between scheduler passes over active sessions.
    #[serde(default = "default_interval")]
    pub simulation_interval_secs: u64,
    /// `PostgreSQL` URL for the durable stores; in-memory when absent.
    #[serde(default)]
    pub database_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm: default_llm(),
            simulation_interval_secs: default_interval(),
            database_url: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Config {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        serde_yml::from_str(&contents).map_err(|e| EngineError::Config {
            message: format!("failed to parse {}: {e}", path.display()),
        })
    }
}

fn default_llm() -> LlmConfig {
    LlmConfig {
        provider: ProviderKind::Mock,
        api_url: String::new(),
        api_key: String::new(),
        model: String::new(),
    }
}

const fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}
