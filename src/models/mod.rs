//! Provider kinds and per-agent endpoint configuration.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default host of a local Ollama server.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default base URL of a local LM Studio server.
pub const DEFAULT_LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

/// Wire protocol spoken by a backend.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString, Default,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ProviderKind {
    /// Ollama's native `/api/tags` + `/api/chat` NDJSON API.
    #[default]
    Ollama,
    /// Any server exposing `/models` + `/chat/completions` with SSE streaming.
    #[serde(rename = "openai-compatible", alias = "openai")]
    #[strum(to_string = "openai-compatible", serialize = "openai")]
    OpenAiCompatible,
}

/// Endpoint and model for one agent. Fixed for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
}

impl AgentConfig {
    /// An agent served by an Ollama host.
    pub fn ollama(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Ollama,
            base_url: host.into(),
            api_key: None,
            model: model.into(),
        }
    }

    /// An agent served by an OpenAI-compatible endpoint. Blank keys are dropped.
    pub fn openai_compatible(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider: ProviderKind::OpenAiCompatible,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
        }
    }

    /// Base URL without trailing slashes.
    pub fn endpoint(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
