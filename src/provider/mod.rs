//! Chat provider trait and implementations.
//!
//! Each backend wire protocol is one [`ChatProvider`] implementation; callers
//! go through [`create_provider`] or the [`list_models`] / [`stream_chat`]
//! helpers and never see the protocol differences.

pub mod format;
pub mod http;

#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai-compatible")]
pub mod openai_compatible;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::warn;

use crate::error::DuologueError;
use crate::models::AgentConfig;
use crate::types::Message;

/// Lazy, finite, non-restartable sequence of text fragments for one reply.
pub type ChatStream = BoxStream<'static, Result<String, DuologueError>>;

/// Capability interface implemented by every backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name (e.g., "ollama").
    fn provider_name(&self) -> &str;

    /// The model this provider instance chats with.
    fn model_id(&self) -> &str;

    /// List the model identifiers the backend serves.
    async fn list_models(&self) -> Result<Vec<String>, DuologueError>;

    /// Send the full message history and stream the reply.
    ///
    /// Connection and status failures are returned before the first fragment;
    /// failures after that arrive as an `Err` item and end the stream.
    async fn stream_chat(&self, messages: &[Message]) -> Result<ChatStream, DuologueError>;
}

/// Create a provider for the given agent.
pub fn create_provider(config: &AgentConfig) -> Result<Box<dyn ChatProvider>, DuologueError> {
    reqwest::Url::parse(config.endpoint()).map_err(|e| {
        DuologueError::Configuration(format!("Invalid base URL '{}': {e}", config.base_url))
    })?;

    match config.provider {
        #[cfg(feature = "ollama")]
        crate::models::ProviderKind::Ollama => Ok(Box::new(ollama::OllamaProvider::new(
            config.endpoint(),
            config.model.clone(),
        ))),
        #[cfg(feature = "openai-compatible")]
        crate::models::ProviderKind::OpenAiCompatible => Ok(Box::new(
            openai_compatible::OpenAiCompatibleProvider::new(
                config.endpoint(),
                config.api_key.clone(),
                config.model.clone(),
            ),
        )),
        #[allow(unreachable_patterns)]
        other => Err(DuologueError::Configuration(format!(
            "Provider '{other}' not enabled via feature flags"
        ))),
    }
}

/// List models for an agent's backend.
///
/// Never fails: any error is logged and yields an empty list so the caller
/// can fall back to free-text model entry.
pub async fn list_models(config: &AgentConfig) -> Vec<String> {
    let result = match create_provider(config) {
        Ok(provider) => provider.list_models().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(models) => models,
        Err(e) => {
            warn!(
                provider = %config.provider,
                base_url = %config.base_url,
                error = %e,
                "failed to list models"
            );
            Vec::new()
        }
    }
}

/// Stream one chat completion for an agent.
pub async fn stream_chat(
    config: &AgentConfig,
    messages: &[Message],
) -> Result<ChatStream, DuologueError> {
    create_provider(config)?.stream_chat(messages).await
}

#[cfg(any(feature = "ollama", feature = "openai-compatible"))]
pub(crate) fn ensure_model(model: &str) -> Result<(), DuologueError> {
    if model.trim().is_empty() {
        return Err(DuologueError::Configuration(
            "No model selected; enter a model name".into(),
        ));
    }
    Ok(())
}
