//! Configuration (layered: defaults < TOML file < environment < CLI flags).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::conversation::{ConversationOptions, DEFAULT_SYSTEM_PROMPT};
use crate::error::DuologueError;
use crate::models::{AgentConfig, DEFAULT_LMSTUDIO_BASE_URL, DEFAULT_OLLAMA_HOST};

/// Default time budget: ten minutes.
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 600;

/// Backend choice as offered to users.
///
/// LM Studio is an OpenAI-compatible server that needs no key, so any
/// configured key is ignored for it.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString, Default,
)]
#[strum(ascii_case_insensitive)]
pub enum ProviderPreset {
    #[default]
    #[serde(rename = "ollama")]
    #[strum(to_string = "ollama")]
    Ollama,
    #[serde(rename = "lmstudio", alias = "lm-studio")]
    #[strum(to_string = "lmstudio", serialize = "lm-studio")]
    LmStudio,
    #[serde(rename = "openai-compatible", alias = "openai", alias = "other")]
    #[strum(to_string = "openai-compatible", serialize = "openai", serialize = "other")]
    OpenAiCompatible,
}

/// User-facing settings for one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub provider: ProviderPreset,
    pub ollama_host: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub agent1_model: String,
    pub agent2_model: String,
    /// Seconds; `0` means unlimited.
    pub time_limit_secs: u64,
    pub system_prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderPreset::Ollama,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            base_url: DEFAULT_LMSTUDIO_BASE_URL.to_string(),
            api_key: None,
            agent1_model: String::new(),
            agent2_model: String::new(),
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Settings {
    /// `<config dir>/duologue/config.toml` for the current user.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "duologue")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Parse settings from a TOML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, DuologueError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            DuologueError::Configuration(format!("Invalid config file {}: {e}", path.display()))
        })
    }

    /// Load defaults, then the config file, then the environment.
    ///
    /// An explicit `path` must exist; the default path is used only when
    /// present.
    pub fn load(path: Option<&Path>) -> Result<Self, DuologueError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Override fields from environment-style variables.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), DuologueError> {
        if let Some(provider) = lookup("DUOLOGUE_PROVIDER") {
            self.provider = provider.parse().map_err(|_| {
                DuologueError::Configuration(format!(
                    "Unknown provider '{provider}' (expected ollama, lmstudio or openai-compatible)"
                ))
            })?;
        }
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.ollama_host = host;
        }
        if let Some(url) = lookup("OPENAI_COMPAT_BASE_URL") {
            self.base_url = url;
        }
        if let Some(key) = lookup("OPENAI_COMPAT_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("DUOLOGUE_AGENT1_MODEL") {
            self.agent1_model = model;
        }
        if let Some(model) = lookup("DUOLOGUE_AGENT2_MODEL") {
            self.agent2_model = model;
        }
        if let Some(secs) = lookup("DUOLOGUE_TIME_LIMIT_SECS") {
            self.time_limit_secs = secs.trim().parse().map_err(|_| {
                DuologueError::Configuration(format!("Invalid DUOLOGUE_TIME_LIMIT_SECS '{secs}'"))
            })?;
        }
        Ok(())
    }

    /// Endpoint for the selected provider, with `model` filled in.
    pub fn agent(&self, model: impl Into<String>) -> AgentConfig {
        match self.provider {
            ProviderPreset::Ollama => AgentConfig::ollama(&self.ollama_host, model),
            ProviderPreset::LmStudio => AgentConfig::openai_compatible(&self.base_url, None, model),
            ProviderPreset::OpenAiCompatible => {
                AgentConfig::openai_compatible(&self.base_url, self.api_key.clone(), model)
            }
        }
    }

    /// The two agents, as configured.
    pub fn agent_configs(&self) -> [AgentConfig; 2] {
        [self.agent(&self.agent1_model), self.agent(&self.agent2_model)]
    }

    pub fn time_limit(&self) -> Option<Duration> {
        (self.time_limit_secs > 0).then(|| Duration::from_secs(self.time_limit_secs))
    }

    /// Conversation options for `topic` under these settings.
    pub fn conversation_options(&self, topic: impl Into<String>) -> ConversationOptions {
        ConversationOptions::builder()
            .topic(topic)
            .system_prompt(self.system_prompt.clone())
            .maybe_time_limit(self.time_limit())
            .build()
    }

    /// Fill blank agent models from a listing: agent 1 takes the first
    /// model, agent 2 the second (or the first when only one exists).
    pub fn fill_models_from(&mut self, models: &[String]) {
        if self.agent1_model.trim().is_empty() {
            if let Some(first) = models.first() {
                self.agent1_model = first.clone();
            }
        }
        if self.agent2_model.trim().is_empty() {
            if let Some(model) = models.get(1).or_else(|| models.first()) {
                self.agent2_model = model.clone();
            }
        }
    }
}
