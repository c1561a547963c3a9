//! CLI arguments and terminal presentation for Duologue.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::{Args, Parser, Subcommand};
use futures::{Stream, StreamExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{ProviderPreset, Settings};
use crate::conversation::{ConversationEvent, ConversationEventSink, StopHandle};
use crate::error::DuologueError;

/// Duologue CLI
#[derive(Parser, Debug)]
#[command(name = "duologue", version, about = "Two language models, one conversation")]
pub struct Cli {
    /// Settings file (defaults to the per-user config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the models the configured server offers
    Models(ProviderArgs),
    /// Let two agents talk about a topic
    Chat(ChatArgs),
}

/// Backend selection shared by all commands.
#[derive(Args, Debug, Default)]
pub struct ProviderArgs {
    /// Provider (ollama, lmstudio, openai-compatible)
    #[arg(short, long)]
    pub provider: Option<ProviderPreset>,

    /// Ollama host
    #[arg(long)]
    pub host: Option<String>,

    /// OpenAI-compatible base URL (e.g. http://localhost:1234/v1)
    #[arg(long)]
    pub base_url: Option<String>,

    /// API key for OpenAI-compatible servers
    #[arg(long)]
    pub api_key: Option<String>,
}

impl ProviderArgs {
    /// Apply flags on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(provider) = self.provider {
            settings.provider = provider;
        }
        if let Some(ref host) = self.host {
            settings.ollama_host = host.clone();
        }
        if let Some(ref url) = self.base_url {
            settings.base_url = url.clone();
        }
        if let Some(ref key) = self.api_key {
            settings.api_key = Some(key.clone());
        }
    }
}

/// Arguments for the `chat` subcommand.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Topic the agents discuss
    pub topic: String,

    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Model for Agent 1 (defaults to the first listed model)
    #[arg(long)]
    pub agent1: Option<String>,

    /// Model for Agent 2 (defaults to the second listed model)
    #[arg(long)]
    pub agent2: Option<String>,

    /// Time limit in seconds, 0 for unlimited
    #[arg(short, long)]
    pub time_limit: Option<u64>,

    /// Persona prompt sent to both agents
    #[arg(short, long)]
    pub system: Option<String>,

    /// Save the chat as Markdown to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Save the chat as chat_<date>.md in the current directory
    #[arg(long, conflicts_with = "output")]
    pub save: bool,
}

impl ChatArgs {
    /// Apply flags on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        self.provider.apply(settings);
        if let Some(ref model) = self.agent1 {
            settings.agent1_model = model.clone();
        }
        if let Some(ref model) = self.agent2 {
            settings.agent2_model = model.clone();
        }
        if let Some(secs) = self.time_limit {
            settings.time_limit_secs = secs;
        }
        if let Some(ref system) = self.system {
            settings.system_prompt = system.clone();
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the defaults.
pub fn init_logging(log_file: Option<&Path>) -> Result<(), DuologueError> {
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::registry()
                .with(env_filter("duologue=info"))
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter("duologue=warn"))
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Event sink that streams the dialogue to stdout.
pub fn terminal_sink() -> ConversationEventSink {
    Arc::new(|event: ConversationEvent| {
        let mut out = std::io::stdout().lock();
        let _ = match event {
            ConversationEvent::Started { topic, .. } => writeln!(out, "Topic: {topic}"),
            ConversationEvent::TurnStarted { speaker, model, .. } => {
                write!(out, "\n{speaker} ({model}): ")
            }
            ConversationEvent::Delta { text, .. } => write!(out, "{text}"),
            ConversationEvent::TurnCompleted { .. } => writeln!(out),
            ConversationEvent::Stopped { .. } => Ok(()),
        };
        let _ = out.flush();
    })
}

/// Request a stop on the first interrupt. Resolves to `true` on a second
/// interrupt, when the caller should give up on the turn in flight and exit.
pub async fn watch_interrupts<S>(mut interrupts: S, stop: StopHandle) -> bool
where
    S: Stream<Item = ()> + Unpin,
{
    if interrupts.next().await.is_none() {
        return false;
    }
    eprintln!("\nStopping after the current turn (Ctrl-C again to quit)...");
    stop.stop();
    interrupts.next().await.is_some()
}
