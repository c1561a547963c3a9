//! Duologue: two language-model agents in conversation.
//!
//! Relays each agent's streamed reply to the other agent through a local
//! Ollama server or any OpenAI-compatible endpoint, alternating turns until
//! stopped by hand, by a time budget, or by a failed turn.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use duologue::prelude::*;
//!
//! # async fn example() -> duologue::error::Result<()> {
//! let agents = [
//!     AgentConfig::ollama("http://localhost:11434", "llama3.2"),
//!     AgentConfig::ollama("http://localhost:11434", "qwen2.5"),
//! ];
//! let options = ConversationOptions::builder()
//!     .topic("rainy days")
//!     .time_limit(Duration::from_secs(120))
//!     .build();
//! let state = ConversationLoop::new(agents, options)?.run().await?;
//! println!("{}", duologue::export::render_markdown(&state));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod export;
pub mod models;
pub mod prelude;
pub mod provider;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
