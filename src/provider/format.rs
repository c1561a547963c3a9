//! Provider formatting helpers.

use serde::Serialize;

use crate::types::{Message, Role};

/// A message as both chat APIs expect it: role and text only.
#[derive(Debug, Serialize)]
pub(crate) struct WireMessage<'a> {
    pub role: Role,
    pub content: &'a str,
}

/// Streaming chat request body shared by Ollama `/api/chat` and
/// OpenAI-compatible `/chat/completions`.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    pub stream: bool,
}

impl<'a> ChatRequest<'a> {
    pub fn streaming(model: &'a str, messages: &'a [Message]) -> Self {
        Self {
            model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            stream: true,
        }
    }
}
