//! Ollama native API provider (`/api/tags`, `/api/chat` NDJSON streaming).

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::DuologueError;
use crate::types::Message;

use super::format::ChatRequest;
use super::http::{check_status, json_headers, shared_client, LineBuffer, LIST_TIMEOUT};
use super::{ensure_model, ChatProvider, ChatStream};

pub struct OllamaProvider {
    host: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

/// What one NDJSON record of a chat stream means for the consumer.
#[derive(Debug, PartialEq)]
enum Record {
    Fragment(String),
    Done(Option<String>),
    Failed(String),
    Skip,
}

fn parse_record(line: &str) -> Record {
    if line.trim().is_empty() {
        return Record::Skip;
    }
    let chunk = match serde_json::from_str::<OllamaChatChunk>(line) {
        Ok(chunk) => chunk,
        Err(_) => {
            warn!(line, "skipping non-JSON line from Ollama stream");
            return Record::Skip;
        }
    };
    if let Some(error) = chunk.error {
        return Record::Failed(error);
    }
    let text = chunk
        .message
        .and_then(|m| m.content)
        .filter(|c| !c.is_empty());
    match (chunk.done, text) {
        (true, text) => Record::Done(text),
        (false, Some(text)) => Record::Fragment(text),
        (false, None) => Record::Skip,
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn list_models(&self) -> Result<Vec<String>, DuologueError> {
        let url = format!("{}/api/tags", self.host);
        debug!(url = %url, "Ollama list_models");

        let resp = shared_client()
            .get(&url)
            .timeout(LIST_TIMEOUT)
            .send()
            .await?;
        let body = check_status(resp).await?.bytes().await?;
        let tags: OllamaTags = serde_json::from_slice(&body)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn stream_chat(&self, messages: &[Message]) -> Result<ChatStream, DuologueError> {
        ensure_model(&self.model)?;
        let url = format!("{}/api/chat", self.host);
        let body = ChatRequest::streaming(&self.model, messages);

        debug!(
            model = %self.model,
            messages = messages.len(),
            "Ollama stream_chat"
        );

        let resp = shared_client()
            .post(&url)
            .headers(json_headers(None))
            .json(&body)
            .send()
            .await?;
        let byte_stream = check_status(resp).await?.bytes_stream();

        let stream = async_stream::stream! {
            let mut lines = LineBuffer::new();
            futures::pin_mut!(byte_stream);

            loop {
                let (pending, mut finished) = match byte_stream.next().await {
                    Some(Ok(chunk)) => {
                        lines.push(&chunk);
                        let pending: Vec<String> = std::iter::from_fn(|| lines.next_line()).collect();
                        (pending, false)
                    }
                    Some(Err(e)) => {
                        yield Err(DuologueError::Connection(e));
                        break;
                    }
                    // Connection closed: flush a trailing record without newline.
                    None => (lines.finish().into_iter().collect(), true),
                };

                for line in pending {
                    match parse_record(&line) {
                        Record::Fragment(text) => yield Ok(text),
                        Record::Done(text) => {
                            if let Some(text) = text {
                                yield Ok(text);
                            }
                            finished = true;
                            break;
                        }
                        Record::Failed(message) => {
                            yield Err(DuologueError::protocol(format!("Ollama: {message}")));
                            finished = true;
                            break;
                        }
                        Record::Skip => {}
                    }
                }

                if finished {
                    break;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

// Ollama API response types (internal)

#[derive(Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaTag>,
}

#[derive(Deserialize)]
struct OllamaTag {
    name: String,
}

#[derive(Deserialize)]
struct OllamaChatChunk {
    message: Option<OllamaChunkMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaChunkMessage {
    content: Option<String>,
}
