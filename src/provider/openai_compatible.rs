//! Generic OpenAI-compatible provider (LM Studio, vLLM, llama.cpp server, hosted APIs).

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::DuologueError;
use crate::types::Message;

use super::format::ChatRequest;
use super::http::{
    check_status, json_headers, parse_sse_line, shared_client, LineBuffer, SseLine, LIST_TIMEOUT,
};
use super::{ensure_model, ChatProvider, ChatStream};

/// Generic provider for any OpenAI-compatible API.
pub struct OpenAiCompatibleProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }
}

/// Pull model ids out of a `/models` listing.
///
/// Accepts the standard `{"data": [{"id": ..}]}` envelope and a bare array of
/// objects carrying `id` or `name`. Anything else lists nothing.
fn model_ids(listing: serde_json::Value) -> Vec<String> {
    let entries = match listing {
        serde_json::Value::Object(mut obj) => match obj.remove("data") {
            Some(serde_json::Value::Array(entries)) => entries,
            _ => return Vec::new(),
        },
        serde_json::Value::Array(entries) => entries,
        _ => return Vec::new(),
    };
    entries
        .iter()
        .filter_map(|entry| {
            entry
                .get("id")
                .or_else(|| entry.get("name"))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// Content delta carried by one SSE payload, if any. Unparseable payloads
/// are logged and ignored.
fn delta_content(data: &str) -> Option<String> {
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
            .filter(|c| !c.is_empty()),
        Err(_) => {
            warn!(data, "skipping non-JSON SSE payload");
            None
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    fn provider_name(&self) -> &str {
        "openai-compatible"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn list_models(&self) -> Result<Vec<String>, DuologueError> {
        let url = format!("{}/models", self.base_url);
        debug!(url = %url, "OpenAI-compatible list_models");

        let resp = shared_client()
            .get(&url)
            .headers(json_headers(self.api_key.as_deref()))
            .timeout(LIST_TIMEOUT)
            .send()
            .await?;
        let body = check_status(resp).await?.bytes().await?;
        let listing: serde_json::Value = serde_json::from_slice(&body)?;
        Ok(model_ids(listing))
    }

    async fn stream_chat(&self, messages: &[Message]) -> Result<ChatStream, DuologueError> {
        ensure_model(&self.model)?;
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest::streaming(&self.model, messages);

        debug!(
            model = %self.model,
            messages = messages.len(),
            "OpenAI-compatible stream_chat"
        );

        let resp = shared_client()
            .post(&url)
            .headers(json_headers(self.api_key.as_deref()))
            .json(&body)
            .send()
            .await?;
        let byte_stream = check_status(resp).await?.bytes_stream();

        let stream = async_stream::stream! {
            let mut lines = LineBuffer::new();
            futures::pin_mut!(byte_stream);

            loop {
                let (pending, closed) = match byte_stream.next().await {
                    Some(Ok(chunk)) => {
                        lines.push(&chunk);
                        let pending: Vec<String> = std::iter::from_fn(|| lines.next_line()).collect();
                        (pending, false)
                    }
                    Some(Err(e)) => {
                        yield Err(DuologueError::Connection(e));
                        break;
                    }
                    None => (lines.finish().into_iter().collect(), true),
                };

                let mut done = false;
                for line in pending {
                    match parse_sse_line(&line) {
                        SseLine::Data(data) => {
                            if let Some(text) = delta_content(data) {
                                yield Ok(text);
                            }
                        }
                        SseLine::Done => {
                            done = true;
                            break;
                        }
                        SseLine::Skip => {}
                    }
                }

                if done {
                    break;
                }
                // A reply is only complete once [DONE] arrives.
                if closed {
                    yield Err(DuologueError::protocol("stream closed before [DONE]"));
                    break;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

// OpenAI streaming response types (internal)

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
