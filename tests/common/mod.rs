//! Shared test helpers and a scripted mock provider.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use duologue::conversation::ConversationEventSink;
use duologue::error::DuologueError;
use duologue::provider::{ChatProvider, ChatStream};
use duologue::types::Message;

/// What the mock does for one `stream_chat` call.
pub enum Script {
    Reply(Vec<String>),
    FailToStart(String),
    FailMidStream(Vec<String>, String),
}

/// A provider that plays back queued scripts, one per turn.
pub struct MockProvider {
    model_id: String,
    scripts: Mutex<VecDeque<Script>>,
    delay: Duration,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            scripts: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Each turn takes this long before its stream is returned.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn reply(self, fragments: &[&str]) -> Self {
        self.push(Script::Reply(fragments.iter().map(|s| s.to_string()).collect()))
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Script::FailToStart(message.to_string()))
    }

    pub fn fail_mid_stream(self, fragments: &[&str], message: &str) -> Self {
        self.push(Script::FailMidStream(
            fragments.iter().map(|s| s.to_string()).collect(),
            message.to_string(),
        ))
    }

    fn push(self, script: Script) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }

    /// Every message list this provider was asked to answer.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn list_models(&self) -> Result<Vec<String>, DuologueError> {
        Ok(vec![self.model_id.clone()])
    }

    async fn stream_chat(&self, messages: &[Message]) -> Result<ChatStream, DuologueError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::Reply(vec![format!("reply from {}", self.model_id)]));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let items: Vec<Result<String, DuologueError>> = match script {
            Script::Reply(fragments) => fragments.into_iter().map(Ok).collect(),
            Script::FailToStart(message) => return Err(DuologueError::protocol(message)),
            Script::FailMidStream(fragments, message) => fragments
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(DuologueError::protocol(message))))
                .collect(),
        };
        Ok(futures::stream::iter(items).boxed())
    }
}

/// Event sink that records every event it sees.
pub fn recording_sink() -> (ConversationEventSink, Arc<Mutex<Vec<duologue::conversation::ConversationEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&events);
    let sink: ConversationEventSink = Arc::new(move |event| {
        captured.lock().unwrap().push(event);
    });
    (sink, events)
}

/// A local URL nothing is listening on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
