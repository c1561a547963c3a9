//! The turn-taking loop.

use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use chrono::Utc;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::DuologueError;
use crate::models::AgentConfig;
use crate::provider::{self, ChatProvider};
use crate::types::{Message, Speaker};

use super::events::{ConversationEvent, ConversationEventSink};
use super::perspective;
use super::types::{ConversationState, ConversationStatus, StopReason};

/// Persona prompt sent ahead of the transcript when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Chat like friends about any topic. Keep it casual, light, sometimes funny. Stay safe and respectful.";

/// Per-run options.
#[derive(Debug, Clone, Builder)]
pub struct ConversationOptions {
    /// Seeds the transcript as `Topic: <topic>`.
    #[builder(into)]
    pub topic: String,
    /// Persona prompt; `None` uses [`DEFAULT_SYSTEM_PROMPT`].
    #[builder(into)]
    pub system_prompt: Option<String>,
    /// No turn starts once this much time has elapsed.
    pub time_limit: Option<Duration>,
}

impl ConversationOptions {
    fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

fn whole_secs_rounded_up(limit: Duration) -> u64 {
    limit.as_secs() + u64::from(limit.subsec_nanos() > 0)
}

/// Cooperative stop signal, honored at the next turn boundary.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Alternates two agents over one shared transcript.
pub struct ConversationLoop {
    providers: [Arc<dyn ChatProvider>; 2],
    options: ConversationOptions,
    stop: StopHandle,
    state_tx: watch::Sender<ConversationState>,
    event_sink: Option<ConversationEventSink>,
}

impl ConversationLoop {
    /// Build a loop for two configured agents.
    pub fn new(agents: [AgentConfig; 2], options: ConversationOptions) -> Result<Self, DuologueError> {
        let [first, second] = agents;
        let providers: [Arc<dyn ChatProvider>; 2] = [
            Arc::from(provider::create_provider(&first)?),
            Arc::from(provider::create_provider(&second)?),
        ];
        Ok(Self::with_providers(providers, options))
    }

    /// Build a loop over already constructed providers.
    pub fn with_providers(providers: [Arc<dyn ChatProvider>; 2], options: ConversationOptions) -> Self {
        let models = [
            providers[0].model_id().to_string(),
            providers[1].model_id().to_string(),
        ];
        let state = ConversationState::new(
            options.topic.clone(),
            models,
            options.time_limit.map(whole_secs_rounded_up),
        );
        let (state_tx, _) = watch::channel(state);
        Self {
            providers,
            options,
            stop: StopHandle::default(),
            state_tx,
            event_sink: None,
        }
    }

    pub fn with_event_sink(mut self, sink: ConversationEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Handle for requesting a stop from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Receiver that always holds the latest state snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state_tx.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> ConversationState {
        self.state_tx.borrow().clone()
    }

    /// Run turns until stopped, then return the final state.
    ///
    /// A turn that has started always runs to completion (or failure); stop
    /// requests and the time limit are only checked between turns. Turn
    /// failures stop the conversation and are reported through
    /// [`StopReason::Failed`], not as an `Err`.
    pub async fn run(&mut self) -> Result<ConversationState, DuologueError> {
        if self.state_tx.borrow().status != ConversationStatus::Idle {
            return Err(DuologueError::InvalidState(
                "conversation has already been started".into(),
            ));
        }

        let started = Instant::now();
        let seed = Message::system(format!("Topic: {}", self.options.topic));
        self.state_tx.send_modify(|s| {
            s.transcript.push(seed);
            s.active = Speaker::Agent1;
            s.status = ConversationStatus::Running;
            s.started_at = Some(Utc::now());
        });

        let (run_id, models) = {
            let state = self.state_tx.borrow();
            (state.run_id, state.models.clone())
        };
        info!(
            run_id = %run_id,
            agent1 = %models[0],
            agent2 = %models[1],
            "conversation started"
        );
        self.emit(ConversationEvent::Started {
            run_id,
            topic: self.options.topic.clone(),
        });

        let reason = loop {
            if let Some(reason) = self.boundary_stop(started) {
                break reason;
            }

            let (speaker, turn) = {
                let state = self.state_tx.borrow();
                (state.active, state.completed_turns + 1)
            };
            self.emit(ConversationEvent::TurnStarted {
                speaker,
                turn,
                model: models[speaker.index()].clone(),
            });

            match self.run_turn(speaker).await {
                Ok(message) => {
                    debug!(run_id = %run_id, %speaker, turn, chars = message.content.len(), "turn completed");
                    self.state_tx.send_modify(|s| {
                        s.transcript.push(message.clone());
                        s.completed_turns += 1;
                        s.partial.clear();
                        s.active = speaker.other();
                    });
                    self.emit(ConversationEvent::TurnCompleted { message });
                }
                Err(e) => {
                    error!(run_id = %run_id, %speaker, turn, error = %e, "turn failed");
                    self.state_tx.send_modify(|s| s.partial.clear());
                    break StopReason::Failed {
                        speaker,
                        category: e.category(),
                        error: e.to_string(),
                    };
                }
            }
        };

        info!(run_id = %run_id, reason = ?reason, "conversation stopped");
        self.state_tx.send_modify(|s| {
            s.status = ConversationStatus::Stopped(reason.clone());
            s.finished_at = Some(Utc::now());
        });
        self.emit(ConversationEvent::Stopped { reason });

        Ok(self.state())
    }

    /// Stop condition evaluated before each turn. A manual stop wins when
    /// both apply.
    fn boundary_stop(&self, started: Instant) -> Option<StopReason> {
        if self.stop.is_stopped() {
            return Some(StopReason::Manual);
        }
        match self.options.time_limit {
            Some(limit) if started.elapsed() >= limit => Some(StopReason::TimeLimit),
            _ => None,
        }
    }

    async fn run_turn(&self, speaker: Speaker) -> Result<Message, DuologueError> {
        let provider = Arc::clone(&self.providers[speaker.index()]);
        let request = {
            let state = self.state_tx.borrow();
            perspective::messages_for(self.options.system_prompt(), &state.transcript, speaker)
        };

        let mut stream = provider.stream_chat(&request).await?;
        let mut text = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            text.push_str(&fragment);
            self.state_tx.send_modify(|s| s.partial.push_str(&fragment));
            self.emit(ConversationEvent::Delta {
                speaker,
                text: fragment,
            });
        }

        if text.trim().is_empty() {
            return Err(DuologueError::EmptyResponse {
                speaker,
                model: provider.model_id().to_string(),
            });
        }
        Ok(Message::from_agent(speaker, text))
    }

    fn emit(&self, event: ConversationEvent) {
        if let Some(sink) = &self.event_sink {
            sink(event);
        }
    }
}
