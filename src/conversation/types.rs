//! Conversation state types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorCategory;
use crate::types::{Message, Speaker};

/// Why a conversation stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// Stop was requested through a [`StopHandle`](super::StopHandle).
    Manual,
    /// The time budget ran out before the next turn could start.
    TimeLimit,
    /// A turn failed; its partial reply was discarded.
    Failed {
        speaker: Speaker,
        category: ErrorCategory,
        error: String,
    },
}

/// Conversation lifecycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    Idle,
    Running,
    Stopped(StopReason),
}

/// Snapshot of a conversation.
///
/// `transcript` only ever grows; `active` names the agent that speaks next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub run_id: Uuid,
    pub topic: String,
    pub models: [String; 2],
    pub transcript: Vec<Message>,
    pub active: Speaker,
    pub status: ConversationStatus,
    /// Text streamed so far for the turn in flight.
    pub partial: String,
    pub completed_turns: usize,
    /// Time budget in whole seconds, rounded up; `None` when unlimited.
    pub time_limit_secs: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ConversationState {
    pub fn new(topic: impl Into<String>, models: [String; 2], time_limit_secs: Option<u64>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            topic: topic.into(),
            models,
            transcript: Vec::new(),
            active: Speaker::Agent1,
            status: ConversationStatus::Idle,
            partial: String::new(),
            completed_turns: 0,
            time_limit_secs,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == ConversationStatus::Running
    }

    /// The stop reason, once stopped.
    pub fn stop_reason(&self) -> Option<&StopReason> {
        match &self.status {
            ConversationStatus::Stopped(reason) => Some(reason),
            _ => None,
        }
    }

    /// Model name of an agent.
    pub fn model(&self, speaker: Speaker) -> &str {
        &self.models[speaker.index()]
    }
}
