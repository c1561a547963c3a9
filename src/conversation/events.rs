//! Conversation event types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Message, Speaker};

use super::types::StopReason;

/// Events emitted by the conversation loop, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    Started {
        run_id: Uuid,
        topic: String,
    },
    TurnStarted {
        speaker: Speaker,
        turn: usize,
        model: String,
    },
    /// One streamed fragment of the turn in flight.
    Delta {
        speaker: Speaker,
        text: String,
    },
    TurnCompleted {
        message: Message,
    },
    Stopped {
        reason: StopReason,
    },
}

/// Callback used for streaming conversation events.
pub type ConversationEventSink = Arc<dyn Fn(ConversationEvent) + Send + Sync>;
