//! Transcript message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// A message in a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Which agent produced this message; `None` for the topic seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<Speaker>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
            speaker: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            speaker: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message without a speaker tag.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            speaker: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message produced by `speaker`.
    pub fn from_agent(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker: Some(speaker),
            ..Self::assistant(text)
        }
    }

    /// Display label for transcripts: the speaker name when tagged,
    /// otherwise the role.
    pub fn label(&self) -> String {
        match self.speaker {
            Some(speaker) => speaker.to_string(),
            None => match self.role {
                Role::System => "System".to_string(),
                Role::User => "User".to_string(),
                Role::Assistant => "Assistant".to_string(),
            },
        }
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One of the two agents taking part in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    #[strum(serialize = "Agent 1")]
    Agent1,
    #[strum(serialize = "Agent 2")]
    Agent2,
}

impl Speaker {
    /// Zero-based agent index.
    pub fn index(self) -> usize {
        match self {
            Self::Agent1 => 0,
            Self::Agent2 => 1,
        }
    }

    /// The other agent.
    pub fn other(self) -> Self {
        match self {
            Self::Agent1 => Self::Agent2,
            Self::Agent2 => Self::Agent1,
        }
    }
}
