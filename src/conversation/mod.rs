//! Two-agent turn-taking conversation.
//!
//! [`ConversationLoop`] owns the only writable [`ConversationState`]; the
//! presentation layer observes it through [`ConversationLoop::subscribe`]
//! snapshots and [`ConversationEvent`]s, and asks it to halt through a
//! [`StopHandle`].

pub mod events;
pub mod perspective;
pub mod runner;
pub mod types;

pub use events::{ConversationEvent, ConversationEventSink};
pub use runner::{ConversationLoop, ConversationOptions, StopHandle, DEFAULT_SYSTEM_PROMPT};
pub use types::{ConversationState, ConversationStatus, StopReason};
