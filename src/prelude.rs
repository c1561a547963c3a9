//! Convenience re-exports for common use.

pub use crate::config::{ProviderPreset, Settings};
pub use crate::conversation::{
    ConversationEvent, ConversationLoop, ConversationOptions, ConversationState,
    ConversationStatus, StopHandle, StopReason,
};
pub use crate::error::{DuologueError, Result};
pub use crate::models::{AgentConfig, ProviderKind};
pub use crate::provider::{list_models, stream_chat, ChatProvider, ChatStream};
pub use crate::types::{Message, Role, Speaker};
