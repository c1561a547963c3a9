//! Per-agent view of the shared transcript.
//!
//! Both agents are prompted as the "assistant" of their own chat: the
//! speaking agent's earlier turns are `assistant`, everything the other
//! agent said (and the topic seed) is `user`. Consecutive messages with the
//! same role are joined, since many chat templates reject two user turns in
//! a row.

use crate::types::{Message, Role, Speaker};

/// Build the request messages for `speaker` from the transcript.
///
/// The transcript itself is left untouched; a blank `system_prompt` is
/// omitted.
pub fn messages_for(system_prompt: &str, transcript: &[Message], speaker: Speaker) -> Vec<Message> {
    let mut out: Vec<Message> = Vec::with_capacity(transcript.len() + 1);
    if !system_prompt.trim().is_empty() {
        out.push(Message::system(system_prompt));
    }

    for message in transcript {
        let role = match message.speaker {
            Some(s) if s == speaker => Role::Assistant,
            _ => Role::User,
        };
        match out.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str("\n\n");
                last.content.push_str(&message.content);
            }
            _ => out.push(Message {
                role,
                ..message.clone()
            }),
        }
    }

    out
}
