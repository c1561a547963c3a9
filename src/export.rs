//! Transcript export as a Markdown document.

use chrono::{DateTime, Utc};

use crate::conversation::ConversationState;
use crate::types::{Message, Role};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render the transcript body: one labeled block per message, in order.
///
/// The topic seed (an untagged system message) is rendered as its own line;
/// every other message renders as `<speaker>: <content>`.
pub fn render_transcript(transcript: &[Message]) -> String {
    transcript
        .iter()
        .map(|message| match (message.role, message.speaker) {
            (Role::System, None) => message.content.clone(),
            _ => format!("{}: {}", message.label(), message.content),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render a full chat document: header with topic, times and models,
/// followed by the transcript.
pub fn render_markdown(state: &ConversationState) -> String {
    let mut doc = format!("# Chat on Topic: {}\n\n", state.topic);
    doc.push_str(&format!("**Start Time:** {}\n", format_time(state.started_at, "Not started")));
    doc.push_str(&format!(
        "**Finish Time:** {}\n\n",
        format_time(state.finished_at, "Not finished")
    ));
    doc.push_str(&format!("**Agent 1 Model:** {}\n", state.models[0]));
    doc.push_str(&format!("**Agent 2 Model:** {}\n\n", state.models[1]));
    doc.push_str("---\n\n");
    doc.push_str(&render_transcript(&state.transcript));
    doc.push('\n');
    doc
}

/// Default export file name for a chat started at `when`.
pub fn default_file_name(when: DateTime<Utc>) -> String {
    format!("chat_{}.md", when.format("%Y%m%d"))
}

fn format_time(time: Option<DateTime<Utc>>, missing: &str) -> String {
    time.map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| missing.to_string())
}
