//! Tests for the turn-taking loop using scripted mock providers.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{recording_sink, MockProvider};
use duologue::conversation::{
    ConversationEvent, ConversationLoop, ConversationOptions, ConversationStatus, StopReason,
};
use duologue::error::{DuologueError, ErrorCategory, RecoverySuggestion};
use duologue::provider::ChatProvider;
use duologue::types::{Message, Role, Speaker};
use pretty_assertions::assert_eq;

fn options(topic: &str) -> ConversationOptions {
    ConversationOptions::builder()
        .topic(topic)
        .system_prompt("be brief")
        .build()
}

fn pair(a: MockProvider, b: MockProvider) -> (Arc<MockProvider>, Arc<MockProvider>, [Arc<dyn ChatProvider>; 2]) {
    let a = Arc::new(a);
    let b = Arc::new(b);
    let providers: [Arc<dyn ChatProvider>; 2] = [a.clone(), b.clone()];
    (a, b, providers)
}

/// Stop the loop once `turns` turns have completed.
fn stop_after(conversation: ConversationLoop, turns: usize) -> ConversationLoop {
    let stop = conversation.stop_handle();
    let completed = AtomicUsize::new(0);
    conversation.with_event_sink(Arc::new(move |event| {
        if matches!(event, ConversationEvent::TurnCompleted { .. })
            && completed.fetch_add(1, Ordering::SeqCst) + 1 >= turns
        {
            stop.stop();
        }
    }))
}

fn speakers(transcript: &[Message]) -> Vec<Option<Speaker>> {
    transcript.iter().map(|m| m.speaker).collect()
}

#[tokio::test]
async fn agents_strictly_alternate() {
    let (a, b, providers) = pair(MockProvider::new("model-a"), MockProvider::new("model-b"));
    let conversation = ConversationLoop::with_providers(providers, options("tea"));
    let mut conversation = stop_after(conversation, 5);

    let state = conversation.run().await.unwrap();

    assert_eq!(state.status, ConversationStatus::Stopped(StopReason::Manual));
    assert_eq!(state.completed_turns, 5);
    assert_eq!(
        speakers(&state.transcript),
        vec![
            None,
            Some(Speaker::Agent1),
            Some(Speaker::Agent2),
            Some(Speaker::Agent1),
            Some(Speaker::Agent2),
            Some(Speaker::Agent1),
        ]
    );
    assert_eq!(state.active, Speaker::Agent2);
    assert_eq!(a.requests().len(), 3);
    assert_eq!(b.requests().len(), 2);
    assert_eq!(state.transcript[1].content, "reply from model-a");
    assert_eq!(state.transcript[2].content, "reply from model-b");
}

#[tokio::test]
async fn transcript_is_seeded_and_only_appended() {
    let (_a, _b, providers) = pair(
        MockProvider::new("a").reply(&["Hel", "lo"]),
        MockProvider::new("b").reply(&["Hi"]),
    );
    let conversation = ConversationLoop::with_providers(providers, options("X"));
    let stop = conversation.stop_handle();
    let (sink, events) = recording_sink();
    let completed = AtomicUsize::new(0);
    let mut conversation = conversation.with_event_sink(Arc::new(move |event| {
        if matches!(event, ConversationEvent::TurnCompleted { .. })
            && completed.fetch_add(1, Ordering::SeqCst) == 1
        {
            stop.stop();
        }
        sink(event);
    }));

    let state = conversation.run().await.unwrap();

    let seed = &state.transcript[0];
    assert_eq!((seed.role, seed.content.as_str(), seed.speaker), (Role::System, "Topic: X", None));

    let appended: Vec<Message> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            ConversationEvent::TurnCompleted { message } => Some(message.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(&state.transcript[1..], appended.as_slice());
    assert_eq!(appended[0].content, "Hello");
    assert_eq!(appended[0].role, Role::Assistant);
    assert_eq!(appended[1].content, "Hi");
}

#[tokio::test]
async fn deltas_are_emitted_in_order_before_completion() {
    let (_a, _b, providers) = pair(
        MockProvider::new("a").reply(&["one ", "two ", "three"]),
        MockProvider::new("b"),
    );
    let conversation = ConversationLoop::with_providers(providers, options("counting"));
    let stop = conversation.stop_handle();
    let (sink, events) = recording_sink();
    let mut conversation = conversation.with_event_sink(Arc::new(move |event| {
        if matches!(event, ConversationEvent::TurnCompleted { .. }) {
            stop.stop();
        }
        sink(event);
    }));

    conversation.run().await.unwrap();

    let kinds: Vec<String> = events
        .lock()
        .unwrap()
        .iter()
        .map(|e| match e {
            ConversationEvent::Started { .. } => "started".to_string(),
            ConversationEvent::TurnStarted { speaker, turn, .. } => format!("turn {turn} {speaker}"),
            ConversationEvent::Delta { text, .. } => format!("delta {text}"),
            ConversationEvent::TurnCompleted { message } => format!("done {}", message.content),
            ConversationEvent::Stopped { reason } => format!("stopped {reason:?}"),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "started",
            "turn 1 Agent 1",
            "delta one ",
            "delta two ",
            "delta three",
            "done one two three",
            "stopped Manual",
        ]
    );
}

#[tokio::test]
async fn each_agent_sees_its_own_perspective() {
    let (a, b, providers) = pair(
        MockProvider::new("a").reply(&["I like rain"]).reply(&["Fair enough"]),
        MockProvider::new("b").reply(&["I like sun"]),
    );
    let conversation = ConversationLoop::with_providers(providers, options("weather"));
    let mut conversation = stop_after(conversation, 3);

    conversation.run().await.unwrap();

    let view = |messages: &Vec<Message>| -> Vec<(Role, String)> {
        messages.iter().map(|m| (m.role, m.content.clone())).collect()
    };
    assert_eq!(
        view(&b.requests()[0]),
        vec![
            (Role::System, "be brief".to_string()),
            (Role::User, "Topic: weather\n\nI like rain".to_string()),
        ]
    );
    assert_eq!(
        view(&a.requests()[1]),
        vec![
            (Role::System, "be brief".to_string()),
            (Role::User, "Topic: weather".to_string()),
            (Role::Assistant, "I like rain".to_string()),
            (Role::User, "I like sun".to_string()),
        ]
    );
}

#[tokio::test]
async fn failed_turn_stops_without_retry() {
    let (a, b, providers) = pair(
        MockProvider::new("a").reply(&["opening"]),
        MockProvider::new("b").fail("connection reset"),
    );
    let mut conversation = ConversationLoop::with_providers(providers, options("x"));

    let state = conversation.run().await.unwrap();

    match state.stop_reason() {
        Some(StopReason::Failed {
            speaker,
            category,
            error,
        }) => {
            assert_eq!(*speaker, Speaker::Agent2);
            assert_eq!(*category, ErrorCategory::Protocol);
            assert_eq!(category.recovery_suggestion(), RecoverySuggestion::TryAnotherModel);
            assert!(error.contains("connection reset"), "{error}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(state.completed_turns, 1);
    assert_eq!(state.transcript.len(), 2);
    assert_eq!(a.requests().len(), 1);
    assert_eq!(b.requests().len(), 1);
    assert!(state.finished_at.is_some());
}

#[tokio::test]
async fn mid_stream_failure_discards_partial_reply() {
    let (_a, _b, providers) = pair(
        MockProvider::new("a").fail_mid_stream(&["Hel"], "stream closed"),
        MockProvider::new("b"),
    );
    let mut conversation = ConversationLoop::with_providers(providers, options("x"));

    let state = conversation.run().await.unwrap();

    assert!(matches!(
        state.stop_reason(),
        Some(StopReason::Failed { speaker: Speaker::Agent1, .. })
    ));
    assert_eq!(state.completed_turns, 0);
    assert_eq!(state.transcript.len(), 1);
    assert!(state.partial.is_empty());
}

#[tokio::test]
async fn blank_reply_is_a_failed_turn() {
    let (_a, _b, providers) = pair(
        MockProvider::new("quiet-model").reply(&[" ", "\n"]),
        MockProvider::new("b"),
    );
    let mut conversation = ConversationLoop::with_providers(providers, options("x"));

    let state = conversation.run().await.unwrap();

    match state.stop_reason() {
        Some(StopReason::Failed { error, .. }) => {
            assert_eq!(error, "Agent 1 (quiet-model) returned an empty response");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(state.transcript.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn time_limit_is_checked_between_turns() {
    let (_a, _b, providers) = pair(
        MockProvider::new("a").with_delay(Duration::from_secs(3)),
        MockProvider::new("b").with_delay(Duration::from_secs(3)),
    );
    let options = ConversationOptions::builder()
        .topic("slow")
        .time_limit(Duration::from_secs(5))
        .build();
    let mut conversation = ConversationLoop::with_providers(providers, options);

    let state = conversation.run().await.unwrap();

    // Turn 2 starts at 3s and runs past the 5s limit to completion.
    assert_eq!(state.status, ConversationStatus::Stopped(StopReason::TimeLimit));
    assert_eq!(state.completed_turns, 2);
    assert_eq!(state.time_limit_secs, Some(5));
}

#[tokio::test(start_paused = true)]
async fn sub_second_time_limit_is_not_recorded_as_zero() {
    let (_a, _b, providers) = pair(
        MockProvider::new("a").with_delay(Duration::from_secs(1)),
        MockProvider::new("b"),
    );
    let options = ConversationOptions::builder()
        .topic("quick")
        .time_limit(Duration::from_millis(500))
        .build();
    let mut conversation = ConversationLoop::with_providers(providers, options);

    let state = conversation.run().await.unwrap();

    assert_eq!(state.time_limit_secs, Some(1));
    assert_eq!(state.stop_reason(), Some(&StopReason::TimeLimit));
    assert_eq!(state.completed_turns, 1);
}

#[tokio::test]
async fn zero_time_limit_runs_no_turns() {
    let (a, _b, providers) = pair(MockProvider::new("a"), MockProvider::new("b"));
    let options = ConversationOptions::builder()
        .topic("x")
        .time_limit(Duration::ZERO)
        .build();
    let mut conversation = ConversationLoop::with_providers(providers, options);

    let state = conversation.run().await.unwrap();

    assert_eq!(state.stop_reason(), Some(&StopReason::TimeLimit));
    assert_eq!(state.transcript.len(), 1);
    assert!(a.requests().is_empty());
}

#[tokio::test]
async fn stop_during_stream_lets_turn_finish() {
    let (_a, b, providers) = pair(
        MockProvider::new("a").reply(&["first ", "second"]),
        MockProvider::new("b"),
    );
    let conversation = ConversationLoop::with_providers(providers, options("x"));
    let stop = conversation.stop_handle();
    let mut conversation = conversation.with_event_sink(Arc::new(move |event| {
        if matches!(event, ConversationEvent::Delta { .. }) {
            stop.stop();
        }
    }));

    let state = conversation.run().await.unwrap();

    assert_eq!(state.stop_reason(), Some(&StopReason::Manual));
    assert_eq!(state.transcript.len(), 2);
    assert_eq!(state.transcript[1].content, "first second");
    assert!(b.requests().is_empty());
}

#[tokio::test]
async fn stop_before_run_wins_over_time_limit() {
    let (a, _b, providers) = pair(MockProvider::new("a"), MockProvider::new("b"));
    let options = ConversationOptions::builder()
        .topic("x")
        .time_limit(Duration::ZERO)
        .build();
    let mut conversation = ConversationLoop::with_providers(providers, options);
    conversation.stop_handle().stop();

    let state = conversation.run().await.unwrap();

    assert_eq!(state.stop_reason(), Some(&StopReason::Manual));
    assert!(a.requests().is_empty());
}

#[tokio::test]
async fn subscribers_see_final_snapshot_and_second_run_is_rejected() {
    let (_a, _b, providers) = pair(MockProvider::new("a"), MockProvider::new("b").fail("down"));
    let mut conversation = ConversationLoop::with_providers(providers, options("x"));
    let watcher = conversation.subscribe();
    assert_eq!(watcher.borrow().status, ConversationStatus::Idle);
    assert!(watcher.borrow().transcript.is_empty());

    let state = conversation.run().await.unwrap();
    {
        let snapshot = watcher.borrow();
        assert!(!snapshot.is_running());
        assert_eq!(snapshot.transcript, state.transcript);
        assert_eq!(snapshot.models, ["a".to_string(), "b".to_string()]);
    }

    let err = conversation.run().await.unwrap_err();
    assert!(matches!(err, DuologueError::InvalidState(_)));
    assert_eq!(conversation.state().transcript, state.transcript);
}
