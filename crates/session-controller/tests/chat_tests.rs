//! Chat adapter tests against the fake engine.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::time::Duration;

use engine_test_utils::FakeEngine;
use rtc_engine::types::{ConnectionState, ParticipantIdentity};
use session_controller::{ControllerConfig, MediaError, SessionController};

fn controller(engine: &FakeEngine) -> SessionController {
    SessionController::new(
        engine.session.clone(),
        engine.devices.clone(),
        engine.recorder.clone(),
        ControllerConfig::default(),
    )
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_send_publishes_json_and_echoes_locally() {
    let engine = FakeEngine::connected();
    let controller = controller(&engine);

    let message = controller.send_chat("hello room").await.unwrap();
    assert!(message.is_local);
    assert_eq!(message.body, "hello room");
    assert_eq!(message.sender_name, "you");

    let sent = engine.session.fake_local().sent_data();
    assert_eq!(sent.len(), 1);
    let payload = sent.into_iter().next().unwrap();
    assert_eq!(payload.topic, "chat");
    assert!(payload.reliable);
    let wire: serde_json::Value = serde_json::from_slice(&payload.data).unwrap();
    assert_eq!(wire["name"], "you");
    assert_eq!(wire["body"], "hello room");

    // the echo is in the transcript without waiting on the network
    let transcript = controller.chat_messages();
    assert_eq!(transcript.len(), 1);
    assert!(transcript.first().unwrap().is_local);
}

#[tokio::test(start_paused = true)]
async fn test_inbound_messages_are_appended() {
    let engine = FakeEngine::connected();
    let controller = controller(&engine);

    engine.session.inject_data(
        "chat",
        serde_json::json!({ "name": "Alice", "body": "hi there" })
            .to_string()
            .into_bytes(),
        Some(ParticipantIdentity::from("alice")),
        Some("Alice".to_string()),
    );
    settle().await;

    let transcript = controller.chat_messages();
    assert_eq!(transcript.len(), 1);
    let message = transcript.into_iter().next().unwrap();
    assert!(!message.is_local);
    assert_eq!(message.sender_name, "Alice");
    assert_eq!(message.body, "hi there");
    assert_eq!(message.sender, Some(ParticipantIdentity::from("alice")));
}

#[tokio::test(start_paused = true)]
async fn test_other_topics_are_ignored() {
    let engine = FakeEngine::connected();
    let controller = controller(&engine);

    engine.session.inject_data(
        "reactions",
        &b"{\"name\":\"Alice\",\"body\":\"wave\"}"[..],
        Some(ParticipantIdentity::from("alice")),
        None,
    );
    settle().await;
    assert!(controller.chat_messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_echoed_own_packets_are_not_duplicated() {
    let engine = FakeEngine::connected();
    let controller = controller(&engine);

    controller.send_chat("only once").await.unwrap();
    // the engine reflects the reliable payload back at us
    engine.session.inject_data(
        "chat",
        serde_json::json!({ "name": "you", "body": "only once" })
            .to_string()
            .into_bytes(),
        Some(ParticipantIdentity::from("local-1")),
        Some("you".to_string()),
    );
    settle().await;

    assert_eq!(controller.chat_messages().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_falls_back_to_raw_text() {
    let engine = FakeEngine::connected();
    let controller = controller(&engine);

    engine.session.inject_data(
        "chat",
        &b"plain text from an old client"[..],
        Some(ParticipantIdentity::from("alice")),
        Some("Alice".to_string()),
    );
    settle().await;

    let transcript = controller.chat_messages();
    assert_eq!(transcript.len(), 1);
    let message = transcript.into_iter().next().unwrap();
    assert_eq!(message.body, "plain text from an old client");
    assert_eq!(message.sender_name, "Alice");
}

#[tokio::test(start_paused = true)]
async fn test_transcript_ids_are_strictly_increasing() {
    let engine = FakeEngine::connected();
    let controller = controller(&engine);

    controller.send_chat("one").await.unwrap();
    engine.session.inject_data(
        "chat",
        serde_json::json!({ "name": "Alice", "body": "two" })
            .to_string()
            .into_bytes(),
        Some(ParticipantIdentity::from("alice")),
        None,
    );
    settle().await;
    controller.send_chat("three").await.unwrap();

    let ids: Vec<u64> = controller.chat_messages().iter().map(|m| m.id).collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test(start_paused = true)]
async fn test_send_failure_leaves_no_echo() {
    let engine = FakeEngine::connected();
    let controller = controller(&engine);
    engine.session.fake_local().fail_publish_data(true);

    let err = controller.send_chat("lost").await.unwrap_err();
    assert!(matches!(err, MediaError::ChannelSend(_)));
    assert!(controller.chat_messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_send_requires_connection() {
    let engine = FakeEngine::connected();
    let controller = controller(&engine);
    engine
        .session
        .set_connection_state(ConnectionState::Disconnected);

    let err = controller.send_chat("too late").await.unwrap_err();
    assert!(matches!(err, MediaError::NotConnected));
}
