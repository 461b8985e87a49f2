//! Recording composer tests against the fake engine.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::sync::Arc;

use engine_test_utils::{FakeEngine, FakeRecorder};
use rtc_engine::recorder::RecorderHandle;
use rtc_engine::types::{ConnectionState, TrackKind, TrackSource};
use session_controller::{ControllerConfig, MediaError, SessionController};

fn controller(engine: &FakeEngine) -> SessionController {
    SessionController::new(
        engine.session.clone(),
        engine.devices.clone(),
        engine.recorder.clone(),
        ControllerConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_recording_requires_media() {
    let engine = FakeEngine::connected();
    let mut controller = controller(&engine);

    let err = controller.start_recording().await.unwrap_err();
    assert!(matches!(err, MediaError::NoMediaAvailable));
    assert!(!controller.is_recording());
    // no encoder run was allocated
    assert!(engine.recorder.last_handle().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_recording_requires_connection() {
    let engine = FakeEngine::connected();
    let mut controller = controller(&engine);
    controller.handle_connected().await.unwrap();
    engine
        .session
        .set_connection_state(ConnectionState::Reconnecting);

    let err = controller.start_recording().await.unwrap_err();
    assert!(matches!(err, MediaError::NotConnected));
}

#[tokio::test(start_paused = true)]
async fn test_double_start_is_rejected() {
    let engine = FakeEngine::connected();
    let mut controller = controller(&engine);
    controller.handle_connected().await.unwrap();

    controller.start_recording().await.unwrap();
    let err = controller.start_recording().await.unwrap_err();
    assert!(matches!(err, MediaError::AlreadyRecording));
    assert!(controller.is_recording());
}

#[tokio::test(start_paused = true)]
async fn test_codec_negotiation_prefers_vp9() {
    let engine = FakeEngine::connected();
    let mut controller = controller(&engine);
    controller.handle_connected().await.unwrap();

    controller.start_recording().await.unwrap();
    let handle = engine.recorder.last_handle().unwrap();
    assert_eq!(
        handle.options().mime_type.as_deref(),
        Some("video/webm;codecs=vp9,opus")
    );
    assert_eq!(handle.options().video_bitrate_bps, 2_500_000);
    assert_eq!(
        handle.options().chunk_interval,
        std::time::Duration::from_secs(1)
    );
}

#[tokio::test(start_paused = true)]
async fn test_codec_negotiation_walks_the_ladder() {
    let engine = FakeEngine::connected();
    let vp8_only = Arc::new(FakeRecorder::supporting(&["video/webm;codecs=vp8,opus"]));
    let mut controller = SessionController::new(
        engine.session.clone(),
        engine.devices.clone(),
        vp8_only.clone(),
        ControllerConfig::default(),
    );
    controller.handle_connected().await.unwrap();

    controller.start_recording().await.unwrap();
    let handle = vp8_only.last_handle().unwrap();
    assert_eq!(
        handle.options().mime_type.as_deref(),
        Some("video/webm;codecs=vp8,opus")
    );
}

#[tokio::test(start_paused = true)]
async fn test_codec_negotiation_falls_back_to_engine_default() {
    let engine = FakeEngine::connected();
    let unsupported = Arc::new(FakeRecorder::supporting(&[]));
    let mut controller = SessionController::new(
        engine.session.clone(),
        engine.devices.clone(),
        unsupported.clone(),
        ControllerConfig::default(),
    );
    controller.handle_connected().await.unwrap();

    controller.start_recording().await.unwrap();
    let handle = unsupported.last_handle().unwrap();
    assert_eq!(handle.options().mime_type, None);

    let handle2 = unsupported.last_handle().unwrap();
    handle2.push_chunk(&b"x"[..]);
    let artifact = controller.stop_recording().await.unwrap();
    assert_eq!(artifact.mime_type, "video/webm");
}

#[tokio::test(start_paused = true)]
async fn test_composite_includes_main_view_and_all_audio() {
    let engine = FakeEngine::connected();
    let mut controller = controller(&engine);
    controller.handle_connected().await.unwrap();

    let alice = engine.session.add_remote("alice", "Alice");
    alice.add_track(TrackSource::Microphone);

    controller.start_recording().await.unwrap();
    let handle = engine.recorder.last_handle().unwrap();
    let stream = handle.stream();
    // the selected camera feed plus the local and remote microphones
    assert_eq!(stream.count_of(TrackKind::Video), 1);
    assert_eq!(stream.count_of(TrackKind::Audio), 2);
}

#[tokio::test(start_paused = true)]
async fn test_screen_share_is_recorded_as_main_view() {
    let engine = FakeEngine::connected();
    let mut controller = controller(&engine);
    controller.handle_connected().await.unwrap();
    controller.toggle_screen_share().await.unwrap();

    controller.start_recording().await.unwrap();
    let handle = engine.recorder.last_handle().unwrap();
    let stream = handle.stream();
    let video_sources: Vec<TrackSource> = stream
        .tracks()
        .iter()
        .filter(|t| t.kind() == TrackKind::Video)
        .map(|t| t.source())
        .collect();
    assert_eq!(video_sources, vec![TrackSource::ScreenShare]);
    // microphone plus the captured system audio
    assert_eq!(stream.count_of(TrackKind::Audio), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_assembles_chunks_in_order() {
    let engine = FakeEngine::connected();
    let mut controller = controller(&engine);
    controller.handle_connected().await.unwrap();

    controller.start_recording().await.unwrap();
    let handle = engine.recorder.last_handle().unwrap();
    handle.push_chunk(&b"first-"[..]);
    handle.push_chunk(&b"second-"[..]);
    handle.push_chunk(&b"third"[..]);

    let artifact = controller.stop_recording().await.unwrap();
    assert_eq!(&artifact.data[..], b"first-second-third");
    assert_eq!(artifact.mime_type, "video/webm;codecs=vp9,opus");
    assert!(artifact.file_name.starts_with("meeting-recording-"));
    assert!(artifact.file_name.ends_with(".webm"));
    assert!(handle.is_released());
    assert!(!controller.is_recording());
    assert_eq!(controller.last_recording().unwrap().id, artifact.id);
}

#[tokio::test(start_paused = true)]
async fn test_runtime_failure_preserves_partial_artifact() {
    let engine = FakeEngine::connected();
    let mut controller = controller(&engine);
    controller.handle_connected().await.unwrap();

    controller.start_recording().await.unwrap();
    let handle = engine.recorder.last_handle().unwrap();
    handle.push_chunk(&b"partial"[..]);
    handle.fail_runtime("camera unplugged");
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let artifact = controller.stop_recording().await.unwrap();
    assert_eq!(&artifact.data[..], b"partial");
    assert!(!controller.is_recording());
}

#[tokio::test(start_paused = true)]
async fn test_runtime_failure_with_no_chunks_is_an_error() {
    let engine = FakeEngine::connected();
    let mut controller = controller(&engine);
    controller.handle_connected().await.unwrap();

    controller.start_recording().await.unwrap();
    let handle = engine.recorder.last_handle().unwrap();
    handle.fail_runtime("encoder crashed");
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let err = controller.stop_recording().await.unwrap_err();
    assert!(matches!(err, MediaError::RecorderRuntime(_)));
    assert!(!controller.is_recording());
}

#[tokio::test(start_paused = true)]
async fn test_encoder_start_failure_surfaces() {
    let engine = FakeEngine::connected();
    let mut controller = controller(&engine);
    controller.handle_connected().await.unwrap();
    engine.recorder.fail_start(true);

    let err = controller.start_recording().await.unwrap_err();
    assert!(matches!(err, MediaError::EncoderUnavailable(_)));
    assert!(!controller.is_recording());
}

#[tokio::test(start_paused = true)]
async fn test_record_again_after_stop() {
    let engine = FakeEngine::connected();
    let mut controller = controller(&engine);
    controller.handle_connected().await.unwrap();

    controller.start_recording().await.unwrap();
    engine.recorder.last_handle().unwrap().push_chunk(&b"one"[..]);
    let first = controller.stop_recording().await.unwrap();

    controller.start_recording().await.unwrap();
    engine.recorder.last_handle().unwrap().push_chunk(&b"two"[..]);
    let second = controller.stop_recording().await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(&second.data[..], b"two");
}
