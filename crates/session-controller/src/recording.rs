//! Client-side recording.
//!
//! The composer assembles a composite stream from the live tracks (the
//! selected main video feed plus every available audio track), negotiates
//! a codec down a fixed preference ladder, and drains the encoder's
//! chunk stream into memory until stopped. A runtime encoder failure ends
//! the chunk stream early; whatever was collected is still assembled into
//! a partial artifact.

use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use rtc_engine::recorder::{CompositeStream, MediaRecorder, RecorderHandle, RecorderOptions};
use rtc_engine::session::{MediaTrack, SessionHandle};
use rtc_engine::types::{ParticipantIdentity, TrackKind, TrackSid};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ControllerConfig;
use crate::errors::MediaError;
use crate::selector::{select_main_view, MainView, ViewSnapshot};

/// Codec preference ladder, most specific first. The engine's default is
/// the last resort when nothing on the ladder is supported.
pub const CODEC_PREFERENCES: [&str; 3] = [
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
];

const DEFAULT_MIME: &str = "video/webm";

/// A finished (or partial) recording.
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    /// Stable identifier of the recording run.
    pub id: Uuid,
    /// Download file name, `meeting-recording-<timestamp>.webm`.
    pub file_name: String,
    /// MIME type of the encoded data.
    pub mime_type: String,
    /// The encoded recording, chunks concatenated in order.
    pub data: Bytes,
    /// When the recording stopped.
    pub recorded_at: DateTime<Utc>,
}

struct ActiveRecording {
    id: Uuid,
    handle: Arc<dyn RecorderHandle>,
    mime_type: String,
    chunks: Arc<Mutex<Vec<Bytes>>>,
    failure: Arc<Mutex<Option<String>>>,
    collector: JoinHandle<()>,
}

enum ComposerState {
    Idle,
    Recording(ActiveRecording),
}

/// Drives one recording run at a time against the encoder capability.
pub struct RecordingComposer {
    session: Arc<dyn SessionHandle>,
    recorder: Arc<dyn MediaRecorder>,
    config: ControllerConfig,
    state: ComposerState,
    last_artifact: Option<RecordingArtifact>,
}

impl RecordingComposer {
    #[must_use]
    pub fn new(
        session: Arc<dyn SessionHandle>,
        recorder: Arc<dyn MediaRecorder>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            session,
            recorder,
            config,
            state: ComposerState::Idle,
            last_artifact: None,
        }
    }

    /// Whether a recording run is in progress.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self.state, ComposerState::Recording(_))
    }

    /// Whether the in-progress run has hit a runtime encoder failure.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        match &self.state {
            ComposerState::Idle => false,
            ComposerState::Recording(active) => match active.failure.lock() {
                Ok(failure) => failure.is_some(),
                Err(_) => true,
            },
        }
    }

    /// The artifact from the most recently stopped run.
    #[must_use]
    pub fn last_artifact(&self) -> Option<&RecordingArtifact> {
        self.last_artifact.as_ref()
    }

    /// Start a recording of the current main view plus all audio.
    pub async fn start(
        &mut self,
        pinned: Option<&ParticipantIdentity>,
        publish_in_flight: bool,
    ) -> Result<(), MediaError> {
        if self.is_recording() {
            return Err(MediaError::AlreadyRecording);
        }
        if !self.session.connection_state().is_connected() {
            return Err(MediaError::NotConnected);
        }

        let stream = self.assemble_composite(pinned, publish_in_flight);
        if stream.is_empty() {
            return Err(MediaError::NoMediaAvailable);
        }

        let mime_type = self.negotiate_mime();
        let options = RecorderOptions {
            mime_type: mime_type.clone(),
            video_bitrate_bps: self.config.video_bitrate_bps,
            chunk_interval: self.config.chunk_interval,
        };
        debug!(
            target: "controller.recording",
            ?stream,
            mime_type = mime_type.as_deref().unwrap_or("engine default"),
            "starting recorder"
        );

        let handle = self.recorder.start(stream, options).await?;
        let mut rx = handle
            .take_chunks()
            .ok_or_else(|| MediaError::Unknown("recorder chunk stream already taken".into()))?;

        let chunks = Arc::new(Mutex::new(Vec::new()));
        let failure = Arc::new(Mutex::new(None));
        let collector = tokio::spawn({
            let chunks = chunks.clone();
            let failure = failure.clone();
            async move {
                while let Some(item) = rx.recv().await {
                    match item {
                        Ok(chunk) => {
                            if let Ok(mut chunks) = chunks.lock() {
                                chunks.push(chunk);
                            }
                        }
                        Err(err) => {
                            warn!(target: "controller.recording", error = %err, "recorder runtime failure");
                            if let Ok(mut failure) = failure.lock() {
                                *failure = Some(err.to_string());
                            }
                        }
                    }
                }
            }
        });

        let id = Uuid::new_v4();
        info!(target: "controller.recording", recording_id = %id, "recording started");
        self.state = ComposerState::Recording(ActiveRecording {
            id,
            handle,
            mime_type: mime_type.unwrap_or_else(|| DEFAULT_MIME.to_string()),
            chunks,
            failure,
            collector,
        });
        Ok(())
    }

    /// Stop the current run, flush the encoder, and assemble the artifact.
    ///
    /// A run that failed at runtime still yields its partial artifact as
    /// long as at least one chunk was collected.
    pub async fn stop(&mut self) -> Result<RecordingArtifact, MediaError> {
        let ComposerState::Recording(active) =
            std::mem::replace(&mut self.state, ComposerState::Idle)
        else {
            return Err(MediaError::Unknown(
                "stop requested with no recording in progress".into(),
            ));
        };

        if let Err(err) = active.handle.stop().await {
            warn!(target: "controller.recording", error = %err, "recorder stop reported an error");
        }
        // The chunk stream closes once the encoder flushes; the collector
        // exits after draining it.
        let _ = active.collector.await;

        let chunks = match active.chunks.lock() {
            Ok(mut chunks) => std::mem::take(&mut *chunks),
            Err(_) => Vec::new(),
        };
        let failure = match active.failure.lock() {
            Ok(mut failure) => failure.take(),
            Err(_) => None,
        };

        if chunks.is_empty() {
            if let Some(message) = failure {
                return Err(MediaError::RecorderRuntime(message));
            }
        }

        let mut data = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in &chunks {
            data.extend_from_slice(chunk);
        }

        let recorded_at = Utc::now();
        let artifact = RecordingArtifact {
            id: active.id,
            file_name: format!(
                "meeting-recording-{}.webm",
                recorded_at.format("%Y-%m-%dT%H-%M-%S-%3fZ")
            ),
            mime_type: active.mime_type,
            data: data.freeze(),
            recorded_at,
        };

        if let Some(message) = failure {
            warn!(
                target: "controller.recording",
                recording_id = %artifact.id,
                error = %message,
                bytes = artifact.data.len(),
                "recording ended by runtime failure, partial artifact assembled"
            );
        } else {
            info!(
                target: "controller.recording",
                recording_id = %artifact.id,
                bytes = artifact.data.len(),
                "recording stopped"
            );
        }

        self.last_artifact = Some(artifact.clone());
        Ok(artifact)
    }

    /// First supported entry of the preference ladder, or `None` for the
    /// engine default.
    fn negotiate_mime(&self) -> Option<String> {
        CODEC_PREFERENCES
            .iter()
            .find(|mime| self.recorder.is_type_supported(mime))
            .map(|mime| (*mime).to_string())
    }

    /// The selected main video feed plus every live audio track.
    fn assemble_composite(
        &self,
        pinned: Option<&ParticipantIdentity>,
        publish_in_flight: bool,
    ) -> CompositeStream {
        let mut stream = CompositeStream::new();

        let snapshot =
            ViewSnapshot::capture(self.session.as_ref(), pinned.cloned(), publish_in_flight);
        if let MainView::Feed(feed) = select_main_view(&snapshot) {
            if let Some(track) = self.find_track(&feed.sid) {
                stream.add_track(track);
            }
        }

        let local = self.session.local_participant();
        for publication in local.publications() {
            if publication.kind() == TrackKind::Audio {
                if let Some(track) = publication.track() {
                    stream.add_track(track);
                }
            }
        }
        for remote in self.session.remote_participants() {
            for publication in remote.publications() {
                if publication.kind() == TrackKind::Audio {
                    if let Some(track) = publication.track() {
                        stream.add_track(track);
                    }
                }
            }
        }

        stream
    }

    fn find_track(&self, sid: &TrackSid) -> Option<Arc<dyn MediaTrack>> {
        let local = self.session.local_participant();
        for publication in local.publications() {
            if &publication.sid() == sid {
                return publication.track();
            }
        }
        for remote in self.session.remote_participants() {
            for publication in remote.publications() {
                if &publication.sid() == sid {
                    return publication.track();
                }
            }
        }
        None
    }
}
