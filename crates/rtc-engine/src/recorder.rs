//! Streaming encoder capability.
//!
//! The recorder consumes a [`CompositeStream`] assembled from live tracks
//! and emits encoded output in fixed-interval chunks so long recordings
//! stay memory-bounded and an interrupted session still yields a partial
//! artifact.

use crate::errors::EngineError;
use crate::session::MediaTrack;
use crate::types::TrackKind;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// A synthetic stream combining tracks from multiple sources for one
/// purpose (e.g. recording).
#[derive(Default, Clone)]
pub struct CompositeStream {
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl CompositeStream {
    /// An empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track to the composite.
    pub fn add_track(&mut self, track: Arc<dyn MediaTrack>) {
        self.tracks.push(track);
    }

    /// Tracks in insertion order.
    #[must_use]
    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    /// Whether the composite carries no tracks at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Total number of tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Number of tracks of the given kind.
    #[must_use]
    pub fn count_of(&self, kind: TrackKind) -> usize {
        self.tracks.iter().filter(|t| t.kind() == kind).count()
    }
}

impl std::fmt::Debug for CompositeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeStream")
            .field("audio_tracks", &self.count_of(TrackKind::Audio))
            .field("video_tracks", &self.count_of(TrackKind::Video))
            .finish()
    }
}

/// Encoder configuration for one recording run.
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    /// Negotiated MIME type; `None` lets the engine pick its default.
    pub mime_type: Option<String>,
    /// Target video bitrate in bits per second.
    pub video_bitrate_bps: u32,
    /// Cadence at which encoded chunks are emitted.
    pub chunk_interval: Duration,
}

/// Capability that encodes a composite stream into chunked output.
#[async_trait]
pub trait MediaRecorder: Send + Sync {
    /// Probe whether the encoder supports a MIME type / codec pairing.
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Start encoding. The returned handle owns the encoder run and any
    /// stream resources acquired for it.
    async fn start(
        &self,
        stream: CompositeStream,
        options: RecorderOptions,
    ) -> Result<Arc<dyn RecorderHandle>, EngineError>;
}

/// Handle to one in-progress encoder run.
#[async_trait]
pub trait RecorderHandle: Send + Sync {
    /// Take the chunk stream. Yields encoded chunks at the configured
    /// cadence; an `Err` item signals a runtime failure (e.g. a source
    /// device disconnected mid-capture), after which the stream ends.
    /// Returns `None` if the stream was already taken.
    fn take_chunks(&self) -> Option<mpsc::Receiver<Result<Bytes, EngineError>>>;

    /// Stop encoding: flush pending output through the chunk stream, close
    /// it, and release every resource this run acquired.
    async fn stop(&self) -> Result<(), EngineError>;

    /// Whether this run's resources have been released.
    fn is_released(&self) -> bool;
}
