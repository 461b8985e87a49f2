//! Device capture capability.
//!
//! Acquisition may suspend for an unbounded time (permission prompts,
//! hardware negotiation) and may fail with a [`DeviceError`] the controller
//! classifies for graceful degradation.

use crate::errors::DeviceError;
use crate::session::MediaTrack;
use async_trait::async_trait;
use std::sync::Arc;

/// Requested video geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
}

/// Constraints for microphone/camera acquisition.
#[derive(Debug, Clone, Copy)]
pub struct CaptureConstraints {
    /// Request a microphone track.
    pub audio: bool,
    /// Request a camera track with the given geometry.
    pub video: Option<VideoConstraints>,
}

impl CaptureConstraints {
    /// Audio-only constraints, the degraded-acquisition retry shape.
    #[must_use]
    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: None,
        }
    }
}

/// Constraints for display (screen-share) acquisition.
#[derive(Debug, Clone, Copy)]
pub struct DisplayConstraints {
    /// Requested capture geometry.
    pub video: VideoConstraints,
    /// Also capture system/tab audio when the platform offers it.
    pub audio: bool,
}

/// Capability that produces local capture tracks.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire microphone and/or camera tracks.
    ///
    /// Returns one track per requested kind, audio first when both are
    /// requested.
    async fn create_tracks(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Vec<Arc<dyn MediaTrack>>, DeviceError>;

    /// Acquire display-capture tracks: a video track, plus an audio track
    /// when requested and available.
    async fn create_display_tracks(
        &self,
        constraints: DisplayConstraints,
    ) -> Result<Vec<Arc<dyn MediaTrack>>, DeviceError>;
}
