//! Track publication management.
//!
//! Owns the local participant's publish lifecycle: the initial
//! join-and-publish flow with graceful degradation, the mic/camera/screen
//! toggles with their capability fallback ladders, and release of capture
//! handles when tracks leave service.
//!
//! The connection state is re-validated after every suspension point.
//! Device acquisition can take arbitrarily long (permission prompts), and
//! publishing a track to a session that disconnected in the meantime
//! would leak the capture handle.

use std::sync::Arc;

use rtc_engine::capture::{CaptureConstraints, DisplayConstraints, MediaDevices};
use rtc_engine::errors::EngineError;
use rtc_engine::session::{LocalParticipant, MediaTrack, SessionHandle, TrackPublication};
use rtc_engine::types::{PublishOptions, TrackSource};
use tracing::{debug, warn};

use crate::config::ControllerConfig;
use crate::errors::MediaError;

/// Publish lifecycle of one media kind (microphone or camera).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    /// No publication exists and none is being created.
    Unpublished,
    /// Acquisition or publish is in flight.
    Publishing,
    /// Published and live.
    PublishedUnmuted,
    /// Published but muted.
    PublishedMuted,
    /// The last publish attempt failed.
    Failed,
}

/// External events that drive [`PublishState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishEvent {
    PublishStarted,
    PublishSucceeded { muted: bool },
    PublishFailed,
    Muted,
    Unmuted,
    Unpublished,
}

/// The single transition function for the publish state machine.
#[must_use]
pub fn transition(state: PublishState, event: PublishEvent) -> PublishState {
    match event {
        PublishEvent::PublishStarted => PublishState::Publishing,
        PublishEvent::PublishSucceeded { muted: true } => PublishState::PublishedMuted,
        PublishEvent::PublishSucceeded { muted: false } => PublishState::PublishedUnmuted,
        PublishEvent::PublishFailed => PublishState::Failed,
        PublishEvent::Unpublished => PublishState::Unpublished,
        PublishEvent::Muted => match state {
            PublishState::PublishedUnmuted => PublishState::PublishedMuted,
            other => other,
        },
        PublishEvent::Unmuted => match state {
            PublishState::PublishedMuted => PublishState::PublishedUnmuted,
            other => other,
        },
    }
}

/// Outcome of the initial join-and-publish flow.
#[derive(Debug)]
pub enum JoinOutcome {
    /// Microphone or camera publications already exist; nothing acquired.
    AlreadyPublished,
    /// Audio and video published.
    Published,
    /// Video acquisition failed; published audio only.
    AudioOnly {
        /// The device failure to surface as a dismissible notice.
        warning: MediaError,
    },
    /// Nothing could be acquired; joined without media.
    NoMedia {
        /// The device failure to surface as a dismissible notice.
        warning: MediaError,
    },
    /// The session left `Connected` mid-flow; acquired tracks were
    /// released and nothing was published.
    Aborted,
}

/// Manages the local participant's track publications.
pub struct PublicationManager {
    session: Arc<dyn SessionHandle>,
    devices: Arc<dyn MediaDevices>,
    config: ControllerConfig,
    mic_state: PublishState,
    cam_state: PublishState,
    /// Capture handles for a live screen share, released on stop.
    screen_tracks: Vec<Arc<dyn MediaTrack>>,
    join_in_flight: bool,
}

impl PublicationManager {
    #[must_use]
    pub fn new(
        session: Arc<dyn SessionHandle>,
        devices: Arc<dyn MediaDevices>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            session,
            devices,
            config,
            mic_state: PublishState::Unpublished,
            cam_state: PublishState::Unpublished,
            screen_tracks: Vec::new(),
            join_in_flight: false,
        }
    }

    /// Whether an initial publish is still in flight. The view selector
    /// uses this to distinguish "camera starting" from "no video".
    #[must_use]
    pub fn publish_in_flight(&self) -> bool {
        self.join_in_flight
            || self.mic_state == PublishState::Publishing
            || self.cam_state == PublishState::Publishing
    }

    /// Current microphone publish state.
    #[must_use]
    pub fn microphone_state(&self) -> PublishState {
        self.mic_state
    }

    /// Current camera publish state.
    #[must_use]
    pub fn camera_state(&self) -> PublishState {
        self.cam_state
    }

    /// The initial join flow: acquire microphone and camera, publish both,
    /// degrading to audio-only and then to no media on device failures.
    ///
    /// Device failures never propagate as errors; they degrade the join
    /// and come back as warnings inside the outcome. Only engine faults
    /// (and device failures the capture layer cannot classify) are `Err`.
    pub async fn ensure_published(&mut self) -> Result<JoinOutcome, MediaError> {
        if !self.session.connection_state().is_connected() {
            debug!(target: "controller.publication", "join flow skipped, session not connected");
            return Ok(JoinOutcome::Aborted);
        }

        let local = self.session.local_participant();
        let has_media = local
            .publications()
            .iter()
            .any(|p| !p.source().is_screen_share());
        if has_media {
            debug!(target: "controller.publication", "join flow skipped, media already published");
            return Ok(JoinOutcome::AlreadyPublished);
        }

        self.join_in_flight = true;
        let outcome = self.acquire_and_publish(&local).await;
        self.join_in_flight = false;
        outcome
    }

    async fn acquire_and_publish(
        &mut self,
        local: &Arc<dyn LocalParticipant>,
    ) -> Result<JoinOutcome, MediaError> {
        let constraints = CaptureConstraints {
            audio: true,
            video: Some(self.config.camera),
        };

        match self.devices.create_tracks(constraints).await {
            Ok(tracks) => {
                if self.publish_batch(local, tracks).await? {
                    Ok(JoinOutcome::Published)
                } else {
                    Ok(JoinOutcome::Aborted)
                }
            }
            Err(err) if err.is_recoverable() => {
                warn!(target: "controller.publication", error = %err, "audio+video acquisition failed, retrying audio-only");
                let warning = MediaError::from(err);
                match self.devices.create_tracks(CaptureConstraints::audio_only()).await {
                    Ok(tracks) => {
                        if self.publish_batch(local, tracks).await? {
                            Ok(JoinOutcome::AudioOnly { warning })
                        } else {
                            Ok(JoinOutcome::Aborted)
                        }
                    }
                    Err(err) => {
                        warn!(target: "controller.publication", error = %err, "audio-only acquisition failed, joining without media");
                        Ok(JoinOutcome::NoMedia {
                            warning: err.into(),
                        })
                    }
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Publish acquired tracks one by one, re-checking the connection
    /// before each publish. Returns `Ok(false)` when the session
    /// disconnected mid-flow; all tracks are stopped in that case.
    async fn publish_batch(
        &mut self,
        local: &Arc<dyn LocalParticipant>,
        tracks: Vec<Arc<dyn MediaTrack>>,
    ) -> Result<bool, MediaError> {
        for track in &tracks {
            self.apply(track.source(), PublishEvent::PublishStarted);
        }

        for (index, track) in tracks.iter().enumerate() {
            if !self.session.connection_state().is_connected() {
                warn!(target: "controller.publication", "session disconnected mid-publish, releasing tracks");
                release_tracks(&tracks);
                for t in &tracks {
                    self.apply(t.source(), PublishEvent::Unpublished);
                }
                return Ok(false);
            }

            let source = track.source();
            match local
                .publish_track(track.clone(), PublishOptions { source })
                .await
            {
                Ok(_) => {
                    debug!(target: "controller.publication", %source, "track published");
                    self.apply(source, PublishEvent::PublishSucceeded { muted: false });
                }
                Err(EngineError::NotConnected) => {
                    warn!(target: "controller.publication", %source, "publish raced a disconnect, releasing tracks");
                    release_tracks(&tracks);
                    for t in &tracks {
                        self.apply(t.source(), PublishEvent::Unpublished);
                    }
                    return Ok(false);
                }
                Err(err) => {
                    for t in tracks.iter().skip(index) {
                        t.stop();
                    }
                    self.apply(source, PublishEvent::PublishFailed);
                    return Err(err.into());
                }
            }
        }

        Ok(true)
    }

    /// Toggle the microphone.
    ///
    /// With an existing publication the fallback ladder is:
    /// publication-level `set_muted`, then track-level mute, then
    /// unpublish (republishing on unmute, accepting the brief track
    /// identity change). With no publication, acquire and publish fresh.
    pub async fn toggle_microphone(&mut self) -> Result<(), MediaError> {
        self.ensure_connected()?;
        let local = self.session.local_participant();
        let existing = local
            .publications()
            .into_iter()
            .find(|p| p.source() == TrackSource::Microphone);

        let Some(publication) = existing else {
            return self.publish_fresh(&local, TrackSource::Microphone).await;
        };

        let mute = !publication.is_muted();

        if publication.supports_set_muted() {
            publication.set_muted(mute).await?;
            self.apply_mute(TrackSource::Microphone, mute);
            return Ok(());
        }

        if let Some(track) = publication.track() {
            if track.supports_mute() {
                if mute {
                    track.mute().await?;
                } else {
                    track.unmute().await?;
                }
                self.apply_mute(TrackSource::Microphone, mute);
                return Ok(());
            }
        }

        debug!(target: "controller.publication", "no mute capability on microphone, falling back to republish");
        let sid = publication.sid();
        if let Some(track) = publication.track() {
            track.stop();
        }
        local.unpublish_track(&sid).await?;
        self.apply(TrackSource::Microphone, PublishEvent::Unpublished);

        if mute {
            Ok(())
        } else {
            self.publish_fresh(&local, TrackSource::Microphone).await
        }
    }

    /// Toggle the camera.
    ///
    /// With a live track the fallback ladder is: track-level mute, then
    /// software disable. A publication with no live track gets
    /// unpublished, with a fresh republish when turning on.
    pub async fn toggle_camera(&mut self) -> Result<(), MediaError> {
        self.ensure_connected()?;
        let local = self.session.local_participant();
        let existing = local
            .publications()
            .into_iter()
            .find(|p| p.source() == TrackSource::Camera);

        let Some(publication) = existing else {
            return self.publish_fresh(&local, TrackSource::Camera).await;
        };

        let mute = !publication.is_muted();

        match publication.track() {
            Some(track) if !track.is_stopped() => {
                if track.supports_mute() {
                    if mute {
                        track.mute().await?;
                    } else {
                        track.unmute().await?;
                    }
                } else {
                    track.set_enabled(!mute);
                }
                self.apply_mute(TrackSource::Camera, mute);
                Ok(())
            }
            _ => {
                debug!(target: "controller.publication", "no live camera track behind publication, republishing");
                local.unpublish_track(&publication.sid()).await?;
                self.apply(TrackSource::Camera, PublishEvent::Unpublished);
                if mute {
                    Ok(())
                } else {
                    self.publish_fresh(&local, TrackSource::Camera).await
                }
            }
        }
    }

    /// Toggle screen sharing. Returns whether a share is live afterwards.
    ///
    /// Starting a share publishes the display video track plus a system
    /// audio track when the platform provides one, and registers an
    /// out-of-band end handler: stopping the share from the browser
    /// chrome unpublishes and releases everything without a toggle call.
    pub async fn toggle_screen_share(&mut self) -> Result<bool, MediaError> {
        self.ensure_connected()?;
        let local = self.session.local_participant();
        let shares: Vec<_> = local
            .publications()
            .into_iter()
            .filter(|p| p.source().is_screen_share())
            .collect();

        if !shares.is_empty() {
            self.stop_screen_share(&local, shares).await?;
            return Ok(false);
        }

        let constraints = DisplayConstraints {
            video: self.config.screen,
            audio: self.config.screen_audio,
        };
        let tracks = self.devices.create_display_tracks(constraints).await?;

        if !self.session.connection_state().is_connected() {
            warn!(target: "controller.publication", "session disconnected during display capture, releasing tracks");
            release_tracks(&tracks);
            return Err(MediaError::NotConnected);
        }

        let mut published_sids = Vec::new();
        for track in &tracks {
            let source = track.source();
            match local
                .publish_track(track.clone(), PublishOptions { source })
                .await
            {
                Ok(publication) => published_sids.push(publication.sid()),
                Err(err) => {
                    release_tracks(&tracks);
                    for sid in &published_sids {
                        let _ = local.unpublish_track(sid).await;
                    }
                    return Err(err.into());
                }
            }
        }

        if let Some(video) = tracks.iter().find(|t| t.source() == TrackSource::ScreenShare) {
            let session = self.session.clone();
            let sids = published_sids.clone();
            let captured = tracks.clone();
            // The ended callback can fire from outside the runtime, so
            // capture a handle here rather than relying on tokio::spawn.
            let runtime = tokio::runtime::Handle::current();
            video.on_ended(Box::new(move || {
                debug!(target: "controller.publication", "screen share ended out of band, cleaning up");
                let session = session.clone();
                let sids = sids.clone();
                let captured = captured.clone();
                runtime.spawn(async move {
                    release_tracks(&captured);
                    if session.connection_state().is_connected() {
                        let local = session.local_participant();
                        for sid in &sids {
                            let _ = local.unpublish_track(sid).await;
                        }
                    }
                });
            }));
        }

        self.screen_tracks = tracks;
        debug!(target: "controller.publication", count = published_sids.len(), "screen share started");
        Ok(true)
    }

    async fn stop_screen_share(
        &mut self,
        local: &Arc<dyn LocalParticipant>,
        shares: Vec<Arc<dyn TrackPublication>>,
    ) -> Result<(), MediaError> {
        // Stop every capture handle before reporting any unpublish error;
        // an engine failure must not leave the screen capturing.
        let mut first_error = None;
        for publication in shares {
            if let Some(track) = publication.track() {
                track.stop();
            }
            if let Err(err) = local.unpublish_track(&publication.sid()).await {
                warn!(
                    target: "controller.publication",
                    sid = %publication.sid(),
                    error = %err,
                    "failed to unpublish screen share"
                );
                first_error.get_or_insert(err);
            }
        }
        for track in self.screen_tracks.drain(..) {
            track.stop();
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => {
                debug!(target: "controller.publication", "screen share stopped");
                Ok(())
            }
        }
    }

    /// Stop every local capture handle. Called during ordered teardown;
    /// the engine drops the publications when the session disconnects,
    /// but the device handles are ours to release.
    pub fn release_all(&mut self) {
        let local = self.session.local_participant();
        for publication in local.publications() {
            if let Some(track) = publication.track() {
                track.stop();
            }
        }
        for track in self.screen_tracks.drain(..) {
            track.stop();
        }
        self.mic_state = PublishState::Unpublished;
        self.cam_state = PublishState::Unpublished;
    }

    /// Acquire a single fresh track for `source` and publish it unmuted.
    async fn publish_fresh(
        &mut self,
        local: &Arc<dyn LocalParticipant>,
        source: TrackSource,
    ) -> Result<(), MediaError> {
        let constraints = match source {
            TrackSource::Microphone => CaptureConstraints::audio_only(),
            TrackSource::Camera => CaptureConstraints {
                audio: false,
                video: Some(self.config.camera),
            },
            other => {
                return Err(MediaError::Unknown(format!(
                    "cannot acquire {other} through device capture"
                )))
            }
        };

        self.apply(source, PublishEvent::PublishStarted);

        let tracks = match self.devices.create_tracks(constraints).await {
            Ok(tracks) => tracks,
            Err(err) => {
                self.apply(source, PublishEvent::PublishFailed);
                return Err(err.into());
            }
        };

        if !self.session.connection_state().is_connected() {
            warn!(target: "controller.publication", %source, "session disconnected during acquisition, releasing track");
            release_tracks(&tracks);
            self.apply(source, PublishEvent::Unpublished);
            return Err(MediaError::NotConnected);
        }

        let Some(track) = tracks.iter().find(|t| t.source() == source).cloned() else {
            release_tracks(&tracks);
            self.apply(source, PublishEvent::PublishFailed);
            return Err(MediaError::Unknown(format!(
                "device capture produced no {source} track"
            )));
        };
        for extra in tracks.iter().filter(|t| t.source() != source) {
            extra.stop();
        }

        match local
            .publish_track(track.clone(), PublishOptions { source })
            .await
        {
            Ok(_) => {
                debug!(target: "controller.publication", %source, "track published");
                self.apply(source, PublishEvent::PublishSucceeded { muted: false });
                Ok(())
            }
            Err(EngineError::NotConnected) => {
                track.stop();
                self.apply(source, PublishEvent::Unpublished);
                Err(MediaError::NotConnected)
            }
            Err(err) => {
                track.stop();
                self.apply(source, PublishEvent::PublishFailed);
                Err(err.into())
            }
        }
    }

    fn ensure_connected(&self) -> Result<(), MediaError> {
        if self.session.connection_state().is_connected() {
            Ok(())
        } else {
            Err(MediaError::NotConnected)
        }
    }

    fn apply(&mut self, source: TrackSource, event: PublishEvent) {
        match source {
            TrackSource::Microphone => self.mic_state = transition(self.mic_state, event),
            TrackSource::Camera => self.cam_state = transition(self.cam_state, event),
            _ => {}
        }
    }

    fn apply_mute(&mut self, source: TrackSource, muted: bool) {
        let event = if muted {
            PublishEvent::Muted
        } else {
            PublishEvent::Unmuted
        };
        self.apply(source, event);
    }
}

fn release_tracks(tracks: &[Arc<dyn MediaTrack>]) {
    for track in tracks {
        track.stop();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_lifecycle_transitions() {
        let s = PublishState::Unpublished;
        let s = transition(s, PublishEvent::PublishStarted);
        assert_eq!(s, PublishState::Publishing);
        let s = transition(s, PublishEvent::PublishSucceeded { muted: false });
        assert_eq!(s, PublishState::PublishedUnmuted);
        let s = transition(s, PublishEvent::Muted);
        assert_eq!(s, PublishState::PublishedMuted);
        let s = transition(s, PublishEvent::Unmuted);
        assert_eq!(s, PublishState::PublishedUnmuted);
        let s = transition(s, PublishEvent::Unpublished);
        assert_eq!(s, PublishState::Unpublished);
    }

    #[test]
    fn test_failed_publish_transitions() {
        let s = transition(PublishState::Publishing, PublishEvent::PublishFailed);
        assert_eq!(s, PublishState::Failed);
        // a failed kind can be retried
        let s = transition(s, PublishEvent::PublishStarted);
        assert_eq!(s, PublishState::Publishing);
    }

    #[test]
    fn test_mute_events_ignored_outside_published_states() {
        assert_eq!(
            transition(PublishState::Unpublished, PublishEvent::Muted),
            PublishState::Unpublished
        );
        assert_eq!(
            transition(PublishState::Publishing, PublishEvent::Unmuted),
            PublishState::Publishing
        );
    }
}
