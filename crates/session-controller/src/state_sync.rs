//! Derived media state.
//!
//! The booleans the meeting shell renders (mic on, camera on, screen share
//! on) are never set directly by user actions. They are recomputed from
//! the local participant's publication list whenever the engine reports a
//! publication change, so the shell can only ever display what the room
//! actually sees. During a republish two publications of one category may
//! transiently coexist; recomputing from the full list keeps the derived
//! state honest through that window.

use std::sync::Arc;

use rtc_engine::session::{LocalParticipant, SessionHandle};
use rtc_engine::types::{EngineEvent, TrackSource};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::subscription::SubscriptionGuard;

/// What the local participant is currently sending, as the room sees it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaState {
    /// An unmuted microphone publication exists.
    pub mic_on: bool,
    /// An unmuted camera publication exists.
    pub cam_on: bool,
    /// A screen-share publication exists.
    pub screen_share_on: bool,
}

/// Recompute [`MediaState`] from the publication list.
#[must_use]
pub fn derive_media_state(local: &dyn LocalParticipant) -> MediaState {
    let publications = local.publications();
    MediaState {
        mic_on: publications
            .iter()
            .any(|p| p.source() == TrackSource::Microphone && !p.is_muted()),
        cam_on: publications
            .iter()
            .any(|p| p.source() == TrackSource::Camera && !p.is_muted()),
        screen_share_on: publications
            .iter()
            .any(|p| p.source() == TrackSource::ScreenShare),
    }
}

/// Keeps a [`watch`] channel of [`MediaState`] in sync with engine events.
#[derive(Debug)]
pub struct StateSynchronizer {
    rx: watch::Receiver<MediaState>,
    guard: SubscriptionGuard,
}

impl StateSynchronizer {
    /// Spawn the listener and seed the channel from the current
    /// publication list.
    #[must_use]
    pub fn spawn(session: Arc<dyn SessionHandle>) -> Self {
        let local = session.local_participant();
        let local_identity = local.identity();
        let (tx, rx) = watch::channel(derive_media_state(local.as_ref()));
        let mut events = session.subscribe();
        let token = CancellationToken::new();

        let task = tokio::spawn({
            let token = token.clone();
            async move {
                loop {
                    tokio::select! {
                        () = token.cancelled() => break,
                        event = events.recv() => match event {
                            Ok(
                                EngineEvent::TrackPublished { participant, .. }
                                | EngineEvent::TrackUnpublished { participant, .. }
                                | EngineEvent::TrackMuted { participant, .. }
                                | EngineEvent::TrackUnmuted { participant, .. },
                            ) if participant == local_identity => {
                                let state = derive_media_state(local.as_ref());
                                trace!(target: "controller.state", ?state, "recomputed media state");
                                // send_if_modified keeps watch wakeups to
                                // actual changes
                                tx.send_if_modified(|current| {
                                    if *current == state {
                                        false
                                    } else {
                                        *current = state;
                                        true
                                    }
                                });
                            }
                            Ok(_) => {}
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                debug!(target: "controller.state", skipped, "event stream lagged, recomputing");
                                let state = derive_media_state(local.as_ref());
                                let _ = tx.send(state);
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        },
                    }
                }
            }
        });

        Self {
            rx,
            guard: SubscriptionGuard::new(token, task),
        }
    }

    /// A receiver the shell can await state changes on.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<MediaState> {
        self.rx.clone()
    }

    /// The most recently derived state.
    #[must_use]
    pub fn current(&self) -> MediaState {
        *self.rx.borrow()
    }

    /// Stop the listener ahead of session teardown.
    pub fn shutdown(&self) {
        self.guard.cancel();
    }
}
