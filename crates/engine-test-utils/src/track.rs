//! Fake media track.

use async_trait::async_trait;
use rtc_engine::{
    EngineError, EngineEvent, MediaTrack, ParticipantIdentity, TrackKind, TrackSid, TrackSource,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Binding installed when a track is published, so track-level mute
/// operations surface as engine events the way a real engine reports them.
struct PublishBinding {
    events: broadcast::Sender<EngineEvent>,
    participant: ParticipantIdentity,
    sid: TrackSid,
}

/// A fake capture track with controllable capabilities.
pub struct FakeMediaTrack {
    kind: TrackKind,
    source: TrackSource,
    supports_mute: bool,
    muted: AtomicBool,
    enabled: AtomicBool,
    stopped: AtomicBool,
    ended_callbacks: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,
    binding: Mutex<Option<PublishBinding>>,
}

impl FakeMediaTrack {
    pub fn new(source: TrackSource) -> Arc<Self> {
        Arc::new(Self {
            kind: source.kind(),
            source,
            supports_mute: true,
            muted: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            ended_callbacks: Mutex::new(Vec::new()),
            binding: Mutex::new(None),
        })
    }

    /// A track whose native mute capability is absent, forcing callers onto
    /// the software-disable or republish fallback paths.
    pub fn without_mute_support(source: TrackSource) -> Arc<Self> {
        Arc::new(Self {
            kind: source.kind(),
            source,
            supports_mute: false,
            muted: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            ended_callbacks: Mutex::new(Vec::new()),
            binding: Mutex::new(None),
        })
    }

    /// Install the publish-time event binding. Called by the fake
    /// participant when this track is published.
    pub(crate) fn bind(
        &self,
        events: broadcast::Sender<EngineEvent>,
        participant: ParticipantIdentity,
        sid: TrackSid,
    ) {
        *self.binding.lock().unwrap() = Some(PublishBinding {
            events,
            participant,
            sid,
        });
    }

    pub(crate) fn unbind(&self) {
        *self.binding.lock().unwrap() = None;
    }

    /// Force the muted flag without emitting events (publication-level
    /// mute path drives events itself).
    pub(crate) fn set_muted_silently(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    fn emit_mute_event(&self, muted: bool) {
        let binding = self.binding.lock().unwrap();
        if let Some(b) = binding.as_ref() {
            let event = if muted {
                EngineEvent::TrackMuted {
                    participant: b.participant.clone(),
                    sid: b.sid.clone(),
                }
            } else {
                EngineEvent::TrackUnmuted {
                    participant: b.participant.clone(),
                    sid: b.sid.clone(),
                }
            };
            let _ = b.events.send(event);
        }
    }

    /// Simulate out-of-band termination (the user stopping a screen share
    /// from the browser chrome). Stops the track and fires registered
    /// `on_ended` callbacks exactly once.
    pub fn fire_ended(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let callbacks = std::mem::take(&mut *self.ended_callbacks.lock().unwrap());
        for cb in callbacks {
            cb();
        }
    }
}

#[async_trait]
impl MediaTrack for FakeMediaTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn source(&self) -> TrackSource {
        self.source
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn supports_mute(&self) -> bool {
        self.supports_mute
    }

    async fn mute(&self) -> Result<(), EngineError> {
        if !self.supports_mute {
            return Err(EngineError::Unsupported("track mute".to_string()));
        }
        self.muted.store(true, Ordering::SeqCst);
        self.emit_mute_event(true);
        Ok(())
    }

    async fn unmute(&self) -> Result<(), EngineError> {
        if !self.supports_mute {
            return Err(EngineError::Unsupported("track unmute".to_string()));
        }
        self.muted.store(false, Ordering::SeqCst);
        self.emit_mute_event(false);
        Ok(())
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        // A software disable is observable as a publication mute.
        self.emit_mute_event(!enabled);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn on_ended(&self, callback: Box<dyn Fn() + Send + Sync>) {
        self.ended_callbacks.lock().unwrap().push(callback);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
