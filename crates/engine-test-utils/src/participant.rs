//! Fake participants and publications.

use crate::track::FakeMediaTrack;
use async_trait::async_trait;
use bytes::Bytes;
use rtc_engine::{
    ConnectionState, DataPublishOptions, EngineError, EngineEvent, LocalParticipant, MediaTrack,
    ParticipantIdentity, PublishOptions, RemoteParticipant, TrackKind, TrackPublication, TrackSid,
    TrackSource,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// A record of one `publish_data` call, for test assertions.
#[derive(Debug, Clone)]
pub struct SentData {
    pub topic: String,
    pub reliable: bool,
    pub data: Bytes,
}

/// Fake publication wrapping a published track.
pub struct FakePublication {
    sid: TrackSid,
    source: TrackSource,
    track: Arc<dyn MediaTrack>,
    supports_set_muted: AtomicBool,
    events: broadcast::Sender<EngineEvent>,
    participant: ParticipantIdentity,
}

impl FakePublication {
    pub fn new(
        sid: TrackSid,
        source: TrackSource,
        track: Arc<dyn MediaTrack>,
        events: broadcast::Sender<EngineEvent>,
        participant: ParticipantIdentity,
    ) -> Arc<Self> {
        Arc::new(Self {
            sid,
            source,
            track,
            supports_set_muted: AtomicBool::new(true),
            events,
            participant,
        })
    }

    /// Disable the publication-level mute capability, forcing callers onto
    /// track-level fallbacks.
    pub fn disable_set_muted(&self) {
        self.supports_set_muted.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl TrackPublication for FakePublication {
    fn sid(&self) -> TrackSid {
        self.sid.clone()
    }

    fn kind(&self) -> TrackKind {
        self.source.kind()
    }

    fn source(&self) -> TrackSource {
        self.source
    }

    fn is_muted(&self) -> bool {
        self.track.is_muted() || !self.track.is_enabled()
    }

    fn supports_set_muted(&self) -> bool {
        self.supports_set_muted.load(Ordering::SeqCst)
    }

    async fn set_muted(&self, muted: bool) -> Result<(), EngineError> {
        if !self.supports_set_muted() {
            return Err(EngineError::Unsupported("publication set_muted".to_string()));
        }
        if let Some(fake) = self.track.as_any().downcast_ref::<FakeMediaTrack>() {
            fake.set_muted_silently(muted);
        }
        let event = if muted {
            EngineEvent::TrackMuted {
                participant: self.participant.clone(),
                sid: self.sid.clone(),
            }
        } else {
            EngineEvent::TrackUnmuted {
                participant: self.participant.clone(),
                sid: self.sid.clone(),
            }
        };
        let _ = self.events.send(event);
        Ok(())
    }

    fn track(&self) -> Option<Arc<dyn MediaTrack>> {
        Some(self.track.clone())
    }
}

/// Fake local participant with publish tracking and failure injection.
pub struct FakeLocalParticipant {
    identity: ParticipantIdentity,
    name: String,
    publications: Mutex<Vec<Arc<FakePublication>>>,
    connection_state: Arc<Mutex<ConnectionState>>,
    events: broadcast::Sender<EngineEvent>,
    next_sid: AtomicU64,
    data_sent: Mutex<Vec<SentData>>,
    fail_publish: AtomicBool,
    fail_publish_data: AtomicBool,
    fail_unpublish: AtomicBool,
}

impl FakeLocalParticipant {
    pub(crate) fn new(
        identity: impl Into<String>,
        name: impl Into<String>,
        connection_state: Arc<Mutex<ConnectionState>>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            identity: ParticipantIdentity(identity.into()),
            name: name.into(),
            publications: Mutex::new(Vec::new()),
            connection_state,
            events,
            next_sid: AtomicU64::new(1),
            data_sent: Mutex::new(Vec::new()),
            fail_publish: AtomicBool::new(false),
            fail_publish_data: AtomicBool::new(false),
            fail_unpublish: AtomicBool::new(false),
        })
    }

    /// Make every `publish_track` call fail.
    pub fn fail_next_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Make every `publish_data` call fail.
    pub fn fail_publish_data(&self, fail: bool) {
        self.fail_publish_data.store(fail, Ordering::SeqCst);
    }

    /// Make every `unpublish_track` call fail while leaving the
    /// publication in place.
    pub fn fail_unpublish_track(&self, fail: bool) {
        self.fail_unpublish.store(fail, Ordering::SeqCst);
    }

    /// Data payloads sent so far.
    pub fn sent_data(&self) -> Vec<SentData> {
        self.data_sent.lock().unwrap().clone()
    }

    /// Concrete publications, for assertions beyond the trait surface.
    pub fn fake_publications(&self) -> Vec<Arc<FakePublication>> {
        self.publications.lock().unwrap().clone()
    }

    fn is_connected(&self) -> bool {
        self.connection_state.lock().unwrap().is_connected()
    }
}

#[async_trait]
impl LocalParticipant for FakeLocalParticipant {
    fn identity(&self) -> ParticipantIdentity {
        self.identity.clone()
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn publications(&self) -> Vec<Arc<dyn TrackPublication>> {
        self.publications
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.clone() as Arc<dyn TrackPublication>)
            .collect()
    }

    async fn publish_track(
        &self,
        track: Arc<dyn MediaTrack>,
        options: PublishOptions,
    ) -> Result<Arc<dyn TrackPublication>, EngineError> {
        if !self.is_connected() {
            return Err(EngineError::NotConnected);
        }
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(EngineError::Publish("injected publish failure".to_string()));
        }

        let sid = TrackSid(format!("TR_{}", self.next_sid.fetch_add(1, Ordering::SeqCst)));

        // Bind the concrete track so its own mute operations emit events.
        if let Some(fake) = track.as_any().downcast_ref::<FakeMediaTrack>() {
            fake.bind(self.events.clone(), self.identity.clone(), sid.clone());
        }

        let publication = FakePublication::new(
            sid.clone(),
            options.source,
            track,
            self.events.clone(),
            self.identity.clone(),
        );
        self.publications.lock().unwrap().push(publication.clone());

        let _ = self.events.send(EngineEvent::TrackPublished {
            participant: self.identity.clone(),
            sid,
        });

        Ok(publication as Arc<dyn TrackPublication>)
    }

    async fn unpublish_track(&self, sid: &TrackSid) -> Result<(), EngineError> {
        if self.fail_unpublish.load(Ordering::SeqCst) {
            return Err(EngineError::Publish(
                "injected unpublish failure".to_string(),
            ));
        }

        let removed = {
            let mut pubs = self.publications.lock().unwrap();
            let position = pubs.iter().position(|p| &p.sid() == sid);
            position.map(|index| pubs.remove(index))
        };

        let Some(publication) = removed else {
            return Err(EngineError::Publish(format!("unknown track sid: {sid}")));
        };

        // Detach the binding so the track's later mute operations no longer
        // emit events for a publication that is gone.
        if let Some(fake) = publication
            .track
            .as_any()
            .downcast_ref::<FakeMediaTrack>()
        {
            fake.unbind();
        }

        let _ = self.events.send(EngineEvent::TrackUnpublished {
            participant: self.identity.clone(),
            sid: sid.clone(),
        });
        Ok(())
    }

    async fn publish_data(
        &self,
        data: Bytes,
        options: DataPublishOptions,
    ) -> Result<(), EngineError> {
        if !self.is_connected() {
            return Err(EngineError::NotConnected);
        }
        if self.fail_publish_data.load(Ordering::SeqCst) {
            return Err(EngineError::DataChannel("injected send failure".to_string()));
        }
        self.data_sent.lock().unwrap().push(SentData {
            topic: options.topic,
            reliable: options.reliable,
            data,
        });
        Ok(())
    }
}

/// Fake remote participant. Tests populate its publications directly.
pub struct FakeRemoteParticipant {
    identity: ParticipantIdentity,
    name: String,
    publications: Mutex<Vec<Arc<FakePublication>>>,
    events: broadcast::Sender<EngineEvent>,
    next_sid: AtomicU64,
}

impl FakeRemoteParticipant {
    pub(crate) fn new(
        identity: impl Into<String>,
        name: impl Into<String>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            identity: ParticipantIdentity(identity.into()),
            name: name.into(),
            publications: Mutex::new(Vec::new()),
            events,
            next_sid: AtomicU64::new(1),
        })
    }

    /// Add a published track to this remote participant and emit the
    /// corresponding lifecycle event.
    pub fn add_track(&self, source: TrackSource) -> Arc<FakePublication> {
        let track = FakeMediaTrack::without_mute_support(source);
        let sid = TrackSid(format!(
            "{}_TR_{}",
            self.identity,
            self.next_sid.fetch_add(1, Ordering::SeqCst)
        ));
        let publication = FakePublication::new(
            sid.clone(),
            source,
            track,
            self.events.clone(),
            self.identity.clone(),
        );
        self.publications.lock().unwrap().push(publication.clone());
        let _ = self.events.send(EngineEvent::TrackPublished {
            participant: self.identity.clone(),
            sid,
        });
        publication
    }
}

impl RemoteParticipant for FakeRemoteParticipant {
    fn identity(&self) -> ParticipantIdentity {
        self.identity.clone()
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn publications(&self) -> Vec<Arc<dyn TrackPublication>> {
        self.publications
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.clone() as Arc<dyn TrackPublication>)
            .collect()
    }
}
