//! Fake session.

use crate::participant::{FakeLocalParticipant, FakeRemoteParticipant};
use async_trait::async_trait;
use bytes::Bytes;
use rtc_engine::{
    ConnectionState, DataPacket, EngineEvent, LocalParticipant, ParticipantIdentity,
    RemoteParticipant, SessionHandle,
};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Buffer size for the fake event bus.
const EVENT_BUFFER: usize = 64;

/// Fake session with a settable connection state and a mutable roster.
pub struct FakeSession {
    state: Arc<Mutex<ConnectionState>>,
    local: Arc<FakeLocalParticipant>,
    remotes: Mutex<Vec<Arc<FakeRemoteParticipant>>>,
    events: broadcast::Sender<EngineEvent>,
}

impl FakeSession {
    /// A new session starting in `Connecting` state.
    pub fn new(local_identity: impl Into<String>, local_name: impl Into<String>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let state = Arc::new(Mutex::new(ConnectionState::Connecting));
        let local =
            FakeLocalParticipant::new(local_identity, local_name, state.clone(), events.clone());
        Arc::new(Self {
            state,
            local,
            remotes: Mutex::new(Vec::new()),
            events,
        })
    }

    /// Flip the connection state and emit the corresponding event.
    pub fn set_connection_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
        let _ = self
            .events
            .send(EngineEvent::ConnectionStateChanged(state));
    }

    /// The concrete local participant, for assertions.
    pub fn fake_local(&self) -> Arc<FakeLocalParticipant> {
        self.local.clone()
    }

    /// Add a remote participant to the roster.
    pub fn add_remote(
        &self,
        identity: impl Into<String>,
        name: impl Into<String>,
    ) -> Arc<FakeRemoteParticipant> {
        let remote = FakeRemoteParticipant::new(identity, name, self.events.clone());
        let id = RemoteParticipant::identity(remote.as_ref());
        self.remotes.lock().unwrap().push(remote.clone());
        let _ = self.events.send(EngineEvent::ParticipantJoined(id));
        remote
    }

    /// Inject an inbound data packet, as if a participant published it.
    pub fn inject_data(
        &self,
        topic: impl Into<String>,
        data: impl Into<Bytes>,
        sender: Option<ParticipantIdentity>,
        sender_name: Option<String>,
    ) {
        let _ = self.events.send(EngineEvent::DataReceived(DataPacket {
            topic: topic.into(),
            data: data.into(),
            sender,
            sender_name,
        }));
    }

    /// Raw access to the event bus, for emitting custom events.
    pub fn event_sender(&self) -> broadcast::Sender<EngineEvent> {
        self.events.clone()
    }
}

#[async_trait]
impl SessionHandle for FakeSession {
    fn connection_state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    fn local_participant(&self) -> Arc<dyn LocalParticipant> {
        self.local.clone()
    }

    fn remote_participants(&self) -> Vec<Arc<dyn RemoteParticipant>> {
        self.remotes
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.clone() as Arc<dyn RemoteParticipant>)
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    async fn disconnect(&self) {
        self.set_connection_state(ConnectionState::Disconnected);
    }
}
