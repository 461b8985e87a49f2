//! The session controller facade.
//!
//! One `SessionController` per joined meeting. The shell constructs it
//! around a connected (or connecting) [`SessionHandle`] and drives every
//! user intent through it; it never touches the engine directly.

use std::sync::Arc;
use std::time::Duration;

use rtc_engine::capture::MediaDevices;
use rtc_engine::recorder::MediaRecorder;
use rtc_engine::session::SessionHandle;
use rtc_engine::types::ParticipantIdentity;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::chat::{ChatAdapter, ChatMessage};
use crate::config::ControllerConfig;
use crate::errors::MediaError;
use crate::publication::{JoinOutcome, PublicationManager, PublishState};
use crate::recording::{RecordingArtifact, RecordingComposer};
use crate::selector::{select_main_view, MainView, ViewSnapshot};
use crate::state_sync::{MediaState, StateSynchronizer};

/// Coordinates media publication, derived state, recording and chat for
/// one meeting session.
pub struct SessionController {
    session: Arc<dyn SessionHandle>,
    publications: PublicationManager,
    state_sync: StateSynchronizer,
    recording: RecordingComposer,
    chat: ChatAdapter,
    pinned: Option<ParticipantIdentity>,
    connected_at: Option<Instant>,
}

impl SessionController {
    /// Build a controller around the engine capabilities the shell binds.
    ///
    /// Spawns the state-sync and chat listeners immediately; both stop
    /// when the controller is dropped or [`SessionController::leave`]
    /// runs.
    #[must_use]
    pub fn new(
        session: Arc<dyn SessionHandle>,
        devices: Arc<dyn MediaDevices>,
        recorder: Arc<dyn MediaRecorder>,
        config: ControllerConfig,
    ) -> Self {
        let state_sync = StateSynchronizer::spawn(session.clone());
        let chat = ChatAdapter::spawn(session.clone(), config.chat_topic.clone());
        let publications = PublicationManager::new(session.clone(), devices, config.clone());
        let recording = RecordingComposer::new(session.clone(), recorder, config);
        Self {
            session,
            publications,
            state_sync,
            recording,
            chat,
            pinned: None,
            connected_at: None,
        }
    }

    /// React to the session reaching `Connected`: start the meeting
    /// clock and run the initial publish flow.
    ///
    /// Device failures degrade the join instead of failing it; they come
    /// back as warnings inside the outcome. An `Err` here is an engine
    /// fault, and the shell may still keep the user in the room.
    pub async fn handle_connected(&mut self) -> Result<JoinOutcome, MediaError> {
        if self.connected_at.is_none() {
            self.connected_at = Some(Instant::now());
        }
        let outcome = self.publications.ensure_published().await?;
        match &outcome {
            JoinOutcome::Published => info!(target: "controller", "joined with audio and video"),
            JoinOutcome::AudioOnly { warning } => {
                warn!(target: "controller", warning = %warning, "joined audio-only")
            }
            JoinOutcome::NoMedia { warning } => {
                warn!(target: "controller", warning = %warning, "joined without media")
            }
            JoinOutcome::AlreadyPublished | JoinOutcome::Aborted => {}
        }
        Ok(outcome)
    }

    /// Toggle the microphone.
    pub async fn toggle_microphone(&mut self) -> Result<(), MediaError> {
        self.publications.toggle_microphone().await
    }

    /// Toggle the camera.
    pub async fn toggle_camera(&mut self) -> Result<(), MediaError> {
        self.publications.toggle_camera().await
    }

    /// Toggle screen sharing. Returns whether a share is live afterwards.
    pub async fn toggle_screen_share(&mut self) -> Result<bool, MediaError> {
        self.publications.toggle_screen_share().await
    }

    /// The derived media state, as the room currently sees it.
    #[must_use]
    pub fn media_state(&self) -> MediaState {
        self.state_sync.current()
    }

    /// A receiver the shell can await media-state changes on.
    #[must_use]
    pub fn watch_media_state(&self) -> watch::Receiver<MediaState> {
        self.state_sync.watch()
    }

    /// Microphone publish lifecycle state.
    #[must_use]
    pub fn microphone_state(&self) -> PublishState {
        self.publications.microphone_state()
    }

    /// Camera publish lifecycle state.
    #[must_use]
    pub fn camera_state(&self) -> PublishState {
        self.publications.camera_state()
    }

    /// The feed (or placeholder) to show prominently right now.
    #[must_use]
    pub fn main_view(&self) -> MainView {
        let snapshot = ViewSnapshot::capture(
            self.session.as_ref(),
            self.pinned.clone(),
            self.publications.publish_in_flight(),
        );
        select_main_view(&snapshot)
    }

    /// Pin a participant's camera to the main view.
    pub fn set_pinned(&mut self, participant: ParticipantIdentity) {
        self.pinned = Some(participant);
    }

    /// Clear the pin.
    pub fn clear_pin(&mut self) {
        self.pinned = None;
    }

    /// The currently pinned participant, if any.
    #[must_use]
    pub fn pinned(&self) -> Option<&ParticipantIdentity> {
        self.pinned.as_ref()
    }

    /// Everyone in the room, the local participant included.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.session.remote_participants().len() + 1
    }

    /// Time since the session first reached `Connected`.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.connected_at
            .map_or(Duration::ZERO, |start| start.elapsed())
    }

    /// Start recording the current main view plus all audio.
    pub async fn start_recording(&mut self) -> Result<(), MediaError> {
        self.recording
            .start(self.pinned.as_ref(), self.publications.publish_in_flight())
            .await
    }

    /// Stop recording and assemble the artifact.
    pub async fn stop_recording(&mut self) -> Result<RecordingArtifact, MediaError> {
        self.recording.stop().await
    }

    /// Whether a recording run is in progress.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording.is_recording()
    }

    /// The artifact from the most recently stopped recording.
    #[must_use]
    pub fn last_recording(&self) -> Option<&RecordingArtifact> {
        self.recording.last_artifact()
    }

    /// Send a chat message.
    pub async fn send_chat(&self, body: &str) -> Result<ChatMessage, MediaError> {
        self.chat.send(body).await
    }

    /// The chat transcript so far.
    #[must_use]
    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        self.chat.messages()
    }

    /// Leave the meeting: stop any recording, release capture handles,
    /// stop the listeners, then disconnect. Strictly in that order, so no
    /// listener observes the disconnect it caused and the recorder
    /// flushes while its source tracks are still live.
    pub async fn leave(&mut self) {
        if self.recording.is_recording() {
            match self.recording.stop().await {
                Ok(artifact) => info!(
                    target: "controller",
                    file = %artifact.file_name,
                    "recording saved on leave"
                ),
                Err(err) => warn!(target: "controller", error = %err, "recording lost on leave"),
            }
        }
        self.publications.release_all();
        self.state_sync.shutdown();
        self.chat.shutdown();
        self.session.disconnect().await;
        self.connected_at = None;
        info!(target: "controller", "left meeting");
    }
}
