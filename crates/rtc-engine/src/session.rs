//! Session, participant, publication and track traits.
//!
//! The controller borrows a [`SessionHandle`] from the application shell.
//! Everything it learns about the room flows through these traits as live
//! queries; nothing here is cacheable across a suspension point.

use crate::errors::EngineError;
use crate::types::{
    ConnectionState, DataPublishOptions, EngineEvent, ParticipantIdentity, PublishOptions,
    TrackKind, TrackSid, TrackSource,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::broadcast;

/// One live media track, local or remote.
///
/// Remote tracks typically report `supports_mute() == false`; callers probe
/// before attempting the native mute path and fall back to
/// [`MediaTrack::set_enabled`] or a republish.
#[async_trait]
pub trait MediaTrack: Send + Sync {
    /// Media kind.
    fn kind(&self) -> TrackKind;

    /// Source category.
    fn source(&self) -> TrackSource;

    /// Current mute state.
    fn is_muted(&self) -> bool;

    /// Whether the track supports native mute/unmute.
    fn supports_mute(&self) -> bool;

    /// Mute the track at the capture level.
    async fn mute(&self) -> Result<(), EngineError>;

    /// Unmute the track at the capture level.
    async fn unmute(&self) -> Result<(), EngineError>;

    /// Software enable/disable; cheaper than a republish for hardware-level
    /// mute-capable tracks.
    fn set_enabled(&self, enabled: bool);

    /// Current software-enabled state.
    fn is_enabled(&self) -> bool;

    /// Stop the underlying capture and release the device handle.
    fn stop(&self);

    /// Whether the capture has been stopped/released.
    fn is_stopped(&self) -> bool;

    /// Register a callback for out-of-band termination (e.g. the user ends
    /// a screen share from the browser chrome). The callback may fire at
    /// most once.
    fn on_ended(&self, callback: Box<dyn Fn() + Send + Sync>);

    /// Downcast support. Engine adapters recover their concrete track type
    /// at the publish boundary.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// The engine's record that a track has been announced to the room.
#[async_trait]
pub trait TrackPublication: Send + Sync {
    /// Server-assigned track identifier.
    fn sid(&self) -> TrackSid;

    /// Media kind.
    fn kind(&self) -> TrackKind;

    /// Source category.
    fn source(&self) -> TrackSource;

    /// Mute state of the publication as the room sees it.
    fn is_muted(&self) -> bool;

    /// Whether the publication supports muting at the publication level.
    fn supports_set_muted(&self) -> bool;

    /// Mute or unmute at the publication level.
    async fn set_muted(&self, muted: bool) -> Result<(), EngineError>;

    /// The live track behind this publication, when available.
    fn track(&self) -> Option<Arc<dyn MediaTrack>>;
}

/// The local participant: the only roster entry the controller may mutate.
#[async_trait]
pub trait LocalParticipant: Send + Sync {
    /// Identity within the session.
    fn identity(&self) -> ParticipantIdentity;

    /// Display name.
    fn display_name(&self) -> String;

    /// Current publications, in publish order.
    fn publications(&self) -> Vec<Arc<dyn TrackPublication>>;

    /// Announce a track to the room.
    async fn publish_track(
        &self,
        track: Arc<dyn MediaTrack>,
        options: PublishOptions,
    ) -> Result<Arc<dyn TrackPublication>, EngineError>;

    /// Withdraw a previously announced track.
    async fn unpublish_track(&self, sid: &TrackSid) -> Result<(), EngineError>;

    /// Publish a payload on the generic data channel.
    async fn publish_data(
        &self,
        data: Bytes,
        options: DataPublishOptions,
    ) -> Result<(), EngineError>;
}

/// A remote roster entry; read-only from the controller's perspective.
pub trait RemoteParticipant: Send + Sync {
    /// Identity within the session.
    fn identity(&self) -> ParticipantIdentity;

    /// Display name.
    fn display_name(&self) -> String;

    /// Current publications, in publish order.
    fn publications(&self) -> Vec<Arc<dyn TrackPublication>>;
}

/// The connection to a meeting room.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Current connection state. Always a live query; callers re-check
    /// after every suspension point.
    fn connection_state(&self) -> ConnectionState;

    /// Handle to the local participant.
    fn local_participant(&self) -> Arc<dyn LocalParticipant>;

    /// Remote roster in join order.
    fn remote_participants(&self) -> Vec<Arc<dyn RemoteParticipant>>;

    /// Subscribe to engine lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;

    /// Disconnect from the room.
    async fn disconnect(&self);
}
