//! Core types shared across the engine boundary.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of a session, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    /// Whether the session can currently carry publish/data operations.
    #[must_use]
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

/// Media kind of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Source category of a track.
///
/// At most one live non-screen-share track per kind exists at a time;
/// screen-share tracks are independent and may coexist with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackSource {
    Microphone,
    Camera,
    ScreenShare,
    ScreenShareAudio,
}

impl TrackSource {
    /// Whether this source belongs to a screen-share capture.
    #[must_use]
    pub fn is_screen_share(self) -> bool {
        matches!(
            self,
            TrackSource::ScreenShare | TrackSource::ScreenShareAudio
        )
    }

    /// The media kind this source produces.
    #[must_use]
    pub fn kind(self) -> TrackKind {
        match self {
            TrackSource::Microphone | TrackSource::ScreenShareAudio => TrackKind::Audio,
            TrackSource::Camera | TrackSource::ScreenShare => TrackKind::Video,
        }
    }
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackSource::Microphone => "microphone",
            TrackSource::Camera => "camera",
            TrackSource::ScreenShare => "screen_share",
            TrackSource::ScreenShareAudio => "screen_share_audio",
        };
        f.write_str(name)
    }
}

/// Opaque server-assigned track identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackSid(pub String);

impl fmt::Display for TrackSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackSid {
    fn from(s: &str) -> Self {
        TrackSid(s.to_string())
    }
}

/// Opaque participant identity within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantIdentity(pub String);

impl fmt::Display for ParticipantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantIdentity {
    fn from(s: &str) -> Self {
        ParticipantIdentity(s.to_string())
    }
}

/// Options supplied when publishing a track.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Source category to announce the track under.
    pub source: TrackSource,
}

/// Options supplied when publishing a data payload.
#[derive(Debug, Clone)]
pub struct DataPublishOptions {
    /// Topic namespace for the payload.
    pub topic: String,
    /// Request at-least-once delivery.
    pub reliable: bool,
}

/// An inbound data-channel packet.
#[derive(Debug, Clone)]
pub struct DataPacket {
    /// Topic the sender published under.
    pub topic: String,
    /// Raw payload bytes.
    pub data: Bytes,
    /// Identity of the sending participant, when known.
    pub sender: Option<ParticipantIdentity>,
    /// Display name of the sending participant, when known.
    pub sender_name: Option<String>,
}

/// Lifecycle notifications emitted by the engine.
///
/// Events identify which publication changed but deliberately carry no
/// state payload beyond identifiers: consumers are expected to re-query the
/// publication list, because multiple tracks of one category may transiently
/// coexist during a republish.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Session connection state changed.
    ConnectionStateChanged(ConnectionState),
    /// A participant announced a new track.
    TrackPublished {
        participant: ParticipantIdentity,
        sid: TrackSid,
    },
    /// A participant withdrew a track.
    TrackUnpublished {
        participant: ParticipantIdentity,
        sid: TrackSid,
    },
    /// A publication was muted.
    TrackMuted {
        participant: ParticipantIdentity,
        sid: TrackSid,
    },
    /// A publication was unmuted.
    TrackUnmuted {
        participant: ParticipantIdentity,
        sid: TrackSid,
    },
    /// A remote participant joined the roster.
    ParticipantJoined(ParticipantIdentity),
    /// A remote participant left the roster.
    ParticipantLeft(ParticipantIdentity),
    /// A data-channel payload arrived.
    DataReceived(DataPacket),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_is_connected() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Reconnecting.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(!ConnectionState::Failed.is_connected());
    }

    #[test]
    fn test_source_screen_share_classification() {
        assert!(TrackSource::ScreenShare.is_screen_share());
        assert!(TrackSource::ScreenShareAudio.is_screen_share());
        assert!(!TrackSource::Camera.is_screen_share());
        assert!(!TrackSource::Microphone.is_screen_share());
    }

    #[test]
    fn test_source_kind() {
        assert_eq!(TrackSource::Microphone.kind(), TrackKind::Audio);
        assert_eq!(TrackSource::ScreenShareAudio.kind(), TrackKind::Audio);
        assert_eq!(TrackSource::Camera.kind(), TrackKind::Video);
        assert_eq!(TrackSource::ScreenShare.kind(), TrackKind::Video);
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(TrackSource::Camera.to_string(), "camera");
        assert_eq!(TrackSid::from("TR_abc").to_string(), "TR_abc");
        assert_eq!(ParticipantIdentity::from("alice").to_string(), "alice");
    }
}
