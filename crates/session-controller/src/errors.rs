//! Error types for the session controller.
//!
//! Every fallible operation on the controller surfaces a [`MediaError`].
//! The enum separates device-level failures (permissions, missing
//! hardware, unsatisfiable constraints) from engine-level failures
//! (publish, data channel, recorder) so callers can decide which are
//! recoverable. [`MediaError::user_message`] maps each variant to a
//! short notice suitable for display in the meeting shell.

use rtc_engine::errors::{DeviceError, DeviceErrorKind, EngineError};
use thiserror::Error;

/// Failures surfaced by session-controller operations.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The user denied access to the camera or microphone.
    #[error("media permission denied: {0}")]
    PermissionDenied(String),

    /// No capture device of the requested kind exists.
    #[error("capture device not found: {0}")]
    DeviceNotFound(String),

    /// A device exists but cannot satisfy the requested constraints.
    #[error("capture constraints not satisfiable: {0}")]
    DeviceConstraint(String),

    /// The operation requires a connected session.
    #[error("session is not connected")]
    NotConnected,

    /// No supported encoder configuration could be negotiated.
    #[error("encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// Recording was requested but no live track could be composed.
    #[error("no media available to record")]
    NoMediaAvailable,

    /// Recording was requested while a recording is already in progress.
    #[error("a recording is already in progress")]
    AlreadyRecording,

    /// The recorder failed after it had started producing output.
    #[error("recorder runtime failure: {0}")]
    RecorderRuntime(String),

    /// A chat payload could not be delivered to the data channel.
    #[error("chat send failed: {0}")]
    ChannelSend(String),

    /// Anything the controller cannot classify further.
    #[error("media operation failed: {0}")]
    Unknown(String),
}

impl MediaError {
    /// Stable identifier for the failure kind, used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::DeviceNotFound(_) => "device_not_found",
            Self::DeviceConstraint(_) => "device_constraint",
            Self::NotConnected => "not_connected",
            Self::EncoderUnavailable(_) => "encoder_unavailable",
            Self::NoMediaAvailable => "no_media_available",
            Self::AlreadyRecording => "already_recording",
            Self::RecorderRuntime(_) => "recorder_runtime",
            Self::ChannelSend(_) => "channel_send",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Short, non-technical notice for the meeting shell.
    ///
    /// Each message names what went wrong; internal detail stays in the
    /// `Display` output and the logs.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => {
                "Permission to use your camera or microphone was denied. \
                 Allow access in your browser settings and try again."
            }
            Self::DeviceNotFound(_) => {
                "No camera or microphone was found. Connect a device and try again."
            }
            Self::DeviceConstraint(_) => {
                "Your device does not support the requested capture settings."
            }
            Self::NotConnected => "You are not connected to the meeting.",
            Self::EncoderUnavailable(_) => {
                "Recording is not supported in this browser."
            }
            Self::NoMediaAvailable => {
                "There is no audio or video to record right now."
            }
            Self::AlreadyRecording => "A recording is already in progress.",
            Self::RecorderRuntime(_) => {
                "Recording stopped because of an internal error. \
                 A partial recording may have been saved."
            }
            Self::ChannelSend(_) => "Your chat message could not be sent.",
            Self::Unknown(_) => "Something went wrong with your media devices.",
        }
    }

    /// Whether the join flow may continue after this failure.
    ///
    /// Device-level failures degrade the join (audio-only or no media)
    /// instead of blocking room entry.
    #[must_use]
    pub fn is_device_failure(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::DeviceNotFound(_) | Self::DeviceConstraint(_)
        )
    }
}

impl From<DeviceError> for MediaError {
    fn from(err: DeviceError) -> Self {
        match err.kind {
            DeviceErrorKind::PermissionDenied => Self::PermissionDenied(err.message),
            DeviceErrorKind::NotFound => Self::DeviceNotFound(err.message),
            DeviceErrorKind::ConstraintNotSatisfied => Self::DeviceConstraint(err.message),
            DeviceErrorKind::Other => Self::Unknown(err.message),
        }
    }
}

impl From<EngineError> for MediaError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotConnected => Self::NotConnected,
            EngineError::EncoderUnavailable(msg) => Self::EncoderUnavailable(msg),
            EngineError::RecorderRuntime(msg) => Self::RecorderRuntime(msg),
            EngineError::DataChannel(msg) => Self::ChannelSend(msg),
            EngineError::Publish(msg) | EngineError::Unsupported(msg) => Self::Unknown(msg),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_map_by_kind() {
        let err: MediaError =
            DeviceError::new(DeviceErrorKind::PermissionDenied, "user dismissed prompt").into();
        assert!(matches!(err, MediaError::PermissionDenied(_)));
        assert!(err.is_device_failure());

        let err: MediaError = DeviceError::new(DeviceErrorKind::NotFound, "no camera").into();
        assert!(matches!(err, MediaError::DeviceNotFound(_)));

        let err: MediaError =
            DeviceError::new(DeviceErrorKind::ConstraintNotSatisfied, "720p unsupported").into();
        assert!(matches!(err, MediaError::DeviceConstraint(_)));

        let err: MediaError = DeviceError::new(DeviceErrorKind::Other, "aborted").into();
        assert!(matches!(err, MediaError::Unknown(_)));
        assert!(!err.is_device_failure());
    }

    #[test]
    fn engine_errors_map_to_controller_variants() {
        assert!(matches!(
            MediaError::from(EngineError::NotConnected),
            MediaError::NotConnected
        ));
        assert!(matches!(
            MediaError::from(EngineError::EncoderUnavailable("no webm".into())),
            MediaError::EncoderUnavailable(_)
        ));
        assert!(matches!(
            MediaError::from(EngineError::DataChannel("closed".into())),
            MediaError::ChannelSend(_)
        ));
    }

    #[test]
    fn every_variant_has_a_distinct_kind_and_message() {
        let variants = [
            MediaError::PermissionDenied(String::new()),
            MediaError::DeviceNotFound(String::new()),
            MediaError::DeviceConstraint(String::new()),
            MediaError::NotConnected,
            MediaError::EncoderUnavailable(String::new()),
            MediaError::NoMediaAvailable,
            MediaError::AlreadyRecording,
            MediaError::RecorderRuntime(String::new()),
            MediaError::ChannelSend(String::new()),
            MediaError::Unknown(String::new()),
        ];
        let mut kinds: Vec<&str> = variants.iter().map(MediaError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), variants.len());
        for v in &variants {
            assert!(!v.user_message().is_empty());
        }
    }
}
