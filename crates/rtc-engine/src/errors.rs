//! Errors surfaced across the engine boundary.
//!
//! Device acquisition and engine operations fail for reasons the controller
//! must distinguish: a denied permission is recoverable and must not block
//! room entry, while publishing to a disconnected session is a programming
//! error on the caller's side.

use thiserror::Error;

/// Classification of a device-acquisition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    /// The user (or platform policy) denied access to the device.
    PermissionDenied,
    /// No matching capture device exists.
    NotFound,
    /// A device exists but cannot satisfy the requested constraints.
    ConstraintNotSatisfied,
    /// Anything else the capture layer reports.
    Other,
}

/// A device-acquisition failure.
#[derive(Debug, Clone, Error)]
#[error("device error ({kind:?}): {message}")]
pub struct DeviceError {
    /// Failure classification.
    pub kind: DeviceErrorKind,
    /// Engine-provided detail, for logs.
    pub message: String,
}

impl DeviceError {
    /// Construct a device error.
    #[must_use]
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether the failure is device-related and worth an audio-only retry,
    /// as opposed to a hard engine fault.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            DeviceErrorKind::PermissionDenied
                | DeviceErrorKind::NotFound
                | DeviceErrorKind::ConstraintNotSatisfied
        )
    }
}

/// Failures reported by the engine for session-level operations.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Operation attempted while the session is not connected.
    #[error("session is not connected")]
    NotConnected,

    /// A publish or unpublish call failed.
    #[error("publish error: {0}")]
    Publish(String),

    /// A data-channel send failed.
    #[error("data channel error: {0}")]
    DataChannel(String),

    /// No encoder is available for the requested configuration.
    #[error("encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// The encoder failed while running (e.g. a source track was torn down
    /// mid-capture).
    #[error("recorder runtime error: {0}")]
    RecorderRuntime(String),

    /// The requested operation is not supported by this track or
    /// publication.
    #[error("operation unsupported: {0}")]
    Unsupported(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_recoverability() {
        assert!(DeviceError::new(DeviceErrorKind::PermissionDenied, "denied").is_recoverable());
        assert!(DeviceError::new(DeviceErrorKind::NotFound, "no camera").is_recoverable());
        assert!(
            DeviceError::new(DeviceErrorKind::ConstraintNotSatisfied, "720p").is_recoverable()
        );
        assert!(!DeviceError::new(DeviceErrorKind::Other, "boom").is_recoverable());
    }

    #[test]
    fn test_display_formatting() {
        let err = DeviceError::new(DeviceErrorKind::NotFound, "no camera attached");
        assert_eq!(
            err.to_string(),
            "device error (NotFound): no camera attached"
        );
        assert_eq!(EngineError::NotConnected.to_string(), "session is not connected");
    }
}
