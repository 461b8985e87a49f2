//! Engine boundary for the Huddle session controller.
//!
//! The controller never talks to a concrete RTC engine, browser capture API
//! or encoder directly. Everything it consumes from the outside world is
//! expressed here as a trait or a plain type:
//!
//! - [`session::SessionHandle`] - connection state, local participant,
//!   remote roster, event subscription, disconnect
//! - [`session::LocalParticipant`] - publish/unpublish tracks, publish data
//! - [`session::MediaTrack`] - one live audio/video track (local or remote)
//! - [`capture::MediaDevices`] - microphone/camera/display acquisition
//! - [`recorder::MediaRecorder`] - streaming encoder capability
//!
//! Implementations live elsewhere: a production build binds these to a real
//! engine, tests bind them to the fakes in `engine-test-utils`. This crate
//! carries no business logic of its own.

pub mod capture;
pub mod errors;
pub mod recorder;
pub mod session;
pub mod types;

pub use capture::MediaDevices;
pub use errors::{DeviceError, DeviceErrorKind, EngineError};
pub use recorder::{CompositeStream, MediaRecorder, RecorderHandle, RecorderOptions};
pub use session::{LocalParticipant, MediaTrack, RemoteParticipant, SessionHandle, TrackPublication};
pub use types::{
    ConnectionState, DataPacket, DataPublishOptions, EngineEvent, ParticipantIdentity,
    PublishOptions, TrackKind, TrackSid, TrackSource,
};
