//! # Session Controller
//!
//! The local media-session controller for the Huddle meeting client. It
//! sits between the meeting shell (UI) and the `rtc-engine` boundary
//! traits and owns every stateful media concern of a joined meeting:
//!
//! - [`publication`] - publish/unpublish lifecycle for microphone, camera
//!   and screen share, with graceful degradation and fallback ladders
//! - [`state_sync`] - mic/camera/screen booleans derived from the
//!   publication list, never set directly by user actions
//! - [`selector`] - deterministic main-view selection
//! - [`recording`] - client-side composite recording with codec
//!   negotiation and chunked collection
//! - [`chat`] - chat over the session data channel with local echo
//! - [`controller`] - the [`SessionController`] facade the shell drives
//!
//! Everything engine-specific is injected through the `rtc-engine`
//! traits, so the whole crate tests against fakes.

pub mod chat;
pub mod config;
pub mod controller;
pub mod errors;
pub mod publication;
pub mod recording;
pub mod selector;
pub mod state_sync;
pub mod subscription;

pub use chat::{ChatAdapter, ChatMessage};
pub use config::{ConfigError, ControllerConfig};
pub use controller::SessionController;
pub use errors::MediaError;
pub use publication::{JoinOutcome, PublicationManager, PublishState};
pub use recording::{RecordingArtifact, RecordingComposer, CODEC_PREFERENCES};
pub use selector::{select_main_view, MainView, VideoFeed, ViewSnapshot};
pub use state_sync::{derive_media_state, MediaState, StateSynchronizer};
pub use subscription::SubscriptionGuard;
