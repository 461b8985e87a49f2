//! # Engine Test Utilities
//!
//! Fake implementations of the `rtc-engine` boundary traits for isolated
//! controller testing without a real RTC engine, capture stack or encoder.
//!
//! ## Modules
//!
//! - [`track`] - `FakeMediaTrack` with mute/enable/stop state and
//!   out-of-band `fire_ended` triggering
//! - [`participant`] - fake local/remote participants and publications,
//!   with emitted lifecycle events
//! - [`session`] - `FakeSession` with settable connection state, roster
//!   management and data injection
//! - [`devices`] - `FakeMediaDevices` with scripted failure behavior and a
//!   post-acquisition hook for race testing
//! - [`recorder`] - `FakeRecorder`/`FakeRecorderHandle` with test-driven
//!   chunk emission and release tracking
//!
//! ## Usage
//!
//! ```rust,ignore
//! use engine_test_utils::FakeEngine;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let engine = FakeEngine::connected();
//!     engine.devices.set_behavior(DeviceBehavior::FailVideo);
//!     // drive the controller against engine.session / engine.devices ...
//! }
//! ```

pub mod devices;
pub mod participant;
pub mod recorder;
pub mod session;
pub mod track;

pub use devices::{DeviceBehavior, FakeMediaDevices};
pub use participant::{FakeLocalParticipant, FakePublication, FakeRemoteParticipant, SentData};
pub use recorder::{FakeRecorder, FakeRecorderHandle};
pub use session::FakeSession;
pub use track::FakeMediaTrack;

use rtc_engine::ConnectionState;
use std::sync::Arc;

/// Everything a controller test needs, wired together.
pub struct FakeEngine {
    pub session: Arc<FakeSession>,
    pub devices: Arc<FakeMediaDevices>,
    pub recorder: Arc<FakeRecorder>,
}

impl FakeEngine {
    /// A fake engine whose session is already connected, with a local
    /// participant named "you".
    pub fn connected() -> Self {
        let session = FakeSession::new("local-1", "you");
        session.set_connection_state(ConnectionState::Connected);
        let devices = Arc::new(FakeMediaDevices::new());
        let recorder = Arc::new(FakeRecorder::with_default_support());
        Self {
            session,
            devices,
            recorder,
        }
    }
}
