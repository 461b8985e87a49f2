//! Fake device capture with scripted failure behavior.

use crate::track::FakeMediaTrack;
use async_trait::async_trait;
use rtc_engine::capture::{CaptureConstraints, DisplayConstraints};
use rtc_engine::{DeviceError, DeviceErrorKind, MediaDevices, MediaTrack, TrackSource};
use std::sync::{Arc, Mutex};

/// How the fake devices behave on acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceBehavior {
    /// Acquire whatever is requested.
    Normal,
    /// Fail any request that includes video; audio-only succeeds.
    FailVideo,
    /// Fail every request with `NotFound`.
    NoDevices,
    /// Fail every request with `PermissionDenied`.
    DenyPermission,
    /// Fail every request with `ConstraintNotSatisfied`.
    FailConstraints,
}

type PostCreateHook = Box<dyn Fn() + Send + Sync>;

/// Fake `MediaDevices` implementation.
///
/// The post-create hook runs after a successful acquisition and before the
/// tracks are returned; tests use it to flip session state mid-operation
/// and drive the controller's re-validation paths.
pub struct FakeMediaDevices {
    behavior: Mutex<DeviceBehavior>,
    post_create_hook: Mutex<Option<PostCreateHook>>,
    created: Mutex<Vec<Arc<FakeMediaTrack>>>,
    mute_capable_tracks: Mutex<bool>,
}

impl FakeMediaDevices {
    pub fn new() -> Self {
        Self {
            behavior: Mutex::new(DeviceBehavior::Normal),
            post_create_hook: Mutex::new(None),
            created: Mutex::new(Vec::new()),
            mute_capable_tracks: Mutex::new(true),
        }
    }

    pub fn set_behavior(&self, behavior: DeviceBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Produce tracks without native mute support from now on.
    pub fn set_mute_capable(&self, capable: bool) {
        *self.mute_capable_tracks.lock().unwrap() = capable;
    }

    /// Install a hook that runs after each successful acquisition.
    pub fn set_post_create_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.post_create_hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Every track this fake has handed out, for leak assertions.
    pub fn created_tracks(&self) -> Vec<Arc<FakeMediaTrack>> {
        self.created.lock().unwrap().clone()
    }

    fn make_track(&self, source: TrackSource) -> Arc<FakeMediaTrack> {
        let track = if *self.mute_capable_tracks.lock().unwrap() {
            FakeMediaTrack::new(source)
        } else {
            FakeMediaTrack::without_mute_support(source)
        };
        self.created.lock().unwrap().push(track.clone());
        track
    }

    fn check_behavior(&self, wants_video: bool) -> Result<(), DeviceError> {
        match *self.behavior.lock().unwrap() {
            DeviceBehavior::Normal => Ok(()),
            DeviceBehavior::FailVideo if wants_video => Err(DeviceError::new(
                DeviceErrorKind::NotFound,
                "no camera device",
            )),
            DeviceBehavior::FailVideo => Ok(()),
            DeviceBehavior::NoDevices => Err(DeviceError::new(
                DeviceErrorKind::NotFound,
                "no capture devices",
            )),
            DeviceBehavior::DenyPermission => Err(DeviceError::new(
                DeviceErrorKind::PermissionDenied,
                "user denied capture",
            )),
            DeviceBehavior::FailConstraints => Err(DeviceError::new(
                DeviceErrorKind::ConstraintNotSatisfied,
                "constraints not satisfiable",
            )),
        }
    }

    fn run_hook(&self) {
        if let Some(hook) = self.post_create_hook.lock().unwrap().as_ref() {
            hook();
        }
    }
}

impl Default for FakeMediaDevices {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDevices for FakeMediaDevices {
    async fn create_tracks(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Vec<Arc<dyn MediaTrack>>, DeviceError> {
        self.check_behavior(constraints.video.is_some())?;

        let mut tracks: Vec<Arc<dyn MediaTrack>> = Vec::new();
        if constraints.audio {
            tracks.push(self.make_track(TrackSource::Microphone));
        }
        if constraints.video.is_some() {
            tracks.push(self.make_track(TrackSource::Camera));
        }
        self.run_hook();
        Ok(tracks)
    }

    async fn create_display_tracks(
        &self,
        constraints: DisplayConstraints,
    ) -> Result<Vec<Arc<dyn MediaTrack>>, DeviceError> {
        self.check_behavior(true)?;

        let mut tracks: Vec<Arc<dyn MediaTrack>> =
            vec![self.make_track(TrackSource::ScreenShare)];
        if constraints.audio {
            tracks.push(self.make_track(TrackSource::ScreenShareAudio));
        }
        self.run_hook();
        Ok(tracks)
    }
}
