//! Controller configuration.
//!
//! All knobs are read from `HUDDLE_`-prefixed environment variables with
//! defaults matching the product's capture profile: 720p camera, 1080p
//! screen capture with audio, 2.5 Mbps recording bitrate, one-second
//! recorder chunks, and the "chat" data-channel topic.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use rtc_engine::capture::VideoConstraints;
use thiserror::Error;

const DEFAULT_CAMERA_WIDTH: u32 = 1280;
const DEFAULT_CAMERA_HEIGHT: u32 = 720;
const DEFAULT_SCREEN_WIDTH: u32 = 1920;
const DEFAULT_SCREEN_HEIGHT: u32 = 1080;
const DEFAULT_SCREEN_AUDIO: bool = true;
const DEFAULT_VIDEO_BITRATE_BPS: u32 = 2_500_000;
const DEFAULT_CHUNK_INTERVAL_MS: u64 = 1_000;
const DEFAULT_CHAT_TOPIC: &str = "chat";

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was present but failed to parse.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// The environment variable name.
        key: String,
        /// The rejected value.
        value: String,
    },
}

/// Runtime configuration for the session controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Capture constraints for the local camera.
    pub camera: VideoConstraints,
    /// Capture constraints for screen capture.
    pub screen: VideoConstraints,
    /// Whether to request system audio alongside screen capture.
    pub screen_audio: bool,
    /// Target video bitrate for recordings, in bits per second.
    pub video_bitrate_bps: u32,
    /// How often the recorder emits a chunk while recording.
    pub chunk_interval: Duration,
    /// Data-channel topic used for chat payloads.
    pub chat_topic: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            camera: VideoConstraints {
                width: DEFAULT_CAMERA_WIDTH,
                height: DEFAULT_CAMERA_HEIGHT,
            },
            screen: VideoConstraints {
                width: DEFAULT_SCREEN_WIDTH,
                height: DEFAULT_SCREEN_HEIGHT,
            },
            screen_audio: DEFAULT_SCREEN_AUDIO,
            video_bitrate_bps: DEFAULT_VIDEO_BITRATE_BPS,
            chunk_interval: Duration::from_millis(DEFAULT_CHUNK_INTERVAL_MS),
            chat_topic: DEFAULT_CHAT_TOPIC.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from the given variable map.
    ///
    /// Missing keys fall back to defaults; present-but-invalid values are
    /// rejected rather than silently ignored.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            camera: VideoConstraints {
                width: parse_or(vars, "HUDDLE_CAMERA_WIDTH", defaults.camera.width)?,
                height: parse_or(vars, "HUDDLE_CAMERA_HEIGHT", defaults.camera.height)?,
            },
            screen: VideoConstraints {
                width: parse_or(vars, "HUDDLE_SCREEN_WIDTH", defaults.screen.width)?,
                height: parse_or(vars, "HUDDLE_SCREEN_HEIGHT", defaults.screen.height)?,
            },
            screen_audio: parse_or(vars, "HUDDLE_SCREEN_AUDIO", defaults.screen_audio)?,
            video_bitrate_bps: parse_or(
                vars,
                "HUDDLE_VIDEO_BITRATE_BPS",
                defaults.video_bitrate_bps,
            )?,
            chunk_interval: Duration::from_millis(parse_or(
                vars,
                "HUDDLE_CHUNK_INTERVAL_MS",
                DEFAULT_CHUNK_INTERVAL_MS,
            )?),
            chat_topic: vars
                .get("HUDDLE_CHAT_TOPIC")
                .cloned()
                .unwrap_or(defaults.chat_topic),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config.camera.height, 720);
        assert_eq!(config.screen.width, 1920);
        assert_eq!(config.screen.height, 1080);
        assert!(config.screen_audio);
        assert_eq!(config.video_bitrate_bps, 2_500_000);
        assert_eq!(config.chunk_interval, Duration::from_secs(1));
        assert_eq!(config.chat_topic, "chat");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<String, String> = [
            ("HUDDLE_CAMERA_WIDTH", "640"),
            ("HUDDLE_CAMERA_HEIGHT", "480"),
            ("HUDDLE_SCREEN_AUDIO", "false"),
            ("HUDDLE_VIDEO_BITRATE_BPS", "1000000"),
            ("HUDDLE_CHUNK_INTERVAL_MS", "250"),
            ("HUDDLE_CHAT_TOPIC", "room-chat"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = ControllerConfig::from_vars(&vars).unwrap();
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.camera.height, 480);
        assert!(!config.screen_audio);
        assert_eq!(config.video_bitrate_bps, 1_000_000);
        assert_eq!(config.chunk_interval, Duration::from_millis(250));
        assert_eq!(config.chat_topic, "room-chat");
    }

    #[test]
    fn test_invalid_value_rejected() {
        let vars: HashMap<String, String> =
            [("HUDDLE_CAMERA_HEIGHT".to_string(), "seven-twenty".to_string())]
                .into_iter()
                .collect();
        let err = ControllerConfig::from_vars(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "HUDDLE_CAMERA_HEIGHT"));
    }
}
