//! Configuration management for the waysight client

pub mod file;

use std::time::Duration;

use crate::{Error, Result};

/// Default base URL of the analysis service
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default snapshot endpoint of the network camera
pub const DEFAULT_SNAPSHOT_URL: &str = "http://localhost:8080/shot.jpg";

/// Default live-mode sampling interval, sized for worst-case service latency
pub const DEFAULT_LIVE_INTERVAL_SECS: u64 = 5;

/// Output languages the analysis service can speak
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "hi", "fr", "es", "de", "zh"];

/// Waysight client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the analysis/transcription service
    pub api_url: String,

    /// Output language code
    pub language: String,

    /// Camera configuration
    pub camera: CameraConfig,

    /// Voice input configuration
    pub voice: VoiceConfig,

    /// Audio playback configuration
    pub playback: PlaybackConfig,
}

/// Camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Snapshot endpoint of the network camera
    pub snapshot_url: String,

    /// Live-mode sampling interval
    pub live_interval: Duration,
}

/// Voice input configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable microphone input
    pub enabled: bool,
}

/// Audio playback configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Start playback as soon as a result arrives
    pub autoplay: bool,
}

impl Config {
    /// Load configuration with layering env > config file > default
    ///
    /// # Errors
    ///
    /// Returns error if an unsupported language code is configured
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let api_url = std::env::var("WAYSIGHT_API_URL")
            .ok()
            .or(fc.server.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let language = std::env::var("WAYSIGHT_LANGUAGE")
            .ok()
            .or(fc.language)
            .unwrap_or_else(|| "en".to_string());
        validate_language(&language)?;

        let camera = CameraConfig {
            snapshot_url: std::env::var("WAYSIGHT_CAMERA_URL")
                .ok()
                .or(fc.camera.snapshot_url)
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_URL.to_string()),
            live_interval: Duration::from_secs(
                std::env::var("WAYSIGHT_LIVE_INTERVAL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .or(fc.camera.live_interval_secs)
                    .unwrap_or(DEFAULT_LIVE_INTERVAL_SECS)
                    .max(1),
            ),
        };

        let voice = VoiceConfig {
            enabled: std::env::var("WAYSIGHT_DISABLE_VOICE")
                .map(|v| !(v == "1" || v.eq_ignore_ascii_case("true")))
                .ok()
                .or(fc.voice.enabled)
                .unwrap_or(true),
        };

        let playback = PlaybackConfig {
            autoplay: std::env::var("WAYSIGHT_AUTOPLAY")
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .or(fc.playback.autoplay)
                .unwrap_or(true),
        };

        Ok(Self {
            api_url,
            language,
            camera,
            voice,
            playback,
        })
    }

    /// Replace the output language, validating the code
    ///
    /// # Errors
    ///
    /// Returns error if the language code is not supported
    pub fn set_language(&mut self, code: &str) -> Result<()> {
        validate_language(code)?;
        self.language = code.to_string();
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            language: "en".to_string(),
            camera: CameraConfig {
                snapshot_url: DEFAULT_SNAPSHOT_URL.to_string(),
                live_interval: Duration::from_secs(DEFAULT_LIVE_INTERVAL_SECS),
            },
            voice: VoiceConfig { enabled: true },
            playback: PlaybackConfig { autoplay: true },
        }
    }
}

/// Check a language code against the supported set
///
/// # Errors
///
/// Returns `Error::Config` naming the supported codes on mismatch
pub fn validate_language(code: &str) -> Result<()> {
    if SUPPORTED_LANGUAGES.contains(&code) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "unsupported language '{code}' (supported: {})",
            SUPPORTED_LANGUAGES.join(", ")
        )))
    }
}
