//! TOML configuration file loading
//!
//! Supports `~/.config/waysight/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct WaysightConfigFile {
    /// Output language code (e.g. "en")
    #[serde(default)]
    pub language: Option<String>,

    /// Remote service configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Camera configuration
    #[serde(default)]
    pub camera: CameraFileConfig,

    /// Voice input configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Audio playback configuration
    #[serde(default)]
    pub playback: PlaybackFileConfig,
}

/// Remote analysis/transcription service configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Base URL of the analysis service (e.g. `http://localhost:8000`)
    pub api_url: Option<String>,
}

/// Camera configuration
#[derive(Debug, Default, Deserialize)]
pub struct CameraFileConfig {
    /// Snapshot endpoint of the network camera (still JPEG per GET)
    pub snapshot_url: Option<String>,

    /// Live-mode sampling interval in seconds
    pub live_interval_secs: Option<u64>,
}

/// Voice input configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable microphone input
    pub enabled: Option<bool>,
}

/// Audio playback configuration
#[derive(Debug, Default, Deserialize)]
pub struct PlaybackFileConfig {
    /// Start playback as soon as a result arrives
    pub autoplay: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `WaysightConfigFile::default()` if the file doesn't exist or
/// can't be parsed.
pub fn load_config_file() -> WaysightConfigFile {
    let Some(path) = config_file_path() else {
        return WaysightConfigFile::default();
    };

    if !path.exists() {
        return WaysightConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                WaysightConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            WaysightConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/waysight/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("waysight").join("config.toml"))
}
