//! Error types for the waysight client

use thiserror::Error;

/// Result type alias for waysight operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the waysight client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Camera or microphone access refused by the device
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Camera or microphone hardware not reachable
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Frame capture error
    #[error("camera error: {0}")]
    Camera(String),

    /// Audio capture error
    #[error("audio error: {0}")]
    Audio(String),

    /// Transcription error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Non-2xx answer from the analysis or transcription service.
    ///
    /// The payload is the service's `detail` message (or a generic
    /// `Server error {status}`) and is shown to the user as-is.
    #[error("{0}")]
    Server(String),

    /// Response body did not match the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Audio playback error
    #[error("playback error: {0}")]
    Playback(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
