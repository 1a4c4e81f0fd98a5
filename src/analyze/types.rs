//! Wire types for the analysis service
//!
//! These map 1:1 onto the JSON the service returns; nothing is reshaped on
//! the way to the presentation layer.

use base64::Engine as _;
use serde::Deserialize;

use crate::{Error, Result};

/// One detected object in the scene
#[derive(Debug, Clone, Deserialize)]
pub struct DetectedObject {
    /// Object class label
    pub label: String,

    /// Detection confidence in `[0, 1]`
    pub confidence: f64,

    /// Bounding box `[x1, y1, x2, y2]` in image coordinates
    #[serde(rename = "box")]
    pub bounding_box: [f64; 4],
}

/// Proximity reading for one depth zone
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneReading {
    /// Proximity classification (e.g. "near", "clear")
    pub label: String,

    /// Human-readable warning for this zone
    pub warning: String,

    /// Share of the zone occupied by close surfaces, `[0, 100]`
    pub percent: f64,
}

/// Left/center/right depth zones of the frame
#[derive(Debug, Clone, Deserialize)]
pub struct DepthZones {
    pub left: ZoneReading,
    pub center: ZoneReading,
    pub right: ZoneReading,
}

/// Walking-safety depth estimate for the whole frame
#[derive(Debug, Clone, Deserialize)]
pub struct DepthMap {
    /// Per-zone readings
    pub zones: DepthZones,

    /// Frame-level warning text
    pub overall_warning: String,

    /// Depth-only walkability verdict
    pub safe_to_walk: bool,
}

/// Full result of one analysis request
///
/// Immutable once received; a fresh result fully replaces the previous one.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResult {
    /// The question the answer addresses (echoed by the service)
    pub query: String,

    /// Scene description in English
    pub description: String,

    /// Detected objects, ordered by the service
    pub objects: Vec<DetectedObject>,

    /// Labels of detected hazards
    pub hazards: Vec<String>,

    /// Walking-safety depth zones
    pub depth: DepthMap,

    /// Description translated into the requested language
    pub translated_text: String,

    /// Base64-encoded WAV of the spoken answer
    pub audio_b64: String,

    /// Language the answer was rendered in
    pub language: String,

    /// Combined depth + hazard walkability verdict
    pub safe_to_walk: bool,
}

impl AnalysisResult {
    /// Decode the inline audio payload into raw WAV bytes
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedResponse` if the payload is not valid base64
    pub fn decode_audio(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.audio_b64)
            .map_err(|e| Error::MalformedResponse(format!("audio payload is not base64: {e}")))
    }

    /// Whether the service returned any audio at all
    #[must_use]
    pub fn has_audio(&self) -> bool {
        !self.audio_b64.is_empty()
    }
}

/// Health report of the analysis service
#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    /// Service status string ("ok" when reachable)
    pub status: String,

    /// Whether all models have finished loading
    #[serde(default)]
    pub models_loaded: bool,

    /// Service version
    #[serde(default)]
    pub version: String,
}

/// Response from the transcription service
#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptResponse {
    /// Recognized text; a missing field means an empty transcript
    #[serde(default)]
    pub transcript: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_transcript_is_empty() {
        let parsed: TranscriptResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.transcript, "");

        let parsed: TranscriptResponse =
            serde_json::from_str(r#"{"transcript":"where am I","length_chars":10}"#).unwrap();
        assert_eq!(parsed.transcript, "where am I");
    }

    #[test]
    fn test_decode_audio_rejects_bad_base64() {
        let mut result: AnalysisResult = serde_json::from_str(
            r#"{
                "query": "", "description": "d", "objects": [], "hazards": [],
                "depth": {
                    "zones": {
                        "left":   {"label": "clear", "warning": "", "percent": 0.0},
                        "center": {"label": "clear", "warning": "", "percent": 0.0},
                        "right":  {"label": "clear", "warning": "", "percent": 0.0}
                    },
                    "overall_warning": "", "safe_to_walk": true
                },
                "translated_text": "", "audio_b64": "", "language": "en",
                "safe_to_walk": true
            }"#,
        )
        .unwrap();

        assert!(!result.has_audio());
        assert!(result.decode_audio().unwrap().is_empty());

        result.audio_b64 = "***".to_string();
        assert!(result.decode_audio().is_err());
    }
}
