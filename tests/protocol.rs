//! Wire-format tests for the analysis service protocol
//!
//! The mapped fields must equal the JSON the service returns exactly; no
//! reshaping loses or invents data.

use base64::Engine as _;

use waysight::analyze::AnalysisResult;
use waysight::voice::samples_to_wav;

mod common;

/// A response shaped exactly like the service's /analyze answer
fn service_response_json(audio_b64: &str) -> String {
    format!(
        r#"{{
            "query": "is it safe to walk forward?",
            "description": "a hallway with a chair on the left side",
            "objects": [
                {{ "label": "chair", "confidence": 0.93, "box": [12.0, 40.5, 220.0, 310.0] }},
                {{ "label": "person", "confidence": 0.71, "box": [300.0, 10.0, 420.0, 460.0] }}
            ],
            "hazards": ["chair"],
            "depth": {{
                "zones": {{
                    "left":   {{ "label": "near",  "warning": "obstacle close on the left", "percent": 72.5 }},
                    "center": {{ "label": "clear", "warning": "", "percent": 8.0 }},
                    "right":  {{ "label": "clear", "warning": "", "percent": 3.5 }}
                }},
                "overall_warning": "obstacle close on the left",
                "safe_to_walk": true
            }},
            "translated_text": "un pasillo con una silla a la izquierda",
            "audio_b64": "{audio_b64}",
            "language": "es",
            "safe_to_walk": false
        }}"#
    )
}

#[test]
fn test_result_maps_every_field() {
    let result: AnalysisResult = serde_json::from_str(&service_response_json("")).unwrap();

    assert_eq!(result.query, "is it safe to walk forward?");
    assert_eq!(result.description, "a hallway with a chair on the left side");

    assert_eq!(result.objects.len(), 2);
    assert_eq!(result.objects[0].label, "chair");
    assert!((result.objects[0].confidence - 0.93).abs() < 1e-9);
    assert!((result.objects[0].bounding_box[0] - 12.0).abs() < 1e-9);
    assert!((result.objects[1].bounding_box[3] - 460.0).abs() < 1e-9);

    assert_eq!(result.hazards, vec!["chair".to_string()]);

    assert_eq!(result.depth.zones.left.label, "near");
    assert_eq!(
        result.depth.zones.left.warning,
        "obstacle close on the left"
    );
    assert!((result.depth.zones.left.percent - 72.5).abs() < 1e-9);
    assert_eq!(result.depth.zones.center.label, "clear");
    assert!((result.depth.zones.right.percent - 3.5).abs() < 1e-9);
    assert_eq!(result.depth.overall_warning, "obstacle close on the left");
    assert!(result.depth.safe_to_walk);

    assert_eq!(
        result.translated_text,
        "un pasillo con una silla a la izquierda"
    );
    assert_eq!(result.language, "es");

    // Depth-only and combined verdicts are independent fields
    assert!(!result.safe_to_walk);
}

#[test]
fn test_audio_payload_decodes_to_playable_wav() {
    let samples = common::sine_samples(440.0, 0.1, 0.4);
    let wav = samples_to_wav(&samples, waysight::voice::SAMPLE_RATE).unwrap();
    let audio_b64 = base64::engine::general_purpose::STANDARD.encode(&wav);

    let result: AnalysisResult =
        serde_json::from_str(&service_response_json(&audio_b64)).unwrap();

    assert!(result.has_audio());
    let decoded = result.decode_audio().unwrap();
    assert_eq!(decoded, wav);
    assert_eq!(&decoded[0..4], b"RIFF");
    assert_eq!(&decoded[8..12], b"WAVE");
}

#[test]
fn test_empty_audio_field() {
    let result: AnalysisResult = serde_json::from_str(&service_response_json("")).unwrap();
    assert!(!result.has_audio());
    assert_eq!(result.decode_audio().unwrap(), Vec::<u8>::new());
}

#[test]
fn test_invalid_audio_is_malformed_response() {
    let result: AnalysisResult =
        serde_json::from_str(&service_response_json("!!not base64!!")).unwrap();
    assert!(result.decode_audio().is_err());
}

#[test]
fn test_missing_field_is_rejected() {
    // A payload without a description is malformed, not silently defaulted
    let err = serde_json::from_str::<AnalysisResult>(r#"{"query": "hi"}"#);
    assert!(err.is_err());
}
