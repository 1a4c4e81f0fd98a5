//! Voice pipeline tests
//!
//! Exercises WAV encoding and the recorder state machine without requiring
//! audio hardware.

use std::io::Cursor;

use tokio::sync::mpsc;

use waysight::voice::{SAMPLE_RATE, TranscribeClient, VoiceChannel, VoiceState, rms, samples_to_wav};

mod common;

use common::sine_samples;

fn generate_silence(duration_secs: f32) -> Vec<f32> {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

#[test]
fn test_samples_to_wav_header() {
    let samples = sine_samples(440.0, 0.1, 0.5);
    let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert!(wav.len() > 44);
}

#[test]
fn test_wav_roundtrip() {
    let original: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav = samples_to_wav(&original, SAMPLE_RATE).unwrap();

    let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read.len(), original.len());
}

#[test]
fn test_empty_recording_still_encodes() {
    let wav = samples_to_wav(&[], SAMPLE_RATE).unwrap();
    // Just the header: a silent press-and-release still produces a valid
    // upload
    assert_eq!(&wav[0..4], b"RIFF");
}

#[test]
fn test_rms_tracks_signal_level() {
    assert!(rms(&generate_silence(0.1)) < 0.001);

    // RMS of a sine is amplitude over sqrt(2)
    let tone = sine_samples(440.0, 0.5, 0.4);
    let level = rms(&tone);
    assert!((level - 0.4 / std::f32::consts::SQRT_2).abs() < 0.01);
}

#[tokio::test]
async fn test_recorder_stop_without_recording_is_a_noop() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut channel = VoiceChannel::new(TranscribeClient::new("http://localhost:9"), tx);

    assert_eq!(channel.state(), VoiceState::Idle);
    assert!(!channel.is_recording());

    // No microphone was ever held, so there is nothing to finalize and no
    // transcription request goes out
    channel.stop_recording();
    assert_eq!(channel.state(), VoiceState::Idle);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_transcription_done_only_settles_transcribing() {
    let (tx, _rx) = mpsc::channel(4);
    let mut channel = VoiceChannel::new(TranscribeClient::new("http://localhost:9"), tx);

    channel.transcription_done();
    assert_eq!(channel.state(), VoiceState::Idle);
}

#[test]
fn test_recorded_secs_is_zero_when_idle() {
    let (tx, _rx) = mpsc::channel(4);
    let channel = VoiceChannel::new(TranscribeClient::new("http://localhost:9"), tx);
    assert!(channel.recorded_secs().abs() < f32::EPSILON);
}
