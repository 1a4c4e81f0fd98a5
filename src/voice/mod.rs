//! Voice input
//!
//! Microphone capture and remote transcription of spoken questions.

mod capture;
mod recorder;

pub use capture::{MicCapture, SAMPLE_RATE, rms, samples_to_wav};
pub use recorder::{TranscribeClient, VoiceChannel, VoiceState};
