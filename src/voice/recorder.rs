//! Voice question capture and transcription
//!
//! Runs beside the camera pipeline without touching it: the only thing the
//! voice channel ever writes is the query text the next analysis carries.

use tokio::sync::mpsc;

use crate::analyze::server_error;
use crate::session::SessionEvent;
use crate::{Error, Result};

use super::capture::{MicCapture, SAMPLE_RATE, samples_to_wav};

/// Voice channel lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Microphone idle
    Idle,
    /// Microphone held, buffering audio
    Recording,
    /// Microphone released, transcription request outstanding
    Transcribing,
}

/// Client for the remote transcription service
#[derive(Clone)]
pub struct TranscribeClient {
    client: reqwest::Client,
    base_url: String,
}

impl TranscribeClient {
    /// Create a client for the service at `base_url`
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Transcribe one WAV recording
    ///
    /// A response without a `transcript` field is an empty transcript, not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx answer
    pub async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), "sending transcription request");

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Transcription(e.to_string()))?;

        let form = reqwest::multipart::Form::new().part("audio", part);

        let response = self
            .client
            .post(format!("{}/voice", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription service error");
            return Err(server_error(status, &body));
        }

        let parsed: crate::analyze::TranscriptResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("transcript payload: {e}")))?;

        tracing::info!(transcript = %parsed.transcript, "transcription complete");
        Ok(parsed.transcript)
    }
}

/// Records a spoken question and ships it off for transcription
pub struct VoiceChannel {
    state: VoiceState,
    capture: Option<MicCapture>,
    client: TranscribeClient,
    events: mpsc::Sender<SessionEvent>,
}

impl VoiceChannel {
    /// Create a voice channel publishing transcripts on `events`
    #[must_use]
    pub fn new(client: TranscribeClient, events: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            state: VoiceState::Idle,
            capture: None,
            client,
            events,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Whether the microphone is currently held
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state == VoiceState::Recording
    }

    /// Acquire the microphone and start buffering
    ///
    /// No-op if a recording or transcription is already under way.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `DeviceUnavailable`; the channel stays
    /// Idle
    pub fn start_recording(&mut self) -> Result<()> {
        if self.state != VoiceState::Idle {
            tracing::debug!(state = ?self.state, "recorder busy, start ignored");
            return Ok(());
        }

        let capture = MicCapture::acquire()?;
        self.capture = Some(capture);
        self.state = VoiceState::Recording;
        tracing::info!("recording started");
        Ok(())
    }

    /// Seconds of audio buffered so far
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn recorded_secs(&self) -> f32 {
        self.capture
            .as_ref()
            .map(|c| c.sample_count() as f32 / SAMPLE_RATE as f32)
            .unwrap_or_default()
    }

    /// Stop recording and transcribe in the background
    ///
    /// The microphone is released the instant this returns; transcription
    /// runs on its own. Exactly one transcription request goes out per
    /// recording. No-op when not recording.
    pub fn stop_recording(&mut self) {
        let Some(capture) = self.capture.take() else {
            return;
        };

        // Handle released here, before any network work starts
        let samples = capture.finish();
        self.state = VoiceState::Transcribing;
        tracing::info!(samples = samples.len(), "recording stopped, transcribing");

        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match samples_to_wav(&samples, SAMPLE_RATE) {
                Ok(wav) => match client.transcribe(wav).await {
                    Ok(text) => SessionEvent::TranscriptReady(text),
                    Err(e) => SessionEvent::TranscriptionFailed(e.to_string()),
                },
                Err(e) => SessionEvent::TranscriptionFailed(e.to_string()),
            };
            if events.send(event).await.is_err() {
                tracing::debug!("session event channel closed, transcript discarded");
            }
        });
    }

    /// Mark the outstanding transcription as settled
    ///
    /// Called by the session when the transcript (or its failure) arrives.
    pub fn transcription_done(&mut self) {
        if self.state == VoiceState::Transcribing {
            self.state = VoiceState::Idle;
        }
    }
}
