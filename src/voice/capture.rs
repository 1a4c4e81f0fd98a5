//! Microphone capture
//!
//! The microphone is a scoped resource: [`MicCapture::acquire`] opens the
//! input stream and [`MicCapture::finish`] consumes the handle, returning
//! the buffered samples and releasing the device in the same move. There is
//! no way to hold samples and the microphone at once.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream};

use crate::{Error, Result};

/// Sample rate for speech capture
pub const SAMPLE_RATE: u32 = 16000;

/// An open microphone stream buffering samples
pub struct MicCapture {
    #[allow(dead_code)]
    stream: Stream,
    buffer: Arc<Mutex<Vec<f32>>>,
}

impl MicCapture {
    /// Open the default input device and start buffering
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if no usable microphone exists and
    /// `PermissionDenied` if the platform refuses the stream
    pub fn acquire() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::DeviceUnavailable("no microphone available".to_string()))?;

        let supported = device
            .supported_input_configs()
            .map_err(|e| Error::DeviceUnavailable(format!("microphone query failed: {e}")))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| {
                Error::DeviceUnavailable("no mono speech-rate capture format".to_string())
            })?;

        let config = supported.with_sample_rate(SampleRate(SAMPLE_RATE)).config();
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let fill = Arc::clone(&buffer);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = fill.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "microphone stream error");
                },
                None,
            )
            .map_err(|e| Error::PermissionDenied(format!("microphone access failed: {e}")))?;

        stream
            .play()
            .map_err(|e| Error::PermissionDenied(format!("microphone start failed: {e}")))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "microphone acquired"
        );

        Ok(Self { stream, buffer })
    }

    /// Number of samples buffered so far
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.buffer.lock().map(|b| b.len()).unwrap_or_default()
    }

    /// RMS level of the buffered audio, for input metering
    #[must_use]
    pub fn level(&self) -> f32 {
        self.buffer
            .lock()
            .map(|b| rms(&b))
            .unwrap_or_default()
    }

    /// Stop capturing: release the microphone and return the samples
    #[must_use]
    pub fn finish(self) -> Vec<f32> {
        let samples = self
            .buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();

        // Dropping `self.stream` here is the release
        tracing::debug!(samples = samples.len(), "microphone released");
        samples
    }
}

/// RMS energy of a sample buffer
#[allow(clippy::cast_precision_loss)]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Encode f32 samples as 16-bit PCM WAV for the transcription service
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
