//! Audio playback of spoken answers
//!
//! Decodes the WAV payload carried by an analysis result and drives the
//! speaker. Exactly one decoded resource is alive at a time: loading a new
//! answer tears the previous one down first. Playback is supplementary to
//! the visible text, so playback failures degrade to Stopped instead of
//! surfacing as hard errors.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream};

use crate::{Error, Result};

/// Player lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing playing; position at zero
    #[default]
    Stopped,
    /// Audio running
    Playing,
    /// Audio suspended mid-answer
    Paused,
}

/// Position/completion state shared with the output callback
struct PlayCursor {
    position: AtomicUsize,
    finished: AtomicBool,
}

/// One decoded answer wired to an output stream
struct ActivePlayback {
    stream: Stream,
    cursor: Arc<PlayCursor>,
    total: usize,
    sample_rate: u32,
}

/// Plays spoken answers through the default output device
#[derive(Default)]
pub struct AudioPlayer {
    active: Option<ActivePlayback>,
    state: PlaybackState,
}

impl AudioPlayer {
    /// Create a player with nothing loaded
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a WAV answer, optionally starting playback immediately
    ///
    /// The previous playable resource, if any, is released before the new
    /// one exists. An autoplay refusal is not an error: the player just
    /// stays Stopped.
    ///
    /// # Errors
    ///
    /// Returns `Error::Playback` if the payload cannot be decoded or no
    /// usable output device exists
    pub fn load(&mut self, wav: &[u8], autoplay: bool) -> Result<()> {
        // Old resource goes first; holding two decoded answers leaks
        self.stop();

        let (samples, sample_rate) = decode_wav(wav)?;
        tracing::debug!(samples = samples.len(), sample_rate, "answer decoded");

        self.active = Some(build_stream(samples, sample_rate)?);
        if autoplay {
            self.play();
        }
        Ok(())
    }

    /// Flip Playing/Paused (or start over when Stopped with audio loaded)
    pub fn toggle(&mut self) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused | PlaybackState::Stopped => self.play(),
        }
    }

    /// Start or resume playback; refusals degrade to Stopped
    fn play(&mut self) {
        let Some(active) = &self.active else {
            return;
        };
        match active.stream.play() {
            Ok(()) => self.state = PlaybackState::Playing,
            Err(e) => {
                tracing::debug!(error = %e, "playback refused");
                self.state = PlaybackState::Stopped;
            }
        }
    }

    /// Suspend playback in place
    fn pause(&mut self) {
        let Some(active) = &self.active else {
            return;
        };
        match active.stream.pause() {
            Ok(()) => self.state = PlaybackState::Paused,
            Err(e) => {
                tracing::debug!(error = %e, "pause refused");
                self.state = PlaybackState::Stopped;
            }
        }
    }

    /// Settle natural end-of-audio: back to Stopped with position zero
    ///
    /// Returns true when the answer just finished.
    pub fn poll_finished(&mut self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        if !active.cursor.finished.swap(false, Ordering::AcqRel) {
            return false;
        }

        active.cursor.position.store(0, Ordering::Release);
        if let Err(e) = active.stream.pause() {
            tracing::debug!(error = %e, "pause after finish refused");
        }
        self.state = PlaybackState::Stopped;
        tracing::debug!("playback finished");
        true
    }

    /// Release the playable resource
    pub fn stop(&mut self) {
        if self.active.take().is_some() {
            tracing::debug!("playback resource released");
        }
        self.state = PlaybackState::Stopped;
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether an answer is loaded
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.active.is_some()
    }

    /// Playback position in seconds
    #[must_use]
    pub fn position_secs(&self) -> f64 {
        self.active.as_ref().map_or(0.0, |a| {
            samples_to_secs(a.cursor.position.load(Ordering::Acquire), a.sample_rate)
        })
    }

    /// Total answer duration in seconds; zero until audio is loaded
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.active
            .as_ref()
            .map_or(0.0, |a| samples_to_secs(a.total, a.sample_rate))
    }

    /// Progress through the answer as a percentage in `[0, 100]`
    ///
    /// Zero while the duration is unknown.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        let duration = self.duration_secs();
        if duration <= 0.0 {
            return 0.0;
        }
        (self.position_secs() / duration * 100.0).clamp(0.0, 100.0)
    }
}

#[allow(clippy::cast_precision_loss)]
fn samples_to_secs(samples: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    samples as f64 / f64::from(sample_rate)
}

/// Render seconds as `mm:ss` for the position readout
#[must_use]
pub fn format_timestamp(secs: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = secs.max(0.0) as u64;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

/// Decode WAV bytes to mono f32 samples plus their sample rate
///
/// # Errors
///
/// Returns `Error::Playback` on anything hound cannot read
#[allow(clippy::cast_precision_loss)]
fn decode_wav(wav: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::new(Cursor::new(wav))
        .map_err(|e| Error::Playback(format!("WAV decode failed: {e}")))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = f32::from(i16::MAX);
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| f32::from(v) / max))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Playback(format!("WAV read failed: {e}")))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Playback(format!("WAV read failed: {e}")))?,
    };

    // Fold interleaved channels down to mono
    let mono = if spec.channels > 1 {
        let channels = usize::from(spec.channels);
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    } else {
        samples
    };

    if mono.is_empty() {
        return Err(Error::Playback("audio payload holds no samples".to_string()));
    }

    Ok((mono, spec.sample_rate))
}

/// Wire decoded samples to a paused output stream
fn build_stream(samples: Vec<f32>, sample_rate: u32) -> Result<ActivePlayback> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Playback("no output device available".to_string()))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Playback(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .or_else(|| {
            // Fallback: stereo output fed the mono signal on both sides
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
        })
        .ok_or_else(|| Error::Playback("no suitable output config found".to_string()))?;

    let config = supported.with_sample_rate(SampleRate(sample_rate)).config();
    let channels = usize::from(config.channels);

    let total = samples.len();
    let samples = Arc::new(samples);
    let cursor = Arc::new(PlayCursor {
        position: AtomicUsize::new(0),
        finished: AtomicBool::new(false),
    });

    let feed_samples = Arc::clone(&samples);
    let feed_cursor = Arc::clone(&cursor);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = feed_cursor.position.load(Ordering::Acquire);
                for frame in data.chunks_mut(channels) {
                    let sample = if pos < feed_samples.len() {
                        let s = feed_samples[pos];
                        pos += 1;
                        s
                    } else {
                        feed_cursor.finished.store(true, Ordering::Release);
                        0.0
                    };
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
                feed_cursor.position.store(pos, Ordering::Release);
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Playback(e.to_string()))?;

    // Some backends run streams on creation; park it until play()
    if let Err(e) = stream.pause() {
        tracing::debug!(error = %e, "initial pause refused");
    }

    Ok(ActivePlayback {
        stream,
        cursor,
        total,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::samples_to_wav;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(9.7), "00:09");
        assert_eq!(format_timestamp(65.0), "01:05");
        assert_eq!(format_timestamp(-3.0), "00:00");
    }

    #[test]
    fn test_decode_wav_roundtrip() {
        let original = vec![0.0f32, 0.5, -0.5, 0.25, -0.25, 1.0];
        let wav = samples_to_wav(&original, 16000).unwrap();

        let (decoded, rate) = decode_wav(&wav).unwrap();
        assert_eq!(rate, 16000);
        assert_eq!(decoded.len(), original.len());
        for (got, want) in decoded.iter().zip(&original) {
            assert!((got - want).abs() < 0.001);
        }
    }

    #[test]
    fn test_decode_wav_rejects_garbage() {
        assert!(decode_wav(b"definitely not a wav file").is_err());
        assert!(decode_wav(&[]).is_err());
    }

    #[test]
    fn test_decode_wav_rejects_empty_audio() {
        let wav = samples_to_wav(&[], 16000).unwrap();
        assert!(decode_wav(&wav).is_err());
    }

    #[test]
    fn test_progress_without_audio_is_zero() {
        let player = AudioPlayer::new();
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert!(player.progress_percent().abs() < f64::EPSILON);
        assert!(player.duration_secs().abs() < f64::EPSILON);
    }
}
