//! Shared test utilities
//!
//! Fakes for the hardware and network seams so the orchestration tests run
//! anywhere.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use waysight::analyze::{AnalysisResult, AnalyzeBackend};
use waysight::camera::{Frame, FrameSource};
use waysight::{Error, Result};

/// Build a plausible analysis result without audio
#[must_use]
pub fn sample_result(description: &str) -> AnalysisResult {
    serde_json::from_value(serde_json::json!({
        "query": "",
        "description": description,
        "objects": [],
        "hazards": [],
        "depth": {
            "zones": {
                "left":   { "label": "clear", "warning": "", "percent": 5.0 },
                "center": { "label": "clear", "warning": "", "percent": 10.0 },
                "right":  { "label": "clear", "warning": "", "percent": 0.0 }
            },
            "overall_warning": "",
            "safe_to_walk": true
        },
        "translated_text": description,
        "audio_b64": "",
        "language": "en",
        "safe_to_walk": true
    }))
    .expect("fixture result must deserialize")
}

/// A frame at least as large as the service's empty-image floor
#[must_use]
pub fn test_frame() -> Frame {
    Frame::new(vec![0xFF; 4096])
}

/// Shared acquire/release/grab counters for [`CountingSource`]
#[derive(Clone, Default)]
pub struct SourceCounters {
    opens: Arc<AtomicUsize>,
    grabs: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl SourceCounters {
    #[must_use]
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn grabs(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// In-memory frame source that counts lifecycle calls
pub struct CountingSource {
    pub counters: SourceCounters,
    pub fail_grab: bool,
}

impl CountingSource {
    #[must_use]
    pub fn new(counters: SourceCounters) -> Self {
        Self {
            counters,
            fail_grab: false,
        }
    }

    #[must_use]
    pub fn failing_grabs(counters: SourceCounters) -> Self {
        Self {
            counters,
            fail_grab: true,
        }
    }
}

#[async_trait]
impl FrameSource for CountingSource {
    async fn open(&mut self) -> Result<()> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn grab(&mut self) -> Result<Frame> {
        self.counters.grabs.fetch_add(1, Ordering::SeqCst);
        if self.fail_grab {
            return Err(Error::Camera("fake sensor fault".to_string()));
        }
        Ok(test_frame())
    }

    fn close(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// What the fake analysis backend should do per request
pub enum FakeMode {
    /// Answer immediately with a copy of the given result
    Succeed(Box<AnalysisResult>),
    /// Fail immediately with the given message
    Fail(String),
    /// Hold the request until [`FakeBackend::release`] fires, then answer
    Block(Box<AnalysisResult>),
}

/// Analysis backend fake with call counting and a completion gate
pub struct FakeBackend {
    mode: FakeMode,
    calls: Arc<AtomicUsize>,
    gate: Arc<Notify>,
}

impl FakeBackend {
    #[must_use]
    pub fn new(mode: FakeMode) -> Self {
        Self {
            mode,
            calls: Arc::new(AtomicUsize::new(0)),
            gate: Arc::new(Notify::new()),
        }
    }

    /// Number of analyze calls seen so far
    #[must_use]
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Handle that lets a blocked request complete
    #[must_use]
    pub fn gate(&self) -> Arc<Notify> {
        Arc::clone(&self.gate)
    }
}

#[async_trait]
impl AnalyzeBackend for FakeBackend {
    async fn analyze(
        &self,
        _frame: &Frame,
        language: &str,
        query: &str,
    ) -> Result<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            FakeMode::Succeed(result) => {
                let mut result = (**result).clone();
                result.language = language.to_string();
                result.query = query.to_string();
                Ok(result)
            }
            FakeMode::Fail(message) => Err(Error::Server(message.clone())),
            FakeMode::Block(result) => {
                self.gate.notified().await;
                Ok((**result).clone())
            }
        }
    }
}

/// Generate a sine wave at the speech sample rate
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let rate = waysight::voice::SAMPLE_RATE as f32;
    let num_samples = (rate * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / rate;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}
