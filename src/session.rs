//! Session orchestration
//!
//! One owned state container wires the components together: the camera and
//! its live sampler, the single-flight dispatcher, the voice channel, and
//! the answer player. Each piece of shared state has exactly one writer
//! category: the camera handle belongs to the capture side, the dispatch
//! slot to the dispatcher, and the query text is last-write-wins between
//! voice transcripts and typed input.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::analyze::{
    AnalysisClient, AnalysisResult, AnalyzeBackend, DispatchSlot, DispatchState, Dispatcher,
    Origin,
};
use crate::camera::{Camera, Frame, FrameSource, HttpFrameSource, LiveMode};
use crate::config::Config;
use crate::playback::AudioPlayer;
use crate::voice::{TranscribeClient, VoiceChannel, VoiceState};
use crate::{Error, Result};

/// Camera shared between the session and the live sampling task
pub type SharedCamera = Arc<tokio::sync::Mutex<Camera>>;

/// Events published by the background halves of the session
#[derive(Debug)]
pub enum SessionEvent {
    /// An analysis finished; the result replaces the previous one
    AnalysisReady {
        origin: Origin,
        result: Box<AnalysisResult>,
    },
    /// An analysis failed; the previous result stays on screen
    AnalysisFailed { origin: Origin, message: String },
    /// A recording was transcribed; the text replaces the query wholesale
    TranscriptReady(String),
    /// Transcription failed; the query text is left alone
    TranscriptionFailed(String),
    /// A live sample could not be taken; the timer keeps running
    CaptureFailed(String),
}

/// The query/language text read by every dispatch at send time
///
/// Written by typed input and by arriving transcripts; whichever wrote last
/// wins, there is no merging.
#[derive(Clone)]
pub struct QueryState {
    inner: Arc<Mutex<QueryInner>>,
}

struct QueryInner {
    language: String,
    query: String,
}

impl QueryState {
    /// Create with the given output language and an empty query
    #[must_use]
    pub fn new(language: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueryInner {
                language: language.to_string(),
                query: String::new(),
            })),
        }
    }

    /// Replace the query text
    pub fn set_query(&self, text: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.query = text.to_string();
        }
    }

    /// Replace the output language
    pub fn set_language(&self, code: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.language = code.to_string();
        }
    }

    /// Read (language, query) as of this instant
    #[must_use]
    pub fn snapshot(&self) -> (String, String) {
        self.inner.lock().map_or_else(
            |_| (String::new(), String::new()),
            |inner| (inner.language.clone(), inner.query.clone()),
        )
    }

    /// Current query text
    #[must_use]
    pub fn query(&self) -> String {
        self.snapshot().1
    }
}

/// The orchestrator: owns all client-side state for one user session
pub struct Session {
    config: Config,
    camera: SharedCamera,
    live: LiveMode,
    dispatcher: Dispatcher,
    voice: VoiceChannel,
    player: AudioPlayer,
    query: QueryState,
    current_frame: Option<Frame>,
    latest: Option<AnalysisResult>,
    last_error: Option<String>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: Option<mpsc::Receiver<SessionEvent>>,
}

impl Session {
    /// Create a session against the configured remote service and camera
    #[must_use]
    pub fn new(config: Config) -> Self {
        let backend: Arc<dyn AnalyzeBackend> = Arc::new(AnalysisClient::new(&config.api_url));
        let source = Box::new(HttpFrameSource::new(&config.camera.snapshot_url));
        Self::with_parts(config, backend, source)
    }

    /// Create a session with explicit backend and camera source
    ///
    /// This is the seam the integration tests use to run hardware- and
    /// network-free.
    #[must_use]
    pub fn with_parts(
        config: Config,
        backend: Arc<dyn AnalyzeBackend>,
        source: Box<dyn FrameSource>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(32);
        let dispatcher = Dispatcher::new(backend, DispatchSlot::new(), events_tx.clone());
        let voice = VoiceChannel::new(TranscribeClient::new(&config.api_url), events_tx.clone());
        let query = QueryState::new(&config.language);

        Self {
            camera: Arc::new(tokio::sync::Mutex::new(Camera::new(source))),
            live: LiveMode::new(),
            dispatcher,
            voice,
            player: AudioPlayer::new(),
            query,
            current_frame: None,
            latest: None,
            last_error: None,
            events_tx,
            events_rx: Some(events_rx),
            config,
        }
    }

    // ── Capture ────────────────────────────────────────────────────────

    /// Acquire the camera stream
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `DeviceUnavailable`, surfaced without
    /// retry
    pub async fn open_camera(&self) -> Result<()> {
        self.camera.lock().await.open().await
    }

    /// Capture one frame and release the camera
    ///
    /// The new frame becomes the manual-analysis candidate; the previous
    /// result and error are cleared for review of the fresh capture.
    ///
    /// # Errors
    ///
    /// Returns error if the camera is closed, in live mode, or the grab
    /// fails
    pub async fn take_photograph(&mut self) -> Result<()> {
        let frame = self.camera.lock().await.photograph().await?;
        self.set_frame(frame);
        Ok(())
    }

    /// Use an image file or captured frame as the manual candidate
    pub fn set_frame(&mut self, frame: Frame) {
        tracing::debug!(bytes = frame.len(), "frame selected");
        self.current_frame = Some(frame);
        self.latest = None;
        self.last_error = None;
    }

    /// Start live sampling: one frame now, then one per interval
    ///
    /// # Errors
    ///
    /// Returns error if the camera is not open
    pub async fn start_live(&mut self) -> Result<()> {
        {
            let mut cam = self.camera.lock().await;
            if !cam.is_open() {
                return Err(Error::Camera("camera is not open".to_string()));
            }
            cam.set_live_sampling(true);
        }
        self.live.start(
            Arc::clone(&self.camera),
            self.dispatcher.clone(),
            self.query.clone(),
            self.events_tx.clone(),
            self.config.camera.live_interval,
        );
        Ok(())
    }

    /// Cancel future live ticks; the camera stays open and a request
    /// already in flight still completes
    pub async fn stop_live(&mut self) {
        self.live.stop();
        self.camera.lock().await.set_live_sampling(false);
    }

    /// Whether the live sampling timer is running
    #[must_use]
    pub fn live_active(&self) -> bool {
        self.live.is_active()
    }

    /// Release the camera unconditionally
    ///
    /// Cancels the live timer, never waits for an in-flight analysis, and
    /// is safe to call repeatedly.
    pub async fn close_camera(&mut self) {
        self.live.stop();
        self.camera.lock().await.close();
    }

    // ── Analysis ───────────────────────────────────────────────────────

    /// Dispatch the current frame for analysis (manual origin)
    ///
    /// Returns false when a request is already in flight; the frame is kept
    /// and the caller tells the user to wait.
    ///
    /// # Errors
    ///
    /// Returns error if no frame has been captured or uploaded yet
    pub fn analyze(&mut self) -> Result<bool> {
        let Some(frame) = self.current_frame.clone() else {
            return Err(Error::Camera(
                "no image yet, photograph or upload one first".to_string(),
            ));
        };
        let (language, query) = self.query.snapshot();
        Ok(self
            .dispatcher
            .spawn(Origin::Manual, frame, language, query))
    }

    /// Current dispatch slot state
    #[must_use]
    pub fn dispatch_state(&self) -> DispatchState {
        self.dispatcher.slot().state()
    }

    // ── Voice ──────────────────────────────────────────────────────────

    /// Start recording a spoken question
    ///
    /// # Errors
    ///
    /// Returns an error when voice input is disabled, and
    /// `PermissionDenied` or `DeviceUnavailable` from the microphone; the
    /// channel stays idle
    pub fn start_recording(&mut self) -> Result<()> {
        if !self.config.voice.enabled {
            return Err(Error::Config("voice input is disabled".to_string()));
        }
        self.voice.start_recording()
    }

    /// Stop recording; the microphone is released immediately and the
    /// transcript arrives as an event
    pub fn stop_recording(&mut self) {
        self.voice.stop_recording();
    }

    /// Voice channel state
    #[must_use]
    pub fn voice_state(&self) -> VoiceState {
        self.voice.state()
    }

    // ── Text state ─────────────────────────────────────────────────────

    /// Replace the typed question
    pub fn set_query(&self, text: &str) {
        self.query.set_query(text);
    }

    /// Current question text
    #[must_use]
    pub fn query(&self) -> String {
        self.query.query()
    }

    /// Switch the output language
    ///
    /// # Errors
    ///
    /// Returns error for an unsupported language code
    pub fn set_language(&self, code: &str) -> Result<()> {
        crate::config::validate_language(code)?;
        self.query.set_language(code);
        Ok(())
    }

    // ── Events and derived state ───────────────────────────────────────

    /// Wait for the next event from the background halves
    ///
    /// Returns None once the receiver has been handed out via
    /// [`Self::take_events`].
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        match self.events_rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Hand the event receiver to the caller for use in its own select loop
    ///
    /// After this, events are the caller's to pull; feed each one back
    /// through [`Self::apply`].
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.events_rx.take()
    }

    /// Fold an event into the session state
    ///
    /// A fresh result replaces the previous one and starts the answer
    /// audio; a failure keeps the previous result visible and only records
    /// the message.
    pub fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::AnalysisReady { origin, result } => {
                tracing::debug!(?origin, "applying analysis result");
                self.last_error = None;
                if result.has_audio() {
                    match result.decode_audio() {
                        Ok(wav) => {
                            // Playback trouble never blocks the text result
                            if let Err(e) = self.player.load(&wav, self.config.playback.autoplay)
                            {
                                tracing::debug!(error = %e, "answer audio unavailable");
                            }
                        }
                        Err(e) => tracing::debug!(error = %e, "answer audio undecodable"),
                    }
                }
                self.latest = Some((**result).clone());
            }
            SessionEvent::AnalysisFailed { origin, message } => {
                tracing::warn!(?origin, error = %message, "analysis failed");
                self.last_error = Some(message.clone());
            }
            SessionEvent::TranscriptReady(text) => {
                self.voice.transcription_done();
                self.query.set_query(text);
            }
            SessionEvent::TranscriptionFailed(message) => {
                self.voice.transcription_done();
                self.last_error = Some(message.clone());
            }
            SessionEvent::CaptureFailed(message) => {
                self.last_error = Some(message.clone());
            }
        }
    }

    /// The most recent analysis result, surviving later failures
    #[must_use]
    pub fn latest(&self) -> Option<&AnalysisResult> {
        self.latest.as_ref()
    }

    /// The most recent user-visible error message
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The answer player
    pub fn player(&mut self) -> &mut AudioPlayer {
        &mut self.player
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
