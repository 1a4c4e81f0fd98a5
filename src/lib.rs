//! Waysight: assistive scene-narration client
//!
//! Points a camera at the user's surroundings, optionally carries a spoken
//! or typed question, and turns the remote analysis service's answer into
//! speech. All AI inference lives behind the service; this crate is the
//! protocol and the concurrency discipline around calling it:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                       Session                          │
//! │  query/language text · latest result · event loop      │
//! └──────┬──────────────┬───────────────┬─────────────────┘
//!        │              │               │
//! ┌──────▼─────┐ ┌──────▼──────┐ ┌──────▼──────┐
//! │  Camera     │ │  Dispatcher │ │ Voice       │
//! │  photograph │ │ single-     │ │ record →    │
//! │  live ticks │ │ flight slot │ │ transcribe  │
//! └──────┬─────┘ └──────┬──────┘ └──────┬──────┘
//!        │              │               │
//!        └──── frames ──┤     POST /voice
//!                       │
//!          POST /analyze│→ result + WAV answer → playback
//! ```
//!
//! Live mode samples on a fixed cadence with drop-on-busy backpressure: at
//! most one analysis request is ever in flight, and frames that arrive
//! while the service is busy are shed, never queued.

pub mod analyze;
pub mod camera;
pub mod config;
pub mod error;
pub mod playback;
pub mod session;
pub mod voice;

pub use analyze::{AnalysisClient, AnalysisResult, DispatchState, Origin};
pub use camera::{Camera, Frame, FrameSource, HttpFrameSource};
pub use config::Config;
pub use error::{Error, Result};
pub use playback::{AudioPlayer, PlaybackState};
pub use session::{QueryState, Session, SessionEvent};
pub use voice::{VoiceChannel, VoiceState};
