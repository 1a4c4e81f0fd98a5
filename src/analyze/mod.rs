//! Analysis dispatch
//!
//! Talks to the remote analysis service and enforces the single-flight
//! request discipline shared by manual triggers and live sampling.

mod client;
mod dispatch;
mod types;

pub use client::{AnalysisClient, AnalyzeBackend, server_error};
pub use dispatch::{DispatchSlot, DispatchState, Dispatcher, Origin};
pub use types::{
    AnalysisResult, DepthMap, DepthZones, DetectedObject, HealthReport, ZoneReading,
};

pub(crate) use types::TranscriptResponse;
