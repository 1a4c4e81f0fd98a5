//! Live-mode sampling
//!
//! A fixed-cadence timer that samples the open camera and hands each frame
//! to the dispatcher. Backpressure is drop-on-busy: a tick that finds a
//! request in flight does nothing (the frame is shed, never queued), so a
//! slow service can never cause request buildup.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::analyze::{Dispatcher, Origin};
use crate::session::{QueryState, SessionEvent, SharedCamera};

/// Handle on the live sampling timer
#[derive(Default)]
pub struct LiveMode {
    handle: Option<JoinHandle<()>>,
}

impl LiveMode {
    /// Create a stopped live mode
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the sampling timer is running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start sampling: one frame immediately, then one per `interval`
    ///
    /// No-op if already running.
    pub fn start(
        &mut self,
        camera: SharedCamera,
        dispatcher: Dispatcher,
        query: QueryState,
        events: mpsc::Sender<SessionEvent>,
        interval: Duration,
    ) {
        if self.is_active() {
            return;
        }

        tracing::info!(interval_secs = interval.as_secs(), "live mode started");
        self.handle = Some(tokio::spawn(sample_loop(
            camera, dispatcher, query, events, interval,
        )));
    }

    /// Cancel future ticks
    ///
    /// A request already in flight is not cancelled; its result still
    /// applies. The camera stays open for a manual photograph.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("live mode stopped");
        }
    }
}

impl Drop for LiveMode {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The sampling timer body
async fn sample_loop(
    camera: SharedCamera,
    dispatcher: Dispatcher,
    query: QueryState,
    events: mpsc::Sender<SessionEvent>,
    interval: Duration,
) {
    let slot = dispatcher.slot();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick completes immediately, so live mode samples at t=0
        ticker.tick().await;

        // Advisory busy check; the dispatcher's own acquire is the one
        // that's authoritative
        if slot.is_busy() {
            tracing::debug!("analysis in flight, live frame dropped");
            continue;
        }

        let frame = {
            let mut cam = camera.lock().await;
            if !cam.is_open() {
                tracing::debug!("camera closed, live sampling ends");
                break;
            }
            match cam.sample().await {
                Ok(frame) => frame,
                Err(e) => {
                    // A bad sample must not kill the timer; report and try
                    // again next tick
                    tracing::warn!(error = %e, "live sample failed");
                    let _ = events
                        .send(SessionEvent::CaptureFailed(e.to_string()))
                        .await;
                    continue;
                }
            }
        };

        let (language, text) = query.snapshot();
        dispatcher.spawn(Origin::Live, frame, language, text);
    }
}
