//! Single-flight dispatch of analysis requests
//!
//! At most one analysis request is outstanding at any time, whatever its
//! origin. Concurrent triggers are dropped or rejected, never queued: live
//! sampling sheds frames while the service is slow, and the manual trigger
//! reports busy instead of piling up.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::mpsc;

use crate::camera::Frame;
use crate::session::SessionEvent;

use super::client::AnalyzeBackend;

/// Who asked for the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// User pressed the trigger (photograph or uploaded image)
    Manual,
    /// Live-mode sampling timer
    Live,
}

/// In-flight state of the dispatch slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DispatchState {
    /// No request outstanding
    Idle = 0,
    /// A user-triggered request is outstanding
    ManualInFlight = 1,
    /// A live-sample request is outstanding
    LiveInFlight = 2,
}

/// The one request slot, shared between the live sampler and manual triggers
///
/// Acquisition is a single compare-and-set, so two triggers observing Idle
/// at the same moment cannot both win the slot.
#[derive(Clone, Default)]
pub struct DispatchSlot {
    state: Arc<AtomicU8>,
}

impl DispatchSlot {
    /// Create a slot in the Idle state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the slot for `origin`
    ///
    /// Returns false if a request is already in flight.
    pub fn try_acquire(&self, origin: Origin) -> bool {
        let next = match origin {
            Origin::Manual => DispatchState::ManualInFlight,
            Origin::Live => DispatchState::LiveInFlight,
        };
        self.state
            .compare_exchange(
                DispatchState::Idle as u8,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Return the slot to Idle
    ///
    /// Called on both success and failure so a failed request never leaves
    /// the client stuck busy.
    pub fn release(&self) {
        self.state
            .store(DispatchState::Idle as u8, Ordering::Release);
    }

    /// Current slot state
    #[must_use]
    pub fn state(&self) -> DispatchState {
        match self.state.load(Ordering::Acquire) {
            1 => DispatchState::ManualInFlight,
            2 => DispatchState::LiveInFlight,
            _ => DispatchState::Idle,
        }
    }

    /// Whether a request is outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state() != DispatchState::Idle
    }
}

/// Dispatches analysis requests under the single-flight discipline
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn AnalyzeBackend>,
    slot: DispatchSlot,
    events: mpsc::Sender<SessionEvent>,
}

impl Dispatcher {
    /// Create a dispatcher publishing outcomes on `events`
    pub fn new(
        backend: Arc<dyn AnalyzeBackend>,
        slot: DispatchSlot,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            backend,
            slot,
            events,
        }
    }

    /// The shared slot, for busy checks by the live sampler
    #[must_use]
    pub fn slot(&self) -> DispatchSlot {
        self.slot.clone()
    }

    /// Try to start an analysis in a background task
    ///
    /// Returns false when the slot is busy: live frames are dropped
    /// silently, manual callers surface the refusal to the user. Language
    /// and query are whatever the UI state holds at send time, not at the
    /// frame's capture time.
    pub fn spawn(&self, origin: Origin, frame: Frame, language: String, query: String) -> bool {
        if !self.slot.try_acquire(origin) {
            tracing::debug!(?origin, "request in flight, frame dropped");
            return false;
        }

        let this = self.clone();
        tokio::spawn(async move {
            this.run_acquired(origin, frame, &language, &query).await;
        });
        true
    }

    /// Run one analysis to completion, slot already held
    async fn run_acquired(&self, origin: Origin, frame: Frame, language: &str, query: &str) {
        let outcome = self.backend.analyze(&frame, language, query).await;

        // Idle again before the outcome is published, success or failure
        self.slot.release();

        let event = match outcome {
            Ok(result) => SessionEvent::AnalysisReady {
                origin,
                result: Box::new(result),
            },
            Err(e) => {
                tracing::warn!(?origin, error = %e, "analysis failed");
                SessionEvent::AnalysisFailed {
                    origin,
                    message: e.to_string(),
                }
            }
        };

        if self.events.send(event).await.is_err() {
            tracing::debug!("session event channel closed, outcome discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_single_flight() {
        let slot = DispatchSlot::new();
        assert_eq!(slot.state(), DispatchState::Idle);

        assert!(slot.try_acquire(Origin::Live));
        assert_eq!(slot.state(), DispatchState::LiveInFlight);

        // Both origins lose while a request is in flight
        assert!(!slot.try_acquire(Origin::Live));
        assert!(!slot.try_acquire(Origin::Manual));

        slot.release();
        assert_eq!(slot.state(), DispatchState::Idle);
        assert!(slot.try_acquire(Origin::Manual));
        assert_eq!(slot.state(), DispatchState::ManualInFlight);
    }

    #[test]
    fn test_slot_shared_between_clones() {
        let slot = DispatchSlot::new();
        let other = slot.clone();

        assert!(slot.try_acquire(Origin::Manual));
        assert!(other.is_busy());

        other.release();
        assert!(!slot.is_busy());
    }
}
