//! Camera lifecycle tests
//!
//! Every hardware acquire must pair with exactly one release on every exit
//! path, including errors and teardown.

use std::sync::Arc;
use std::time::Duration;

use waysight::camera::{Camera, CameraState};
use waysight::{Config, Session};

mod common;

use common::{CountingSource, FakeBackend, FakeMode, SourceCounters, sample_result};

#[tokio::test]
async fn test_photograph_releases_the_camera() {
    let counters = SourceCounters::default();
    let mut camera = Camera::new(Box::new(CountingSource::new(counters.clone())));

    camera.open().await.unwrap();
    assert_eq!(camera.state(), CameraState::Streaming);
    assert_eq!(counters.opens(), 1);

    let frame = camera.photograph().await.unwrap();
    assert!(!frame.is_empty());

    // Capture-then-review: the handle is gone after a manual photo
    assert_eq!(camera.state(), CameraState::Inactive);
    assert_eq!(counters.closes(), 1);

    // Another photo needs a fresh acquisition
    assert!(camera.photograph().await.is_err());
    assert_eq!(counters.grabs(), 1);
}

#[tokio::test]
async fn test_failed_grab_still_releases() {
    let counters = SourceCounters::default();
    let mut camera = Camera::new(Box::new(CountingSource::failing_grabs(counters.clone())));

    camera.open().await.unwrap();
    assert!(camera.photograph().await.is_err());

    assert_eq!(camera.state(), CameraState::Inactive);
    assert_eq!(counters.opens(), 1);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let counters = SourceCounters::default();
    let mut camera = Camera::new(Box::new(CountingSource::new(counters.clone())));

    // Closing a never-opened camera does nothing
    camera.close();
    assert_eq!(counters.closes(), 0);

    camera.open().await.unwrap();
    camera.close();
    camera.close();

    assert_eq!(camera.state(), CameraState::Inactive);
    assert_eq!(counters.opens(), 1);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_sampling_keeps_the_camera_open() {
    let counters = SourceCounters::default();
    let mut camera = Camera::new(Box::new(CountingSource::new(counters.clone())));

    camera.open().await.unwrap();
    camera.sample().await.unwrap();
    camera.sample().await.unwrap();

    assert!(camera.is_open());
    assert_eq!(counters.grabs(), 2);
    assert_eq!(counters.closes(), 0);

    camera.close();
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_drop_releases_an_open_camera() {
    let counters = SourceCounters::default();
    {
        let mut camera = Camera::new(Box::new(CountingSource::new(counters.clone())));
        camera.open().await.unwrap();
    }
    assert_eq!(counters.opens(), 1);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_live_cycle_balances_acquires_and_releases() {
    let counters = SourceCounters::default();
    let backend = FakeBackend::new(FakeMode::Block(Box::new(sample_result("view"))));
    let gate = backend.gate();
    let mut session = Session::with_parts(
        Config::default(),
        Arc::new(backend),
        Box::new(CountingSource::new(counters.clone())),
    );

    session.open_camera().await.unwrap();
    session.start_live().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.live_active());

    // Stopping live mode leaves the stream open for a manual photo
    session.stop_live().await;
    assert_eq!(counters.closes(), 0);

    // Closing is unconditional and repeatable
    session.close_camera().await;
    session.close_camera().await;
    assert_eq!(counters.opens(), 1);
    assert_eq!(counters.closes(), 1);

    gate.notify_one();
}

#[tokio::test(start_paused = true)]
async fn test_photograph_rejected_during_live_mode() {
    let backend = FakeBackend::new(FakeMode::Block(Box::new(sample_result("view"))));
    let gate = backend.gate();
    let mut session = Session::with_parts(
        Config::default(),
        Arc::new(backend),
        Box::new(CountingSource::new(SourceCounters::default())),
    );

    session.open_camera().await.unwrap();
    session.start_live().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(session.take_photograph().await.is_err());

    session.stop_live().await;
    session.take_photograph().await.unwrap();

    session.close_camera().await;
    gate.notify_one();
}
