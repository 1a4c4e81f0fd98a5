//! Camera capture
//!
//! Owns the camera hardware handle and produces still JPEG frames, either
//! on demand (photograph) or on a fixed cadence (live mode). The hardware
//! itself sits behind the [`FrameSource`] trait; the shipped source is a
//! network snapshot camera (`http` module).

mod http;
mod live;

use async_trait::async_trait;

pub use http::HttpFrameSource;
pub use live::LiveMode;

use crate::{Error, Result};

/// Smallest byte count a frame can have and still be a real image; the
/// service rejects anything under this as empty.
pub const MIN_IMAGE_BYTES: usize = 100;

/// One captured still image: encoded JPEG bytes
///
/// Immutable; a frame has no identity beyond the capture that produced it.
#[derive(Debug, Clone)]
pub struct Frame {
    jpeg: Vec<u8>,
}

impl Frame {
    /// Wrap encoded JPEG bytes
    #[must_use]
    pub fn new(jpeg: Vec<u8>) -> Self {
        Self { jpeg }
    }

    /// Read a frame from an image file on disk (the manual upload path)
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is too small to be an
    /// image
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let jpeg = std::fs::read(path)?;
        if jpeg.len() < MIN_IMAGE_BYTES {
            return Err(Error::Camera(format!(
                "image file appears empty: {}",
                path.display()
            )));
        }
        Ok(Self { jpeg })
    }

    /// The encoded image bytes
    #[must_use]
    pub fn jpeg(&self) -> &[u8] {
        &self.jpeg
    }

    /// Encoded size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.jpeg.len()
    }

    /// Whether the frame holds no bytes at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jpeg.is_empty()
    }
}

/// The camera hardware seam
///
/// `open` acquires the device, `close` releases it; the two must pair on
/// every exit path. `grab` samples whatever the device currently sees.
#[async_trait]
pub trait FrameSource: Send {
    /// Acquire the device
    async fn open(&mut self) -> Result<()>;

    /// Sample the current frame; only valid while open
    async fn grab(&mut self) -> Result<Frame>;

    /// Release the device; must be idempotent
    fn close(&mut self);
}

/// Capture lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    /// No hardware handle held
    Inactive,
    /// Handle held, waiting for a photograph or live mode
    Streaming,
    /// Handle held, live sampling timer running
    LiveSampling,
}

/// Owns the camera handle; at most one active handle at a time
pub struct Camera {
    source: Box<dyn FrameSource>,
    state: CameraState,
}

impl Camera {
    /// Create a camera over the given frame source
    #[must_use]
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            state: CameraState::Inactive,
        }
    }

    /// Acquire the hardware stream
    ///
    /// No-op if already open. Permission or availability failures surface
    /// to the user as-is; there is no retry.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `DeviceUnavailable` from the source
    pub async fn open(&mut self) -> Result<()> {
        if self.state != CameraState::Inactive {
            return Ok(());
        }
        self.source.open().await?;
        self.state = CameraState::Streaming;
        tracing::debug!("camera acquired");
        Ok(())
    }

    /// Capture exactly one frame, then release the camera
    ///
    /// The handle is dropped after a manual photo so the user can review
    /// the capture; another photograph needs a fresh acquisition.
    ///
    /// # Errors
    ///
    /// Returns error if the camera is not streaming or the grab fails
    pub async fn photograph(&mut self) -> Result<Frame> {
        if self.state != CameraState::Streaming {
            return Err(Error::Camera(
                "photograph requires an open camera outside live mode".to_string(),
            ));
        }
        let grabbed = self.source.grab().await;
        // Release on the error path too, so a failed grab never leaks the
        // handle
        self.close();
        grabbed
    }

    /// Sample one frame without releasing the camera (live mode)
    ///
    /// # Errors
    ///
    /// Returns error if the camera is closed or the grab fails
    pub async fn sample(&mut self) -> Result<Frame> {
        if self.state == CameraState::Inactive {
            return Err(Error::Camera("camera is not open".to_string()));
        }
        self.source.grab().await
    }

    /// Record whether the live sampling timer is running
    pub fn set_live_sampling(&mut self, live: bool) {
        self.state = match (self.state, live) {
            (CameraState::Streaming, true) => CameraState::LiveSampling,
            (CameraState::LiveSampling, false) => CameraState::Streaming,
            (state, _) => state,
        };
    }

    /// Release the hardware handle
    ///
    /// Safe to call from any state; idempotent.
    pub fn close(&mut self) {
        if self.state != CameraState::Inactive {
            self.source.close();
            self.state = CameraState::Inactive;
            tracing::debug!("camera released");
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> CameraState {
        self.state
    }

    /// Whether a hardware handle is held
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state != CameraState::Inactive
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        // Teardown counts as an exit path: the acquire must still pair with
        // a release
        self.close();
    }
}
