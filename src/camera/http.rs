//! Network snapshot camera
//!
//! Reads still JPEG frames from an IP-webcam style snapshot endpoint: one
//! GET returns whatever the sensor currently sees.

use async_trait::async_trait;

use crate::{Error, Result};

use super::{Frame, FrameSource, MIN_IMAGE_BYTES};

/// Frame source backed by a snapshot URL
pub struct HttpFrameSource {
    client: reqwest::Client,
    url: String,
    connected: bool,
}

impl HttpFrameSource {
    /// Create a source for the camera at `url`
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            connected: false,
        }
    }
}

#[async_trait]
impl FrameSource for HttpFrameSource {
    async fn open(&mut self) -> Result<()> {
        // The probe doubles as the permission check: the endpoint either
        // hands out frames or it doesn't
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            Error::DeviceUnavailable(format!("camera endpoint unreachable: {e}"))
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::PermissionDenied(format!(
                "camera endpoint refused access ({status})"
            )));
        }
        if !status.is_success() {
            return Err(Error::DeviceUnavailable(format!(
                "camera endpoint answered {status}"
            )));
        }

        self.connected = true;
        tracing::debug!(url = %self.url, "camera stream opened");
        Ok(())
    }

    async fn grab(&mut self) -> Result<Frame> {
        if !self.connected {
            return Err(Error::Camera("camera is not open".to_string()));
        }

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Camera(format!("frame fetch failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Camera(format!("camera answered {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Camera(format!("frame read failed: {e}")))?;

        if bytes.len() < MIN_IMAGE_BYTES {
            return Err(Error::Camera("camera returned an empty frame".to_string()));
        }

        tracing::trace!(bytes = bytes.len(), "frame grabbed");
        Ok(Frame::new(bytes.to_vec()))
    }

    fn close(&mut self) {
        if self.connected {
            self.connected = false;
            tracing::debug!(url = %self.url, "camera stream closed");
        }
    }
}
