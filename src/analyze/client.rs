//! HTTP client for the analysis service

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::camera::Frame;
use crate::{Error, Result};

use super::types::{AnalysisResult, HealthReport};

/// Backend that turns a frame plus question into an analysis result
///
/// The production impl talks HTTP; tests substitute in-memory fakes.
#[async_trait]
pub trait AnalyzeBackend: Send + Sync {
    /// Analyze one frame in the given language, optionally answering a query
    async fn analyze(&self, frame: &Frame, language: &str, query: &str)
        -> Result<AnalysisResult>;
}

/// Client for the remote analysis service
#[derive(Clone)]
pub struct AnalysisClient {
    client: reqwest::Client,
    base_url: String,
}

impl AnalysisClient {
    /// Create a client for the service at `base_url`
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Probe the service health endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the service is unreachable or answers non-2xx
    pub async fn health(&self) -> Result<HealthReport> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(server_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("health payload: {e}")))
    }
}

#[async_trait]
impl AnalyzeBackend for AnalysisClient {
    async fn analyze(
        &self,
        frame: &Frame,
        language: &str,
        query: &str,
    ) -> Result<AnalysisResult> {
        tracing::debug!(
            frame_bytes = frame.len(),
            language,
            query,
            "sending analysis request"
        );

        let part = reqwest::multipart::Part::bytes(frame.jpeg().to_vec())
            .file_name("capture.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| Error::Camera(e.to_string()))?;

        // Language and query always travel, even when empty
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("language", language.to_string())
            .text("query", query.to_string());

        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "analysis request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received analysis response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "analysis service error");
            return Err(server_error(status, &body));
        }

        let result: AnalysisResult = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("analysis payload: {e}")))?;

        tracing::info!(
            objects = result.objects.len(),
            hazards = result.hazards.len(),
            safe_to_walk = result.safe_to_walk,
            "analysis complete"
        );
        Ok(result)
    }
}

/// Map a non-2xx service answer to a user-visible error
///
/// The JSON body's `detail` field is the message when present; otherwise a
/// generic `Server error {status}`.
pub fn server_error(status: StatusCode, body: &str) -> Error {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: Option<String>,
    }

    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail);

    match detail {
        Some(detail) => Error::Server(detail),
        None => Error::Server(format!("Server error {}", status.as_u16())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_uses_detail_verbatim() {
        let err = server_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"detail":"model overloaded"}"#,
        );
        assert_eq!(err.to_string(), "model overloaded");
    }

    #[test]
    fn test_server_error_generic_without_detail() {
        let err = server_error(StatusCode::BAD_GATEWAY, "upstream exploded");
        assert_eq!(err.to_string(), "Server error 502");

        let err = server_error(StatusCode::SERVICE_UNAVAILABLE, "{}");
        assert_eq!(err.to_string(), "Server error 503");
    }
}
