//! REST client for the Hospital Directory HTTP endpoints.
//!
//! Wraps hospital creation and batch activation using [`reqwest`] and
//! implements [`DirectoryClient`] for the batch processor.

use std::time::Duration;

use async_trait::async_trait;
use hospital_core::directory::{CreateHospital, CreatedHospital, DirectoryClient, DirectoryError};
use hospital_core::types::BatchId;

/// Connection settings for the directory service.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Base HTTP URL, e.g. `http://directory:8000`.
    pub base_url: String,
    /// Time allowed to establish a TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Time allowed for a whole request, connect included.
    pub request_timeout: Duration,
}

/// Errors from the directory REST layer.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, body
    /// decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The directory returned a non-2xx status code.
    #[error("Directory API error ({status}): {body}")]
    ApiError {
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl From<DirectoryApiError> for DirectoryError {
    fn from(err: DirectoryApiError) -> Self {
        match err {
            DirectoryApiError::Request(e) if e.is_decode() => Self::Malformed(e.to_string()),
            DirectoryApiError::Request(e) => Self::Transport(e.to_string()),
            DirectoryApiError::ApiError { status, body } => Self::Rejected { status, body },
        }
    }
}

/// HTTP client for one directory deployment.
pub struct DirectoryApi {
    client: reqwest::Client,
    base_url: String,
}

impl DirectoryApi {
    /// Build a client with the configured connect and request timeouts.
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, &config.base_url))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a hospital with `POST /hospitals/`.
    pub async fn create(&self, request: &CreateHospital) -> Result<CreatedHospital, DirectoryApiError> {
        let response = self
            .client
            .post(format!("{}/hospitals/", self.base_url))
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Activate a batch with `PATCH /hospitals/batch/{batch_id}/activate`.
    pub async fn activate(&self, batch_id: BatchId) -> Result<(), DirectoryApiError> {
        let response = self
            .client
            .patch(format!("{}/hospitals/batch/{}/activate", self.base_url, batch_id))
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    // ---- private helpers ----

    /// Return the response unchanged on 2xx, or an
    /// [`DirectoryApiError::ApiError`] carrying status and body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, DirectoryApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(DirectoryApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DirectoryApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl DirectoryClient for DirectoryApi {
    async fn create_hospital(
        &self,
        request: &CreateHospital,
    ) -> Result<CreatedHospital, DirectoryError> {
        self.create(request).await.map_err(|e| {
            tracing::debug!(
                batch_id = %request.creation_batch_id,
                name = %request.name,
                error = %e,
                "Hospital creation failed",
            );
            DirectoryError::from(e)
        })
    }

    async fn activate_batch(&self, batch_id: BatchId) -> Result<(), DirectoryError> {
        self.activate(batch_id).await.map_err(DirectoryError::from)
    }
}
