//! HTTP client for a domain service's `$batch` endpoint

use super::batch::BatchRequest;
use super::client::{BatchEnvelope, BatchResponse, EnrichmentClient, EnrichmentError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Default path of the multiplexed batch endpoint.
pub const DEFAULT_BATCH_PATH: &str = "$batch";

/// Posts one batch per call to `{base_url}/{batch_path}`. Single attempt.
pub struct HttpEnrichmentClient {
    client: Client,
    base_url: String,
    batch_path: String,
}

impl HttpEnrichmentClient {
    /// Create a client with its own connection pool.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                EnrichmentError::Transport(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            batch_path: DEFAULT_BATCH_PATH.to_string(),
        })
    }

    pub fn with_batch_path(mut self, path: impl Into<String>) -> Self {
        self.batch_path = path.into().trim_start_matches('/').to_string();
        self
    }

    pub fn batch_url(&self) -> String {
        format!("{}/{}", self.base_url, self.batch_path)
    }
}

#[async_trait]
impl EnrichmentClient for HttpEnrichmentClient {
    async fn send_batch(
        &self,
        requests: &[BatchRequest],
    ) -> Result<BatchResponse, EnrichmentError> {
        let response = self
            .client
            .post(self.batch_url())
            .header("Content-Type", "application/json")
            .json(&BatchEnvelope { requests })
            .send()
            .await
            .map_err(|e| EnrichmentError::Transport(format!("batch request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EnrichmentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| EnrichmentError::Decode(format!("failed to parse batch response: {}", e)))
    }
}

impl std::fmt::Debug for HttpEnrichmentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEnrichmentClient")
            .field("base_url", &self.base_url)
            .field("batch_path", &self.batch_path)
            .finish()
    }
}
