use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use super::error::ComfyError;
use super::types::{History, QueueRequest, QueueResponse};
use super::GenerationServer;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a single ComfyUI instance.
pub struct ComfyClient {
    client: Client,
    base_url: String,
}

impl ComfyClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:8188`).
    ///
    /// `request_timeout` bounds every individual request, including the body read.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ComfyError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
            .timeout(request_timeout)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`] so several jobs share one connection pool.
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // Returns the response unchanged on 2xx, otherwise an `Api` error with the body text.
    async fn ensure_success(response: Response) -> Result<Response, ComfyError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl GenerationServer for ComfyClient {
    async fn probe(&self) -> bool {
        match self.client.get(format!("{}/", self.base_url)).send().await {
            Ok(response) => {
                let ready = response.status() == StatusCode::OK;
                if !ready {
                    tracing::debug!(status = response.status().as_u16(), "ComfyUI not ready yet");
                }
                ready
            }
            Err(e) => {
                tracing::debug!(error = %e, "ComfyUI unreachable");
                false
            }
        }
    }

    async fn queue_workflow(&self, workflow: &str) -> Result<String, ComfyError> {
        let response = self
            .client
            .post(format!("{}/prompt", self.base_url))
            .json(&QueueRequest::from_workflow(workflow))
            .send()
            .await?;

        let queued = Self::ensure_success(response)
            .await?
            .json::<QueueResponse>()
            .await
            .map_err(ComfyError::Decode)?;

        match queued.prompt_id {
            Some(id) if !id.is_empty() => {
                tracing::debug!(prompt_id = %id, queue_number = ?queued.number, "workflow queued");
                Ok(id)
            }
            _ => Err(ComfyError::MissingPromptId),
        }
    }

    async fn history(&self, prompt_id: &str) -> Result<History, ComfyError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.base_url, prompt_id))
            .send()
            .await?;

        Self::ensure_success(response)
            .await?
            .json::<History>()
            .await
            .map_err(ComfyError::Decode)
    }
}
