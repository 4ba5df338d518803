use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::{Map, Value};
use tokio::time::sleep;

use super::types::{RemoteStatus, RunInput, RunRequest, RunResponse, StatusResponse};
use crate::error::RemoteError;

const API_URL: &str = "https://api.runpod.ai/v2";

/// Client for one Runpod serverless endpoint running the bridge.
pub struct RunpodClient {
    api_key: String,
    endpoint_id: String,
    client: Client,
    base_url: String,
}

impl RunpodClient {
    pub fn new(api_key: String, endpoint_id: String) -> Result<Self, RemoteError> {
        Self::with_base_url(api_key, endpoint_id, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(
        api_key: String,
        endpoint_id: String,
        base_url: String,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            api_key,
            endpoint_id,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RemoteError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Submit a workflow (and optional placeholder values); returns the Runpod job id.
    pub async fn run(
        &self,
        workflow: &Value,
        inputs: Option<&Map<String, Value>>,
    ) -> Result<String, RemoteError> {
        let body = RunRequest {
            input: RunInput {
                workflow,
                workflow_inputs: inputs,
            },
        };
        let response = self
            .client
            .post(format!("{}/{}/run", self.base_url, self.endpoint_id))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let accepted = Self::ensure_success(response)
            .await?
            .json::<RunResponse>()
            .await
            .map_err(RemoteError::Decode)?;
        accepted
            .id
            .filter(|id| !id.is_empty())
            .ok_or(RemoteError::MissingJobId)
    }

    pub async fn status(&self, job_id: &str) -> Result<StatusResponse, RemoteError> {
        let response = self
            .client
            .get(format!(
                "{}/{}/status/{}",
                self.base_url, self.endpoint_id, job_id
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::ensure_success(response)
            .await?
            .json::<StatusResponse>()
            .await
            .map_err(RemoteError::Decode)
    }

    /// Poll the job status every `interval` until it completes or fails.
    ///
    /// `on_poll` is called with the poll count and raw status after each poll.
    pub async fn wait_for_completion(
        &self,
        job_id: &str,
        interval: Duration,
        mut on_poll: impl FnMut(u32, &str),
    ) -> Result<StatusResponse, RemoteError> {
        let mut polls = 0u32;
        loop {
            polls += 1;
            let status = self.status(job_id).await?;
            on_poll(polls, &status.status);

            match RemoteStatus::classify(&status.status) {
                RemoteStatus::Completed => return Ok(status),
                RemoteStatus::Failed => {
                    let detail = status
                        .error
                        .as_ref()
                        .or(status.output.as_ref())
                        .map(Value::to_string)
                        .unwrap_or_default();
                    return Err(RemoteError::JobFailed {
                        job_id: job_id.to_string(),
                        status: status.status,
                        detail,
                    });
                }
                RemoteStatus::Pending => sleep(interval).await,
            }
        }
    }
}
