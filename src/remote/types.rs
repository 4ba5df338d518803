//! Request and response bodies of the Runpod serverless `run`/`status` endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /{endpoint}/run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest<'a> {
    pub input: RunInput<'a>,
}

/// The job input, in the shape the bridge's input parser accepts.
#[derive(Debug, Clone, Serialize)]
pub struct RunInput<'a> {
    pub workflow: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_inputs: Option<&'a Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `GET /{endpoint}/status/{job_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: String,
    /// The handler's return value once the job has completed.
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Runpod job status, folded into what the poll loop needs to decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Pending,
    Completed,
    Failed,
}

impl RemoteStatus {
    /// Map a raw status string. Unknown values count as pending.
    pub fn classify(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "completed" | "success" => RemoteStatus::Completed,
            "failed" | "error" | "cancelled" | "timed_out" => RemoteStatus::Failed,
            _ => RemoteStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_request_omits_absent_inputs() {
        let workflow = json!({"1": {"class_type": "SaveImage"}});
        let req = RunRequest {
            input: RunInput {
                workflow: &workflow,
                workflow_inputs: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"input": {"workflow": {"1": {"class_type": "SaveImage"}}}})
        );
    }

    #[test]
    fn classify_statuses() {
        assert_eq!(RemoteStatus::classify("IN_QUEUE"), RemoteStatus::Pending);
        assert_eq!(RemoteStatus::classify("IN_PROGRESS"), RemoteStatus::Pending);
        assert_eq!(RemoteStatus::classify("COMPLETED"), RemoteStatus::Completed);
        assert_eq!(RemoteStatus::classify("FAILED"), RemoteStatus::Failed);
        assert_eq!(RemoteStatus::classify("TIMED_OUT"), RemoteStatus::Failed);
        assert_eq!(RemoteStatus::classify("SOMETHING_NEW"), RemoteStatus::Pending);
    }

    #[test]
    fn status_response_from_api_format() {
        let resp: StatusResponse = serde_json::from_value(json!({
            "id": "abc",
            "status": "COMPLETED",
            "delayTime": 120,
            "output": {"success": true, "outputs": {}}
        }))
        .unwrap();
        assert_eq!(resp.status, "COMPLETED");
        assert!(resp.output.is_some());
        assert!(resp.error.is_none());
    }
}
