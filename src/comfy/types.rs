//! Wire types for the ComfyUI `/prompt` and `/history` endpoints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /prompt`.
#[derive(Debug, Clone, Serialize)]
pub struct QueueRequest {
    /// The workflow in ComfyUI API format, or its raw text when it is not JSON.
    pub prompt: Value,
}

impl QueueRequest {
    /// Build a request from resolved workflow text.
    ///
    /// Text that parses as JSON is embedded as a JSON value, which is what
    /// ComfyUI executes. Anything else is sent verbatim as a JSON string.
    pub fn from_workflow(workflow: &str) -> Self {
        let prompt = serde_json::from_str::<Value>(workflow)
            .unwrap_or_else(|_| Value::String(workflow.to_string()));
        Self { prompt }
    }
}

/// Response of `POST /prompt`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueResponse {
    /// Identifier used to poll `/history/{prompt_id}`.
    #[serde(default)]
    pub prompt_id: Option<String>,
    /// Position in the server's execution queue.
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub node_errors: Option<Value>,
}

/// One entry of the `/history/{prompt_id}` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Produced artifacts keyed by output name. Absent or empty while running.
    #[serde(default)]
    pub outputs: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
}

impl HistoryRecord {
    /// The outputs object, if present and non-empty.
    pub fn non_empty_outputs(&self) -> Option<&Map<String, Value>> {
        match &self.outputs {
            Some(Value::Object(map)) if !map.is_empty() => Some(map),
            _ => None,
        }
    }
}

/// The `/history/{prompt_id}` response: tracking id to record.
pub type History = HashMap<String, HistoryRecord>;
