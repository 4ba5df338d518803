//! Validation and decoding of the raw job payload.
//!
//! The hosting runtime hands us either a JSON object or a JSON-encoded string.
//! [`parse`] turns that into the workflow text plus the optional placeholder map.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// The job envelope delivered by the hosting runtime.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
}

impl Job {
    pub fn new(input: Value) -> Self {
        Self {
            id: None,
            input: Some(input),
        }
    }
}

/// A validated job input.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInput {
    /// Workflow text, still templated.
    pub workflow: String,
    /// Placeholder values; `None` when `workflow_inputs` was absent or null.
    pub inputs: Option<Map<String, Value>>,
    /// The workflow was a JSON object or array before substitution, either given
    /// as structured JSON or as text that parses to one.
    pub structured: bool,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("No input provided, ensure you at least pass a workflow.")]
    Missing,

    #[error("Could not parse job input as a JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("The job input must be a JSON object, got {0}.")]
    NotAnObject(&'static str),

    #[error(
        r#"No workflow provided, ensure you have a non null value for the "workflow" input field."#
    )]
    MissingWorkflow,

    #[error("The input workflow is empty, ensure you are passing a valid workflow.")]
    EmptyWorkflow,

    #[error("The workflow must be a string or a JSON object, got {0}.")]
    InvalidWorkflow(&'static str),

    #[error("Could not parse workflow input as a JSON: {0}")]
    InputsDecode(#[source] serde_json::Error),

    #[error(r#"The "workflow_inputs" field must be a JSON object, got {0}."#)]
    InputsNotMapping(&'static str),
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Validate and decode a job input into its workflow and placeholder map.
pub fn parse(job_input: Option<&Value>) -> Result<ParsedInput, InputError> {
    let decoded;
    let input = match job_input {
        None | Some(Value::Null) => return Err(InputError::Missing),
        Some(Value::String(raw)) => {
            decoded = serde_json::from_str::<Value>(raw).map_err(InputError::Decode)?;
            &decoded
        }
        Some(other) => other,
    };

    let object = match input {
        Value::Object(object) => object,
        Value::Null => return Err(InputError::Missing),
        other => return Err(InputError::NotAnObject(kind(other))),
    };

    let (workflow, structured) = match object.get("workflow") {
        None | Some(Value::Null) => return Err(InputError::MissingWorkflow),
        Some(Value::String(text)) if text.is_empty() => return Err(InputError::EmptyWorkflow),
        Some(Value::String(text)) => (text.clone(), is_json_document(text)),
        Some(Value::Object(map)) if map.is_empty() => return Err(InputError::EmptyWorkflow),
        Some(Value::Array(items)) if items.is_empty() => return Err(InputError::EmptyWorkflow),
        Some(graph @ (Value::Object(_) | Value::Array(_))) => (graph.to_string(), true),
        Some(other) => return Err(InputError::InvalidWorkflow(kind(other))),
    };

    let inputs = match object.get("workflow_inputs") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => {
            match serde_json::from_str::<Value>(raw).map_err(InputError::InputsDecode)? {
                Value::Null => None,
                Value::Object(map) => Some(map),
                other => return Err(InputError::InputsNotMapping(kind(&other))),
            }
        }
        Some(Value::Object(map)) => Some(map.clone()),
        Some(other) => return Err(InputError::InputsNotMapping(kind(other))),
    };

    Ok(ParsedInput {
        workflow,
        inputs,
        structured,
    })
}

fn is_json_document(text: &str) -> bool {
    matches!(
        serde_json::from_str::<Value>(text),
        Ok(Value::Object(_) | Value::Array(_))
    )
}
