use thiserror::Error;

use crate::comfy::ComfyError;
use crate::job::{InputError, Stage};

/// Why a job did not produce outputs. Its `Display` is the `error` string
/// returned to the hosting runtime.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(
        "Could not parse input, ensure that you are providing a valid workflow (required) and workflow inputs (optional): {0}"
    )]
    Input(#[from] InputError),

    #[error(
        "Could not replace placeholders in the provided workflow, no input for: {}",
        .0.join(", ")
    )]
    UnresolvedPlaceholders(Vec<String>),

    #[error(
        "The workflow is no longer valid JSON after replacing placeholders, check the workflow inputs for characters that need escaping: {0}"
    )]
    MalformedWorkflow(#[source] serde_json::Error),

    #[error(
        "The ComfyUI server did not respond after {attempts} attempts ({waited_ms}ms). Please try again."
    )]
    Connectivity { attempts: u32, waited_ms: u64 },

    #[error("Failed to queue workflow: {0}")]
    Submission(#[source] ComfyError),

    #[error(
        "Failed to poll ComfyUI status during generation after {retries} retries ({elapsed_ms}ms): {cause}"
    )]
    Polling {
        retries: u32,
        elapsed_ms: u64,
        #[source]
        cause: ComfyError,
    },

    #[error(
        "ComfyUI did not produce any output after {attempts} polling attempts ({elapsed_ms}ms)."
    )]
    Timeout { attempts: u32, elapsed_ms: u64 },

    #[error("Could not extract outputs from the completed workflow: {0}")]
    Output(String),
}

impl JobError {
    /// The pipeline stage that raised this error.
    pub fn stage(&self) -> Stage {
        match self {
            JobError::Input(_) => Stage::Parse,
            JobError::UnresolvedPlaceholders(_) | JobError::MalformedWorkflow(_) => Stage::Resolve,
            JobError::Connectivity { .. } => Stage::Probe,
            JobError::Submission(_) => Stage::Submit,
            JobError::Polling { .. } | JobError::Timeout { .. } => Stage::Poll,
            JobError::Output(_) => Stage::Extract,
        }
    }
}

/// Errors from the Runpod serverless HTTP API used by the `remote` command.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Runpod API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Runpod accepted the job but returned no job id")]
    MissingJobId,

    #[error("Job {job_id} ended with status {status}: {detail}")]
    JobFailed {
        job_id: String,
        status: String,
        detail: String,
    },

    #[error("could not decode Runpod response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Application-level errors surfaced by the binary.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("ComfyUI client error: {0}")]
    Comfy(#[from] ComfyError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Output path {0:?} escapes the output directory")]
    InvalidOutputPath(String),

    #[error("Output {key:?} is not valid base64: {source}")]
    Base64 {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
