//! Error types for the ComfyUI HTTP client.
//!
//! [`ComfyError`] separates a non-success status, a response missing the data we
//! need, an undecodable response body, and a request that never completed.

use thiserror::Error;

/// Errors that can occur while talking to a ComfyUI server.
#[derive(Debug, Error)]
pub enum ComfyError {
    /// The server returned a status outside the 2xx range.
    #[error("ComfyUI API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// `POST /prompt` succeeded but the body carried no usable `prompt_id`.
    #[error("ComfyUI accepted the workflow but returned no prompt_id")]
    MissingPromptId,

    /// A 2xx response whose body is not the expected JSON.
    #[error("could not decode ComfyUI response: {0}")]
    Decode(#[source] reqwest::Error),

    /// The request did not complete (connection refused, timeout).
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
}
