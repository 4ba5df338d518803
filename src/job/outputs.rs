//! Output extraction from a completed history record, and optional persistence
//! of base64-encoded artifacts to disk.

use std::path::{Component, Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

use super::JobResult;
use crate::comfy::HistoryRecord;
use crate::error::{JobError, RelayError};

/// Return the outputs object of a completed record unchanged.
pub fn extract(record: HistoryRecord) -> Result<Map<String, Value>, JobError> {
    match record.outputs {
        Some(Value::Object(outputs)) => Ok(outputs),
        Some(other) => Err(JobError::Output(format!(
            "expected an outputs object, got {other}"
        ))),
        None => Err(JobError::Output("the history record has no outputs".into())),
    }
}

// Joins `key` under `dir` after dropping leading slashes; rejects anything that
// would escape `dir`.
fn output_path(dir: &Path, key: &str) -> Result<PathBuf, RelayError> {
    let relative = Path::new(key.trim_start_matches('/'));
    let escapes = relative.components().any(|c| {
        matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
    });
    if escapes || relative.as_os_str().is_empty() {
        return Err(RelayError::InvalidOutputPath(key.to_string()));
    }
    Ok(dir.join(relative))
}

/// Decode every base64 string in `outputs` and write it to `dir/<key>`.
///
/// Parent directories are created as needed. Values that are not strings are
/// skipped with a warning. Returns the written paths in key order.
pub fn save_outputs(outputs: &Map<String, Value>, dir: &Path) -> Result<Vec<PathBuf>, RelayError> {
    let mut written = Vec::with_capacity(outputs.len());
    for (key, value) in outputs {
        let Value::String(encoded) = value else {
            tracing::warn!(output = %key, "skipping output that is not a base64 string");
            continue;
        };

        let path = output_path(dir, key)?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|source| RelayError::Base64 {
                key: key.clone(),
                source,
            })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), "saved output");
        written.push(path);
    }
    Ok(written)
}

/// Save the outputs of a successful result to `dir`.
///
/// A failed save turns the result into an error so callers never report
/// success for outputs that are not on disk. Error results pass through.
pub fn save_result_outputs(result: JobResult, dir: &Path) -> JobResult {
    let JobResult::Success { outputs, .. } = &result else {
        return result;
    };
    match save_outputs(outputs, dir) {
        Ok(written) => {
            tracing::info!(files = written.len(), dir = %dir.display(), "outputs saved");
            result
        }
        Err(e) => {
            tracing::error!(dir = %dir.display(), "saving outputs failed: {e}");
            JobResult::error(format!("Failed to save outputs: {e}"))
        }
    }
}
