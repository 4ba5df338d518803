use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What the hosting runtime receives for every job.
///
/// Serializes to `{"error": "..."}` or `{"success": true, "outputs": {...}}`,
/// with a `warnings` array only when template diagnostics were raised.
/// Deserializing rejects `"success": false`, so a `Success` value always
/// carries `success: true`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobResult {
    Success {
        success: bool,
        outputs: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    Error {
        error: String,
    },
}

// An `error` field wins over a success-shaped body.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireResult {
    Error {
        error: String,
    },
    Success {
        success: bool,
        outputs: Map<String, Value>,
        #[serde(default)]
        warnings: Vec<String>,
    },
}

impl<'de> Deserialize<'de> for JobResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match WireResult::deserialize(deserializer)? {
            WireResult::Success {
                success: true,
                outputs,
                warnings,
            } => Ok(JobResult::success(outputs, warnings)),
            WireResult::Success { success: false, .. } => Err(de::Error::custom(
                "job result reports \"success\": false without an error message",
            )),
            WireResult::Error { error } => Ok(JobResult::error(error)),
        }
    }
}

impl JobResult {
    pub fn success(outputs: Map<String, Value>, warnings: Vec<String>) -> Self {
        JobResult::Success {
            success: true,
            outputs,
            warnings,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        JobResult::Error {
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { success: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_serializes_without_empty_warnings() {
        let mut outputs = Map::new();
        outputs.insert("out.png".into(), json!("aGk="));
        let value = serde_json::to_value(JobResult::success(outputs, vec![])).unwrap();
        assert_eq!(value, json!({"success": true, "outputs": {"out.png": "aGk="}}));
    }

    #[test]
    fn success_keeps_warnings() {
        let warnings = vec!["unused: seed".to_string()];
        let value = serde_json::to_value(JobResult::success(Map::new(), warnings)).unwrap();
        assert_eq!(
            value,
            json!({"success": true, "outputs": {}, "warnings": ["unused: seed"]})
        );
    }

    #[test]
    fn error_serializes_as_single_field() {
        let value = serde_json::to_value(JobResult::error("boom")).unwrap();
        assert_eq!(value, json!({"error": "boom"}));
    }

    #[test]
    fn deserializes_both_shapes() {
        let ok: JobResult =
            serde_json::from_value(json!({"success": true, "outputs": {"a": "b"}})).unwrap();
        assert!(ok.is_success());

        let err: JobResult = serde_json::from_value(json!({"error": "nope"})).unwrap();
        assert_eq!(err, JobResult::error("nope"));
        assert!(!err.is_success());
    }

    #[test]
    fn unsuccessful_success_shape_is_rejected() {
        let err = serde_json::from_value::<JobResult>(json!({"success": false, "outputs": {}}))
            .unwrap_err();
        assert!(err.to_string().contains("\"success\": false"));
    }

    #[test]
    fn deserialized_warnings_are_kept() {
        let result: JobResult = serde_json::from_value(json!({
            "success": true,
            "outputs": {},
            "warnings": ["unused: seed"]
        }))
        .unwrap();
        assert_eq!(result, JobResult::success(Map::new(), vec!["unused: seed".into()]));
    }
}
