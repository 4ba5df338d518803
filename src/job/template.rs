//! `{{name}}` placeholder substitution over workflow text.
//!
//! Matching is purely lexical: the workflow is never parsed, and substituted
//! text is not scanned again, so a value containing `{{other}}` stays literal.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Regex matching `{{name}}` tokens; the name is captured without braces.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("valid regex"));

/// A workflow after substitution, plus what did not line up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub workflow: String,
    /// Input keys that no placeholder referenced, sorted.
    pub unused_inputs: Vec<String>,
    /// Placeholder names with no matching input, sorted.
    pub unresolved_placeholders: Vec<String>,
}

impl Resolution {
    /// Human-readable diagnostics, one per non-empty category.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.unused_inputs.is_empty() {
            warnings.push(format!(
                "Unused workflow inputs (no matching placeholder): {}",
                self.unused_inputs.join(", ")
            ));
        }
        if !self.unresolved_placeholders.is_empty() {
            warnings.push(format!(
                "Unresolved placeholders (no matching input): {}",
                self.unresolved_placeholders.join(", ")
            ));
        }
        warnings
    }
}

/// String form of an input value as it is spliced into the workflow.
fn render(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

/// Substitute every `{{name}}` whose name is a key of `inputs`.
///
/// Unknown placeholders are left as-is. `None` behaves like an empty map.
pub fn resolve(workflow: &str, inputs: Option<&Map<String, Value>>) -> Resolution {
    let empty = Map::new();
    let inputs = inputs.unwrap_or(&empty);

    let mut seen = BTreeSet::new();
    let mut consumed = BTreeSet::new();

    let resolved = PLACEHOLDER_RE.replace_all(workflow, |caps: &Captures<'_>| {
        let name = &caps[1];
        seen.insert(name.to_string());
        match inputs.get(name) {
            Some(value) => {
                consumed.insert(name.to_string());
                render(value).into_owned()
            }
            None => caps[0].to_string(),
        }
    });

    Resolution {
        workflow: resolved.into_owned(),
        unused_inputs: inputs
            .keys()
            .filter(|key| !consumed.contains(key.as_str()))
            .cloned()
            .collect(),
        unresolved_placeholders: seen.difference(&consumed).cloned().collect(),
    }
}

/// Distinct placeholder names referenced by `workflow`, sorted.
pub fn extract_placeholders(workflow: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .captures_iter(workflow)
        .map(|caps| caps[1].to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
