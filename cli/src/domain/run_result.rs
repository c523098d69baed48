//! What one run of a module produced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use verify_common::{OutputValue, RunMode};

use crate::domain::error::{InvocationError, Operation};
use crate::domain::plan::PlanReport;

/// Captured output of one run. Produced once and discarded after the
/// expectations have been evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Mode that actually ran (may differ from the requested one).
    pub mode: RunMode,
    /// Textual output of validate, plan or apply.
    pub text: String,
    /// Named outputs. Empty unless the module was applied.
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputValue>,
    /// Plan summary when a plan was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanReport>,
}

impl RunResult {
    #[must_use]
    pub fn new(mode: RunMode, text: impl Into<String>) -> Self {
        Self {
            mode,
            text: text.into(),
            outputs: BTreeMap::new(),
            plan: None,
        }
    }

    #[must_use]
    pub fn with_outputs(mut self, outputs: BTreeMap<String, OutputValue>) -> Self {
        self.outputs = outputs;
        self
    }

    #[must_use]
    pub fn with_plan(mut self, plan: Option<PlanReport>) -> Self {
        self.plan = plan;
        self
    }

    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputValue> {
        self.outputs.get(name)
    }

    /// Whether named outputs were captured by this run.
    #[must_use]
    pub fn has_outputs(&self) -> bool {
        self.mode == RunMode::ApplyAndDestroy
    }
}

#[derive(Deserialize)]
struct OutputEntry {
    #[serde(default)]
    value: serde_json::Value,
}

/// Parse the document printed by `output -json`.
///
/// # Errors
///
/// Returns [`InvocationError::MalformedOutput`] if the document is not a
/// mapping of output entries.
pub fn parse_outputs(json: &str) -> Result<BTreeMap<String, OutputValue>, InvocationError> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(BTreeMap::new());
    }
    let entries: BTreeMap<String, OutputEntry> =
        serde_json::from_str(trimmed).map_err(|e| InvocationError::MalformedOutput {
            operation: Operation::Output,
            reason: e.to_string(),
        })?;
    Ok(entries
        .into_iter()
        .map(|(name, entry)| (name, OutputValue::from_json(&entry.value)))
        .collect())
}
