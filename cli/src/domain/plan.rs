//! Plan summaries, from the textual plan or from `show -json`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::{InvocationError, Operation};

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Plan: (?:\d+ to import, )?(\d+) to add, (\d+) to change, (\d+) to destroy",
    )
    .expect("valid plan summary regex")
});

/// One resource the plan would touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChange {
    /// Resource address, e.g. `aws_lb.main`.
    pub address: String,
    /// Planned actions, e.g. `["create"]` or `["delete", "create"]`.
    pub actions: Vec<String>,
}

/// What a plan would do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanReport {
    pub add: u32,
    pub change: u32,
    pub destroy: u32,
    /// Empty when only the textual summary was available.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_changes: Vec<ResourceChange>,
}

impl PlanReport {
    /// Parse the summary line of a textual plan.
    ///
    /// Returns `None` when the text carries neither a `Plan:` summary nor a
    /// `No changes.` notice.
    #[must_use]
    pub fn from_text(text: &str) -> Option<Self> {
        if let Some(caps) = SUMMARY_RE.captures(text) {
            let count = |i: usize| caps[i].parse::<u32>().unwrap_or(u32::MAX);
            return Some(Self {
                add: count(1),
                change: count(2),
                destroy: count(3),
                resource_changes: Vec::new(),
            });
        }
        text.contains("No changes.").then(Self::default)
    }

    /// Build a report from the JSON printed by `show -json <planfile>`.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError::MalformedOutput`] if the document is not a
    /// plan representation.
    pub fn from_show_json(json: &str) -> Result<Self, InvocationError> {
        let doc: ShowJson =
            serde_json::from_str(json).map_err(|e| InvocationError::MalformedOutput {
                operation: Operation::Show,
                reason: e.to_string(),
            })?;
        let mut report = Self::default();
        for rc in doc.resource_changes {
            let actions = rc.change.actions;
            let has = |a: &str| actions.iter().any(|x| x == a);
            if has("create") {
                report.add += 1;
            }
            if has("delete") {
                report.destroy += 1;
            }
            if has("update") {
                report.change += 1;
            }
            if actions.iter().all(|a| a == "no-op" || a == "read") {
                continue;
            }
            report.resource_changes.push(ResourceChange {
                address: rc.address,
                actions,
            });
        }
        Ok(report)
    }

    /// Addresses of every resource the plan would touch.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.resource_changes.iter().map(|rc| rc.address.as_str())
    }
}

#[derive(Deserialize)]
struct ShowJson {
    #[serde(default)]
    resource_changes: Vec<ShowResourceChange>,
}

#[derive(Deserialize)]
struct ShowResourceChange {
    address: String,
    change: ShowChange,
}

#[derive(Deserialize)]
struct ShowChange {
    #[serde(default)]
    actions: Vec<String>,
}
