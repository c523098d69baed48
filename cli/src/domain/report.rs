//! Per-case and per-suite reports.

use serde::{Deserialize, Serialize};
use verify_common::RunMode;

use crate::domain::expectation::Verdict;

/// How one case ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReport {
    pub name: String,
    pub requested_mode: RunMode,
    /// `None` when the case failed before any mode ran.
    pub effective_mode: Option<RunMode>,
    pub verdict: Verdict,
    /// Invocation, teardown or setup error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    /// `${name}` as expanded for this case.
    pub unique_name: String,
}

impl CaseReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.verdict.passed()
    }

    /// Whether the mode that ran differs from the one requested.
    #[must_use]
    pub fn downgraded(&self) -> bool {
        self.effective_mode
            .is_some_and(|mode| mode != self.requested_mode)
    }
}

/// Every case report of a suite run, in suite order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
    /// Cases not started because of `--fail-fast` or an interrupt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_run: Vec<String>,
    /// The run was cut short by Ctrl-C.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interrupted: bool,
}

impl SuiteReport {
    /// True when every case ran and passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.interrupted
            && self.not_run.is_empty()
            && self.cases.iter().all(CaseReport::passed)
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.cases.iter().filter(|c| !c.passed()).count()
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.cases.len() - self.failed_count()
    }
}
