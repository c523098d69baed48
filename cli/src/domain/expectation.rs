//! Expectation evaluation. Pure: a run result in, outcomes out.

use serde::{Deserialize, Serialize};
use verify_common::{Expectation, OutputValue, Predicate, RunMode};

use crate::domain::error::ExpectationError;
use crate::domain::run_result::RunResult;

/// Result of checking one expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { message: String },
    Skipped { reason: String },
}

impl Outcome {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }
}

/// One evaluated check, labelled for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checked {
    /// Human description, e.g. `output contains "aws_lb.main"`.
    pub check: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Outcomes of every check of a case, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub checks: Vec<Checked>,
}

impl Verdict {
    pub fn push(&mut self, check: impl Into<String>, outcome: Outcome) {
        self.checks.push(Checked {
            check: check.into(),
            outcome,
        });
    }

    /// True when nothing failed. Skipped checks do not fail a verdict.
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.checks.iter().any(|c| c.outcome.is_failed())
    }

    /// Failure messages in declaration order.
    #[must_use]
    pub fn failures(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter_map(|c| match &c.outcome {
                Outcome::Failed { message } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.checks.iter().filter(|c| c.outcome.is_skipped()).count()
    }

    /// Panic with every failure message. For use inside `#[test]` functions.
    ///
    /// # Panics
    ///
    /// Panics if any check failed.
    #[track_caller]
    pub fn assert_passed(&self) {
        if !self.passed() {
            panic!(
                "{} expectation(s) failed:\n{}",
                self.failures().len(),
                self.failures().join("\n")
            );
        }
    }

    /// # Errors
    ///
    /// Returns [`ExpectationError::Unmet`] listing every failure.
    pub fn into_result(self) -> Result<(), ExpectationError> {
        if self.passed() {
            return Ok(());
        }
        Err(ExpectationError::Unmet {
            failures: self.failures().into_iter().map(str::to_string).collect(),
        })
    }
}

/// Check one expectation against a run result.
#[must_use]
pub fn evaluate(expectation: &Expectation, result: &RunResult) -> Outcome {
    if result.mode == RunMode::SyntaxCheck {
        return Outcome::Skipped {
            reason: "a syntax check only reports success or failure".to_string(),
        };
    }
    if expectation.predicate.needs_outputs() && !result.has_outputs() {
        return Outcome::Skipped {
            reason: format!("named outputs are not produced in {} mode", result.mode),
        };
    }
    match check(&expectation.predicate, result) {
        Ok(()) => Outcome::Passed,
        Err(detail) => Outcome::Failed {
            message: failure_message(expectation, &detail),
        },
    }
}

/// Check every expectation. Never stops at the first failure.
#[must_use]
pub fn evaluate_all(expectations: &[Expectation], result: &RunResult) -> Verdict {
    let mut verdict = Verdict::default();
    for expectation in expectations {
        verdict.push(expectation.to_string(), evaluate(expectation, result));
    }
    verdict
}

fn failure_message(expectation: &Expectation, detail: &str) -> String {
    match &expectation.message {
        Some(msg) => format!("{msg}: expected {expectation}, {detail}"),
        None => format!("expected {expectation}, {detail}"),
    }
}

fn check(predicate: &Predicate, result: &RunResult) -> Result<(), String> {
    match predicate {
        Predicate::OutputContains { text } => {
            if result.text.contains(text.as_str()) {
                Ok(())
            } else {
                Err("not found in output".to_string())
            }
        }
        Predicate::OutputNotContains { text } => {
            if result.text.contains(text.as_str()) {
                Err("but it was present".to_string())
            } else {
                Ok(())
            }
        }
        Predicate::OutputNotEmpty => {
            if result.text.trim().is_empty() {
                Err("output was empty".to_string())
            } else {
                Ok(())
            }
        }
        Predicate::NamedEquals { name, value } => {
            let actual = named(result, name)?;
            let matches = match actual {
                OutputValue::Str(s) => s == value,
                other => other.to_string() == *value,
            };
            if matches {
                Ok(())
            } else {
                Err(format!("got {:?}", actual.to_string()))
            }
        }
        Predicate::NamedContains { name, value } => {
            let actual = named(result, name)?;
            if actual.contains(value) {
                Ok(())
            } else {
                Err(format!("got {actual}"))
            }
        }
        Predicate::NamedNotEmpty { name } => {
            if named(result, name)?.is_empty() {
                Err("value was empty".to_string())
            } else {
                Ok(())
            }
        }
        Predicate::NamedLen { name, len } => {
            let actual = named(result, name)?.len();
            if actual == *len {
                Ok(())
            } else {
                Err(format!("got {actual}"))
            }
        }
        Predicate::NamedHasKey { name, key } => {
            let actual = named(result, name)?;
            match actual.as_map() {
                Some(map) if map.contains_key(key) => Ok(()),
                Some(map) => Err(format!(
                    "keys were [{}]",
                    map.keys().cloned().collect::<Vec<_>>().join(", ")
                )),
                None => Err(format!("value is not a map: {actual}")),
            }
        }
        Predicate::ResourceCounts {
            add,
            change,
            destroy,
        } => {
            let Some(plan) = &result.plan else {
                return Err("no plan summary was captured".to_string());
            };
            let wanted = [(add, plan.add), (change, plan.change), (destroy, plan.destroy)];
            if wanted
                .iter()
                .all(|(want, got)| want.is_none_or(|w| w == *got))
            {
                Ok(())
            } else {
                Err(format!(
                    "plan reports {} to add, {} to change, {} to destroy",
                    plan.add, plan.change, plan.destroy
                ))
            }
        }
    }
}

fn named<'a>(result: &'a RunResult, name: &str) -> Result<&'a OutputValue, String> {
    result
        .output(name)
        .ok_or_else(|| format!("no output named `{name}`"))
}
