//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::fmt;

use thiserror::Error;

// ── Tool operations ───────────────────────────────────────────────────────────

/// A single provisioning-tool subcommand, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Init,
    Validate,
    Plan,
    Show,
    Apply,
    Destroy,
    Output,
    Version,
    Probe,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Init => "init",
            Operation::Validate => "validate",
            Operation::Plan => "plan",
            Operation::Show => "show",
            Operation::Apply => "apply",
            Operation::Destroy => "destroy",
            Operation::Output => "output",
            Operation::Version => "version",
            Operation::Probe => "probe",
        })
    }
}

// ── Invocation errors ─────────────────────────────────────────────────────────

/// The provisioning tool could not complete an operation. Always fatal.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("{operation} failed (exit code {}): {detail}", exit_code_display(.exit_code))]
    ToolFailed {
        operation: Operation,
        exit_code: Option<i32>,
        detail: String,
    },

    #[error("{operation} returned output that could not be parsed: {reason}")]
    MalformedOutput { operation: Operation, reason: String },

    #[error("{program} timed out after {seconds}s")]
    TimedOut { program: String, seconds: u64 },
}

#[allow(clippy::ref_option)]
fn exit_code_display(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

// ── Teardown errors ───────────────────────────────────────────────────────────

/// Destroy failed after an apply. Resources may have been leaked.
#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("destroy of {module} failed, resources may be left behind: {detail}")]
    DestroyFailed { module: String, detail: String },
}

// ── Module errors ─────────────────────────────────────────────────────────────

/// Errors building a module under test.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module path is empty.")]
    EmptyPath,

    #[error("Module directory not found: {0}")]
    NotFound(String),

    #[error("Invalid variable name '{0}': must match ^[A-Za-z_][A-Za-z0-9_-]*$")]
    InvalidVarName(String),
}

// ── Expectation errors ────────────────────────────────────────────────────────

/// One or more expectations did not hold.
#[derive(Debug, Error)]
pub enum ExpectationError {
    #[error("{} expectation(s) failed:\n{}", .failures.len(), .failures.join("\n"))]
    Unmet { failures: Vec<String> },
}

// ── Suite errors ──────────────────────────────────────────────────────────────

/// Errors in a suite file that are detectable without running anything.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Suite has no cases.")]
    Empty,

    #[error("Duplicate case name '{0}'.")]
    DuplicateCase(String),

    #[error("Case name must not be empty.")]
    EmptyCaseName,

    #[error("No case named '{0}' in suite.")]
    UnknownCase(String),

    #[error("Case '{case}' uses unknown placeholder(s): {names}")]
    UnresolvedPlaceholder { case: String, names: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to verifier configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid region '{0}': expected something like ap-northeast-1")]
    InvalidRegion(String),

    #[error("Command timeout must be greater than zero.")]
    ZeroTimeout,

    #[error("Parallelism must be at least 1.")]
    ZeroParallel,

    #[error("Tool binary must not be empty ({0}).")]
    EmptyBinary(&'static str),

    #[error("'{0}' cannot be set under env: use the region setting instead.")]
    RegionInEnv(String),
}
