//! JSON output.
//!
//! Every `--json` code path prints one pretty-printed document to stdout.
//! Failures print the error object from [`format_error`] instead.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::services::doctor::DoctorChecks;
use crate::domain::SuiteReport;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Renders domain types as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// `{ "passed": bool, "summary": {...}, "interrupted": bool, "cases": [...], "not_run": [...] }`
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_suite_report(report: &SuiteReport) -> Result<()> {
        print_json(&suite_report_value(report))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_check(suite: &str, cases: usize) -> Result<()> {
        print_json(&serde_json::json!({
            "suite": suite,
            "cases": cases,
            "valid": true,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_doctor(checks: &DoctorChecks) -> Result<()> {
        print_json(&serde_json::json!({
            "status": if checks.issues().is_empty() { "healthy" } else { "unhealthy" },
            "checks": checks,
            "issues": checks.issues(),
            "warnings": checks.warnings(),
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        print_json(&serde_json::json!({ "version": version }))
    }
}

/// The document printed for a suite run.
#[must_use]
pub fn suite_report_value(report: &SuiteReport) -> serde_json::Value {
    serde_json::json!({
        "passed": report.passed(),
        "summary": {
            "passed": report.passed_count(),
            "failed": report.failed_count(),
            "not_run": report.not_run.len(),
        },
        "interrupted": report.interrupted,
        "cases": report.cases,
        "not_run": report.not_run,
    })
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
    println!("{text}");
    Ok(())
}
