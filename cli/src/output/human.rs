//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::application::services::doctor::{DoctorChecks, MIN_TOOL_VERSION};
use crate::domain::expectation::{Checked, Outcome};
use crate::domain::{CaseReport, SuiteReport};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        println!("infra-verify {version}");
    }

    /// Render the result of a suite run. Failures are printed even when quiet.
    pub fn render_suite_report(&self, report: &SuiteReport) {
        if !self.ctx.quiet {
            println!();
            self.ctx.header("Results:");
        }
        for case in &report.cases {
            if case.passed() && self.ctx.quiet {
                continue;
            }
            self.render_case(case);
        }
        for name in &report.not_run {
            self.ctx.warn(&format!("{name}: not run"));
        }

        let summary = format_summary(report);
        if report.passed() {
            if !self.ctx.quiet {
                println!();
                self.ctx.success(&summary);
            }
        } else {
            eprintln!();
            self.ctx.error(&summary);
        }
    }

    fn render_case(&self, case: &CaseReport) {
        let mode = match case.effective_mode {
            Some(mode) if mode != case.requested_mode => {
                format!("{mode}, requested {}", case.requested_mode)
            }
            Some(mode) => mode.to_string(),
            None => case.requested_mode.to_string(),
        };
        let detail = format!(
            "({mode}, {})",
            format_duration(case.duration_ms)
        );
        if case.passed() {
            println!(
                "  {} {} {}",
                "✓".style(self.ctx.styles.passed),
                case.name.style(self.ctx.styles.case_name),
                detail.style(self.ctx.styles.detail)
            );
        } else {
            println!(
                "  {} {} {}",
                "✗".style(self.ctx.styles.failed),
                case.name.style(self.ctx.styles.case_name),
                detail.style(self.ctx.styles.detail)
            );
        }
        for check in &case.verdict.checks {
            self.render_check_line(check);
        }
        if let Some(error) = &case.error {
            for (i, line) in error.lines().enumerate() {
                let prefix = if i == 0 { "error:" } else { "      " };
                println!("      {} {line}", prefix.style(self.ctx.styles.failed));
            }
        }
    }

    fn render_check_line(&self, check: &Checked) {
        match &check.outcome {
            Outcome::Passed => {
                if !self.ctx.quiet {
                    println!(
                        "      {} {}",
                        "✓".style(self.ctx.styles.passed),
                        check.check
                    );
                }
            }
            Outcome::Failed { message } => {
                println!("      {} {message}", "✗".style(self.ctx.styles.failed));
            }
            Outcome::Skipped { reason } => {
                if !self.ctx.quiet {
                    println!(
                        "      {} {} {}",
                        "-".style(self.ctx.styles.skipped),
                        check.check,
                        format!("(skipped: {reason})").style(self.ctx.styles.detail)
                    );
                }
            }
        }
    }

    /// Render the result of `check`.
    pub fn render_check(&self, suite: &str, cases: usize) {
        self.ctx.success(&format!(
            "{suite}: {cases} case{} OK",
            if cases == 1 { "" } else { "s" }
        ));
    }

    /// Render doctor results.
    pub fn render_doctor(&self, checks: &DoctorChecks) {
        println!();
        println!("  {}", "infra-verify doctor".style(self.ctx.styles.header));
        println!();

        println!("  Provisioning tool:");
        if checks.tool_found {
            let ver = checks.tool_version.as_deref().unwrap_or("unknown");
            self.print_check(
                checks.tool_version_ok,
                &format!("terraform {ver} (need \u{2265} {MIN_TOOL_VERSION})"),
            );
        } else {
            self.print_check(false, "terraform not found");
            println!("      Install: https://developer.hashicorp.com/terraform/install");
        }
        println!();

        println!("  Cloud CLI (probes only):");
        match &checks.cloud_cli_version {
            Some(version) => self.print_check(true, version),
            None => println!(
                "    {} aws CLI not found",
                "\u{26a0}".style(self.ctx.styles.skipped)
            ),
        }
        println!();

        let issues = checks.issues();
        if issues.is_empty() {
            println!(
                "  {} Everything looks good!",
                "\u{2713}".style(self.ctx.styles.passed)
            );
        } else {
            println!(
                "  {} Found {} issue{}.",
                "\u{2717}".style(self.ctx.styles.failed),
                issues.len(),
                if issues.len() == 1 { "" } else { "s" }
            );
        }
        println!();
    }

    fn print_check(&self, ok: bool, msg: &str) {
        if ok {
            println!("    {} {msg}", "\u{2713}".style(self.ctx.styles.passed));
        } else {
            println!("    {} {msg}", "\u{2717}".style(self.ctx.styles.failed));
        }
    }
}

// ── Display helpers (used by tests and output layer) ─────────────────────────

/// `1.2s`, `3m 04s`, or `850ms`.
#[must_use]
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        return format!("{ms}ms");
    }
    let secs = ms / 1000;
    if secs < 60 {
        return format!("{secs}.{}s", (ms % 1000) / 100);
    }
    format!("{}m {:02}s", secs / 60, secs % 60)
}

/// `2 passed, 1 failed, 1 not run (interrupted)`.
#[must_use]
pub fn format_summary(report: &SuiteReport) -> String {
    let mut summary = format!(
        "{} passed, {} failed",
        report.passed_count(),
        report.failed_count()
    );
    if !report.not_run.is_empty() {
        summary.push_str(&format!(", {} not run", report.not_run.len()));
    }
    if report.interrupted {
        summary.push_str(" (interrupted)");
    }
    summary
}
