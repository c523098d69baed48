//! `TerminalReporter`: Presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// - `step()` updates the spinner, or prints `"  → {message}"` without one
/// - `success()` prints `"  ✓ {message}"`
/// - `warn()` prints `"  ! {message}"`
///
/// Everything is suppressed when `ctx.quiet`. Lines are printed above the
/// spinner so it keeps spinning at the bottom while cases run.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    spinner: Option<ProgressBar>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    ///
    /// A spinner is shown only when progress output is enabled.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        let spinner = ctx.show_progress().then(|| progress::spinner("starting..."));
        Self { ctx, spinner }
    }

    /// Remove the spinner, if any.
    pub fn finish(&self) {
        if let Some(pb) = &self.spinner {
            progress::finish_clear(pb);
        }
    }

    fn line(&self, line: String) {
        match &self.spinner {
            Some(pb) => pb.println(line),
            None => println!("{line}"),
        }
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        match &self.spinner {
            Some(pb) => pb.set_message(message.to_string()),
            None => println!("  {} {message}", "→".style(self.ctx.styles.step)),
        }
    }

    fn success(&self, message: &str) {
        if !self.ctx.quiet {
            self.line(format!("  {} {message}", "✓".style(self.ctx.styles.passed)));
        }
    }

    fn warn(&self, message: &str) {
        if !self.ctx.quiet {
            self.line(format!("  {} {message}", "!".style(self.ctx.styles.skipped)));
        }
    }
}
