//! The suite spinner shown while cases run, built on indicatif.

#![allow(clippy::expect_used)] // Template is a compile-time constant

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(100);

/// A spinner showing the current step and the time spent so far.
///
/// # Panics
///
/// Never in practice: the template is a constant.
#[must_use]
pub fn spinner(msg: &str) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .template("  {spinner:.cyan} {msg} {elapsed:.dim}")
        .expect("valid spinner template");
    let pb = ProgressBar::new_spinner().with_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(TICK);
    pb
}

/// Stop a spinner and erase its line, leaving the printed case lines above.
pub fn finish_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}
