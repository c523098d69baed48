//! Report colors, applied through an owo-colors stylesheet.

use owo_colors::Style;

/// Every color the reports use. All styles are plain until [`Styles::colorize`].
#[derive(Default, Clone)]
pub struct Styles {
    /// `✓` marks and the passing summary
    pub passed: Style,
    /// `✗` marks, case errors and the failing summary
    pub failed: Style,
    /// Skipped checks, downgrades and cases cut by `--fail-fast`
    pub skipped: Style,
    /// The `→` step marker when no spinner is shown
    pub step: Style,
    /// Mode and duration after a case name
    pub detail: Style,
    pub case_name: Style,
    pub header: Style,
}

impl Styles {
    /// Switch on terminal colors.
    pub fn colorize(&mut self) {
        self.passed = Style::new().green();
        self.failed = Style::new().red().bold();
        self.skipped = Style::new().yellow();
        self.step = Style::new().blue();
        self.detail = Style::new().dimmed();
        self.case_name = Style::new().bold();
        self.header = Style::new().bold().cyan();
    }
}
