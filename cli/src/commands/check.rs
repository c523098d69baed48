//! `infra-verify check`: static validation of a suite file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::suite::check_suite;
use crate::domain::ConfigOverrides;
use crate::infra::fs::load_suite;

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Suite file (YAML)
    pub suite: PathBuf,
}

/// Parse the suite and check names and placeholders. Terraform is never run.
///
/// # Errors
///
/// Returns an error if the suite cannot be read or is invalid.
pub fn run(app: &AppContext, args: &CheckArgs) -> Result<()> {
    let config = app.load_config(ConfigOverrides::default())?;
    let loaded = load_suite(&args.suite)?;
    check_suite(&loaded.suite, &config.region)?;
    app.renderer()
        .render_check(&args.suite.display().to_string(), loaded.suite.cases.len())
}
