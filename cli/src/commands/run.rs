//! `infra-verify run`: run the cases of a suite.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use verify_common::RunMode;

use crate::app::AppContext;
use crate::application::services::suite::{
    SuiteOptions, check_suite, run_suite_until, select_cases,
};
use crate::application::services::verifier::Verifier;
use crate::commands::Reported;
use crate::domain::{ConfigOverrides, NamingStrategy};
use crate::infra::aws::AwsCli;
use crate::infra::fs::{LocalFs, load_suite};
use crate::infra::terraform::TerraformCli;
use crate::output::TerminalReporter;
use crate::output::human::format_summary;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Suite file (YAML)
    pub suite: PathBuf,

    /// Only run this case (repeatable)
    #[arg(long = "case", value_name = "NAME")]
    pub cases: Vec<String>,

    /// Run every case in this mode
    #[arg(long, value_enum)]
    pub mode: Option<RunMode>,

    /// Cases run at once
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Stop starting new cases after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Copy each module to a temporary directory before running it
    #[arg(long)]
    pub isolate: bool,

    /// Cloud region exposed to modules and probes
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Downgrade apply-and-destroy cases to plan-only
    #[arg(long)]
    pub plan_only: bool,

    /// terraform binary to invoke
    #[arg(long, value_name = "PATH")]
    pub terraform: Option<String>,

    /// Per-invocation timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            region: self.region.clone(),
            plan_only: self.plan_only.then_some(true),
            terraform_bin: self.terraform.clone(),
            command_timeout_secs: self.timeout,
            parallel: self.parallel,
            isolate: self.isolate.then_some(true),
        }
    }
}

/// Resolves on the first Ctrl-C. Later ones are absorbed by the handler, so
/// running cases still get to destroy what they applied.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Entry point for `infra-verify run`.
///
/// # Errors
///
/// Returns an error if the suite is invalid, the user declines, or any case
/// fails.
pub async fn run(app: &AppContext, args: &RunArgs) -> Result<()> {
    let config = app.load_config(args.overrides())?;
    let loaded = load_suite(&args.suite)?;
    check_suite(&loaded.suite, &config.region)?;

    let options = SuiteOptions {
        cases: args.cases.clone(),
        mode: args.mode,
        parallel: config.parallel,
        fail_fast: args.fail_fast,
        isolate: config.isolate,
        naming: NamingStrategy::default(),
    };
    let verifier = Verifier::new(TerraformCli::from_config(&config), config.clone());

    let provisions = select_cases(&loaded.suite, &options.cases)?
        .iter()
        .any(|case| {
            verifier
                .effective_mode(options.mode.unwrap_or(case.mode))
                .provisions()
        });
    if provisions
        && !app.confirm(
            "This suite creates real infrastructure and destroys it afterwards. Continue?",
            true,
        )?
    {
        anyhow::bail!("aborted");
    }

    let cloud = AwsCli::from_config(&config);
    let report = {
        let reporter = TerminalReporter::new(&app.output);
        run_suite_until(
            &verifier,
            &cloud,
            &LocalFs,
            &reporter,
            &loaded.suite,
            &loaded.base_dir,
            &options,
            interrupted(),
        )
        .await?
    };
    app.renderer().render_suite_report(&report)?;

    if report.passed() {
        Ok(())
    } else {
        Err(Reported(format_summary(&report)).into())
    }
}
