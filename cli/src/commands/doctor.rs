//! `infra-verify doctor`: toolchain diagnostics.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::doctor::run_doctor;
use crate::commands::Reported;
use crate::domain::ConfigOverrides;
use crate::infra::aws::AwsCli;
use crate::infra::terraform::TerraformCli;
use crate::output::TerminalReporter;

/// Run the doctor command. Exits 1 when any issue is found.
///
/// # Errors
///
/// Returns an error if configuration is invalid or issues were found.
pub async fn run(app: &AppContext) -> Result<()> {
    let config = app.load_config(ConfigOverrides::default())?;
    let tool = TerraformCli::from_config(&config);
    let cloud = AwsCli::from_config(&config);

    let checks = {
        let reporter = TerminalReporter::new(&app.output);
        run_doctor(&tool, &cloud, &reporter).await?
    };
    app.renderer().render_doctor(&checks)?;

    let issues = checks.issues();
    if issues.is_empty() {
        Ok(())
    } else {
        Err(Reported(issues.join("; ")).into())
    }
}
