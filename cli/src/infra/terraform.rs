//! Infrastructure implementation of the provisioning-tool ports.
//!
//! `TerraformCli<R>` routes every terraform call through a `CommandRunner`.
//! Each call runs with `-chdir=<module>` and `-no-color`, and with the base
//! environment merged under the module's own environment.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::process::Output;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::application::ports::{CommandRunner, ModuleWorkflow, PlanCapture, ToolInspector};
use crate::domain::error::{InvocationError, Operation};
use crate::domain::{ModuleUnderTest, VerifierConfig};
use crate::infra::command_runner::{QUERY_TIMEOUT, TokioCommandRunner};

/// Plans never take the state lock, so they can run next to each other.
const PLAN_ARGS: [&str; 4] = ["plan", "-input=false", "-lock=false", "-no-color"];

/// Adapter that drives the terraform CLI.
///
/// Generic over `R: CommandRunner` so that tests can inject a mock runner
/// without spawning real processes.
pub struct TerraformCli<R: CommandRunner> {
    runner: R,
    binary: String,
    base_env: BTreeMap<String, String>,
}

impl<R: CommandRunner> TerraformCli<R> {
    pub fn new(runner: R, binary: impl Into<String>, base_env: BTreeMap<String, String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
            base_env,
        }
    }

    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn env_for(&self, module: &ModuleUnderTest) -> BTreeMap<String, String> {
        let mut env = self.base_env.clone();
        env.extend(module.env().iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }

    /// Run one subcommand in the module directory and fail on non-zero exit.
    async fn invoke(
        &self,
        operation: Operation,
        module: &ModuleUnderTest,
        args: &[&str],
    ) -> Result<String> {
        let chdir = format!("-chdir={}", module.path().display());
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(chdir.as_str());
        full.extend_from_slice(args);
        debug!(%operation, module = %module.label(), args = ?full, "terraform");
        let output = self
            .runner
            .run(&self.binary, &full, &self.env_for(module))
            .await
            .with_context(|| format!("terraform {operation}"))?;
        check_status(operation, &output)?;
        Ok(combined_text(&output))
    }

    async fn invoke_with_vars(
        &self,
        operation: Operation,
        module: &ModuleUnderTest,
        args: &[&str],
    ) -> Result<String> {
        let var_file = write_var_file(module)?;
        let var_arg = var_file
            .as_ref()
            .map(|f| format!("-var-file={}", f.path().display()));
        let mut full = args.to_vec();
        if let Some(arg) = var_arg.as_deref() {
            full.push(arg);
        }
        self.invoke(operation, module, &full).await
    }
}

impl TerraformCli<TokioCommandRunner> {
    /// Production adapter for `config`.
    #[must_use]
    pub fn from_config(config: &VerifierConfig) -> Self {
        Self::new(
            TokioCommandRunner::new(config.command_timeout()),
            config.terraform_bin.clone(),
            config.base_env(),
        )
    }
}

impl<R: CommandRunner> ModuleWorkflow for TerraformCli<R> {
    fn module_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    async fn init(&self, module: &ModuleUnderTest) -> Result<String> {
        self.invoke(Operation::Init, module, &["init", "-input=false", "-no-color"])
            .await
    }

    async fn validate(&self, module: &ModuleUnderTest) -> Result<String> {
        self.invoke(Operation::Validate, module, &["validate", "-no-color"])
            .await
    }

    async fn plan(&self, module: &ModuleUnderTest, structured: bool) -> Result<PlanCapture> {
        if !structured {
            let text = self
                .invoke_with_vars(Operation::Plan, module, &PLAN_ARGS)
                .await?;
            return Ok(PlanCapture {
                text,
                show_json: None,
            });
        }

        let plan_file = tempfile::Builder::new()
            .prefix("infra-verify-")
            .suffix(".tfplan")
            .tempfile()
            .context("creating plan file")?;
        let out_arg = format!("-out={}", plan_file.path().display());
        let mut args = PLAN_ARGS.to_vec();
        args.push(&out_arg);
        let text = self.invoke_with_vars(Operation::Plan, module, &args).await?;

        let plan_path = plan_file.path().display().to_string();
        let show = self
            .invoke(Operation::Show, module, &["show", "-json", "-no-color", plan_path.as_str()])
            .await?;
        Ok(PlanCapture {
            text,
            show_json: Some(show),
        })
    }

    async fn apply(&self, module: &ModuleUnderTest) -> Result<String> {
        self.invoke_with_vars(
            Operation::Apply,
            module,
            &["apply", "-auto-approve", "-input=false", "-no-color"],
        )
        .await
    }

    async fn destroy(&self, module: &ModuleUnderTest) -> Result<String> {
        self.invoke_with_vars(
            Operation::Destroy,
            module,
            &["destroy", "-auto-approve", "-input=false", "-no-color"],
        )
        .await
    }

    async fn output_json(&self, module: &ModuleUnderTest) -> Result<String> {
        let chdir = format!("-chdir={}", module.path().display());
        let output = self
            .runner
            .run(
                &self.binary,
                &[chdir.as_str(), "output", "-json", "-no-color"],
                &self.env_for(module),
            )
            .await
            .context("terraform output")?;
        check_status(Operation::Output, &output)?;
        // Only stdout: warnings on stderr would corrupt the JSON document.
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl<R: CommandRunner> ToolInspector for TerraformCli<R> {
    async fn tool_version(&self) -> Result<String> {
        let output = self
            .runner
            .run_with_timeout(&self.binary, &["version", "-json"], &self.base_env, QUERY_TIMEOUT)
            .await
            .context("terraform version")?;
        check_status(Operation::Version, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Write the module's variables to a temporary `*.tfvars.json` file.
///
/// Returns `None` when the module has no variables. The file is removed when
/// the returned handle drops.
fn write_var_file(module: &ModuleUnderTest) -> Result<Option<NamedTempFile>> {
    if module.vars().is_empty() {
        return Ok(None);
    }
    let mut file = tempfile::Builder::new()
        .prefix("infra-verify-")
        .suffix(".tfvars.json")
        .tempfile()
        .context("creating var file")?;
    file.write_all(module.tfvars_json()?.as_bytes())
        .context("writing var file")?;
    file.flush().context("writing var file")?;
    Ok(Some(file))
}

fn check_status(operation: Operation, output: &Output) -> Result<(), InvocationError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.trim().to_string()
    };
    Err(InvocationError::ToolFailed {
        operation,
        exit_code: output.status.code(),
        detail,
    })
}

fn combined_text(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}
