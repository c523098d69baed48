//! Application service: environment doctor use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::application::ports::{CloudInspector, ProgressReporter, ToolInspector};

/// Oldest provisioning tool release with the JSON interfaces relied upon.
pub const MIN_TOOL_VERSION: semver::Version = semver::Version::new(1, 0, 0);

/// Results of the environment checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorChecks {
    pub tool_found: bool,
    pub tool_version: Option<String>,
    pub tool_version_ok: bool,
    /// The cloud CLI is only needed for probes.
    pub cloud_cli_found: bool,
    pub cloud_cli_version: Option<String>,
}

impl DoctorChecks {
    /// Blocking problems, in display order.
    #[must_use]
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.tool_found {
            issues.push("terraform not found or not runnable".to_string());
        } else if !self.tool_version_ok {
            issues.push(format!(
                "terraform {} is too old (need >= {MIN_TOOL_VERSION})",
                self.tool_version.as_deref().unwrap_or("unknown")
            ));
        }
        issues
    }

    /// Non-blocking problems.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        if self.cloud_cli_found {
            Vec::new()
        } else {
            vec!["aws CLI not found; cases with probes will fail".to_string()]
        }
    }
}

#[derive(Deserialize)]
struct VersionJson {
    terraform_version: String,
}

/// Run every environment check.
///
/// # Errors
///
/// Never fails today; missing tools are reported in the checks.
pub async fn run_doctor(
    tool: &impl ToolInspector,
    cloud: &impl CloudInspector,
    reporter: &impl ProgressReporter,
) -> Result<DoctorChecks> {
    reporter.step("checking terraform...");
    let tool_version = match tool.tool_version().await {
        Ok(json) => Some(parse_tool_version(&json)),
        Err(e) => {
            tracing::debug!(error = %format!("{e:#}"), "terraform version failed");
            None
        }
    };
    let tool_version_ok = tool_version
        .as_ref()
        .and_then(|v| v.as_deref())
        .and_then(|v| semver::Version::parse(v).ok())
        .is_some_and(|v| v >= MIN_TOOL_VERSION);

    reporter.step("checking aws CLI...");
    let cloud_cli_version = cloud.cli_version().await.ok();

    reporter.success("diagnostics complete");

    Ok(DoctorChecks {
        tool_found: tool_version.is_some(),
        tool_version: tool_version.flatten(),
        tool_version_ok,
        cloud_cli_found: cloud_cli_version.is_some(),
        cloud_cli_version,
    })
}

/// Version string from `version -json`, or from the first line of the plain
/// `Terraform v1.7.5` banner printed by older releases.
fn parse_tool_version(output: &str) -> Option<String> {
    if let Ok(doc) = serde_json::from_str::<VersionJson>(output) {
        return Some(doc.terraform_version);
    }
    output
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .map(|v| v.trim_start_matches('v').to_string())
}
