//! Verifier configuration schema and validators.
//!
//! Pure functions only: no I/O, no async, no filesystem access. Loading from
//! the config file and the process environment lives in `crate::infra::config`.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_REGION: &str = "ap-northeast-1";
pub const DEFAULT_TERRAFORM_BIN: &str = "terraform";
pub const DEFAULT_AWS_BIN: &str = "aws";
/// Apply and destroy of a full environment can take a long time.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 3600;

/// Environment variable carrying the region to every invocation.
pub const REGION_ENV: &str = "AWS_DEFAULT_REGION";

/// Variables that select a region, highest precedence first. At config level
/// they must come from `region`, which is also what probes query.
pub const REGION_VARS: [&str; 2] = ["AWS_REGION", REGION_ENV];

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").expect("valid region regex"));

// ── Config schema ────────────────────────────────────────────────────────────

/// Everything the verifier needs from its surroundings, passed in explicitly
/// at construction time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    /// Region exported as `AWS_DEFAULT_REGION` to every invocation.
    pub region: String,
    /// Downgrade apply-and-destroy cases to plan-only.
    pub plan_only: bool,
    /// Provisioning tool binary.
    pub terraform_bin: String,
    /// AWS CLI binary, used by probes only.
    pub aws_bin: String,
    /// Per-invocation timeout; the process is killed when exceeded.
    pub command_timeout_secs: u64,
    /// Save plans and read them back with `show -json`.
    pub structured_plan: bool,
    /// Maximum number of cases run at once.
    pub parallel: usize,
    /// Copy each module to a private directory before running it.
    pub isolate: bool,
    /// Extra environment for every invocation.
    pub env: BTreeMap<String, String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            plan_only: false,
            terraform_bin: DEFAULT_TERRAFORM_BIN.to_string(),
            aws_bin: DEFAULT_AWS_BIN.to_string(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            structured_plan: true,
            parallel: 1,
            isolate: false,
            env: BTreeMap::new(),
        }
    }
}

impl VerifierConfig {
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Environment shared by every invocation: automation markers, the
    /// region, then the configured extras.
    #[must_use]
    pub fn base_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::from([
            ("TF_IN_AUTOMATION".to_string(), "1".to_string()),
            ("TF_INPUT".to_string(), "0".to_string()),
            (REGION_ENV.to_string(), self.region.clone()),
        ]);
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

/// Field-by-field overrides applied on top of a loaded config. `None` keeps
/// the existing value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub region: Option<String>,
    pub plan_only: Option<bool>,
    pub terraform_bin: Option<String>,
    pub command_timeout_secs: Option<u64>,
    pub parallel: Option<usize>,
    pub isolate: Option<bool>,
}

impl ConfigOverrides {
    /// Apply these overrides to `config`.
    pub fn apply(self, config: &mut VerifierConfig) {
        if let Some(region) = self.region {
            config.region = region;
        }
        if let Some(plan_only) = self.plan_only {
            config.plan_only = plan_only;
        }
        if let Some(bin) = self.terraform_bin {
            config.terraform_bin = bin;
        }
        if let Some(secs) = self.command_timeout_secs {
            config.command_timeout_secs = secs;
        }
        if let Some(parallel) = self.parallel {
            config.parallel = parallel;
        }
        if let Some(isolate) = self.isolate {
            config.isolate = isolate;
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a fully layered configuration.
///
/// # Errors
///
/// Returns the first invalid setting found.
pub fn validate_config(config: &VerifierConfig) -> Result<()> {
    if !REGION_RE.is_match(&config.region) {
        return Err(ConfigError::InvalidRegion(config.region.clone()).into());
    }
    if config.command_timeout_secs == 0 {
        return Err(ConfigError::ZeroTimeout.into());
    }
    if config.parallel == 0 {
        return Err(ConfigError::ZeroParallel.into());
    }
    if config.terraform_bin.trim().is_empty() {
        return Err(ConfigError::EmptyBinary("terraform_bin").into());
    }
    if config.aws_bin.trim().is_empty() {
        return Err(ConfigError::EmptyBinary("aws_bin").into());
    }
    if let Some(key) = REGION_VARS.iter().find(|k| config.env.contains_key(**k)) {
        return Err(ConfigError::RegionInEnv((*key).to_string()).into());
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
