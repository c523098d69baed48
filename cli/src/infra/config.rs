//! Configuration loading: defaults, then the YAML file, then the environment.
//!
//! Command-line overrides are applied afterwards by the caller.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::config::{ConfigOverrides, VerifierConfig};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "INFRA_VERIFY_CONFIG";

/// Environment variables read on top of the config file.
///
/// `envy` maps each field to the upper-cased variable name.
#[derive(Debug, Default, Deserialize)]
struct EnvLayer {
    aws_default_region: Option<String>,
    /// CI switch: `"true"` downgrades apply-and-destroy to plan-only.
    terratest_plan_only: Option<String>,
    infra_verify_terraform_bin: Option<String>,
    infra_verify_timeout: Option<u64>,
    infra_verify_config: Option<PathBuf>,
}

impl EnvLayer {
    fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        envy::from_iter(vars).context("invalid INFRA_VERIFY_* / AWS_DEFAULT_REGION environment")
    }

    fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            region: self.aws_default_region.filter(|r| !r.is_empty()),
            plan_only: self.terratest_plan_only.map(|v| v == "true"),
            terraform_bin: self.infra_verify_terraform_bin,
            command_timeout_secs: self.infra_verify_timeout,
            ..ConfigOverrides::default()
        }
    }
}

/// The variables whose name and value are both valid UTF-8. None of the
/// variables read here can hold anything else, and unrelated ones may.
fn utf8_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
}

/// Loads `VerifierConfig` from a YAML file and the process environment.
pub struct YamlConfigStore {
    path_override: Option<PathBuf>,
}

impl YamlConfigStore {
    /// `path_override` is the `--config` flag, if given.
    #[must_use]
    pub fn new(path_override: Option<PathBuf>) -> Self {
        Self { path_override }
    }

    /// Load from the real process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if an environment variable has an invalid value.
    pub fn load(&self) -> Result<VerifierConfig> {
        self.load_from(utf8_vars(std::env::vars_os()))
    }

    /// Load with an explicit environment, used by tests.
    ///
    /// # Errors
    ///
    /// See [`YamlConfigStore::load`].
    pub fn load_from(
        &self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<VerifierConfig> {
        let env = EnvLayer::from_vars(vars)?;
        let path = self.resolve_path(env.infra_verify_config.as_deref());
        let mut config = match path {
            Some(path) => read_file(&path, self.path_override.is_some())?,
            None => VerifierConfig::default(),
        };
        env.into_overrides().apply(&mut config);
        Ok(config)
    }

    /// The config file that would be read, if any location is known.
    fn resolve_path(&self, env_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = &self.path_override {
            return Some(path.clone());
        }
        if let Some(path) = env_path {
            return Some(path.to_path_buf());
        }
        dirs::config_dir().map(|d| d.join("infra-verify").join("config.yaml"))
    }
}

/// Read one config file. A missing default file means defaults; a missing
/// file named explicitly with `--config` is an error.
fn read_file(path: &Path, required: bool) -> Result<VerifierConfig> {
    if !path.exists() {
        if required {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Ok(VerifierConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(VerifierConfig::default());
    }
    serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
}
