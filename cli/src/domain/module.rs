//! The module under test: a directory plus the inputs it is driven with.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use verify_common::VarValue;

use crate::domain::error::ModuleError;

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static VAR_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid var name regex"));

/// A module directory and its input parameters. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleUnderTest {
    path: PathBuf,
    vars: BTreeMap<String, VarValue>,
    env: BTreeMap<String, String>,
}

impl ModuleUnderTest {
    /// Start building a module rooted at `path`.
    pub fn builder(path: impl Into<PathBuf>) -> ModuleBuilder {
        ModuleBuilder {
            path: path.into(),
            vars: BTreeMap::new(),
            env: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn vars(&self) -> &BTreeMap<String, VarValue> {
        &self.vars
    }

    /// Environment added on top of the verifier's base environment.
    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// The same inputs, pointed at another directory (a staged copy).
    #[must_use]
    pub fn relocated(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..self.clone()
        }
    }

    /// The variables as a `*.tfvars.json` document.
    ///
    /// # Errors
    ///
    /// Returns an error if a float variable is not finite.
    pub fn tfvars_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.vars)?)
    }

    /// Short label for logs and reports.
    #[must_use]
    pub fn label(&self) -> String {
        self.path.display().to_string()
    }
}

/// Builder for [`ModuleUnderTest`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ModuleBuilder {
    path: PathBuf,
    vars: BTreeMap<String, VarValue>,
    env: BTreeMap<String, String>,
}

impl ModuleBuilder {
    pub fn var(mut self, name: impl Into<String>, value: impl Into<VarValue>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<VarValue>,
    {
        self.vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(env.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Validate and freeze the module.
    ///
    /// Existence of the directory is checked by the verifier right before the
    /// first invocation, not here.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] for an empty path or an invalid variable name.
    pub fn build(self) -> Result<ModuleUnderTest> {
        if self.path.as_os_str().is_empty() {
            return Err(ModuleError::EmptyPath.into());
        }
        if let Some(bad) = self.vars.keys().find(|k| !VAR_NAME_RE.is_match(k)) {
            return Err(ModuleError::InvalidVarName(bad.clone()).into());
        }
        Ok(ModuleUnderTest {
            path: self.path,
            vars: self.vars,
            env: self.env,
        })
    }
}
