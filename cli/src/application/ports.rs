//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::ModuleUnderTest;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program with extra environment and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        env: &BTreeMap<String, String>,
    ) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned) and
    /// the error must wrap `InvocationError::TimedOut`.
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        env: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Provisioning Tool Ports ───────────────────────────────────────────────────

/// Captured output of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanCapture {
    /// Human-readable plan text.
    pub text: String,
    /// `show -json` of the saved plan, when a structured plan was requested.
    pub show_json: Option<String>,
}

/// The provisioning-tool subcommands a module is driven through.
///
/// Every method fails with `InvocationError` (wrapped in `anyhow`) when the
/// tool exits non-zero. Nothing is retried.
#[allow(async_fn_in_trait)]
pub trait ModuleWorkflow {
    /// Whether the module directory exists.
    fn module_exists(&self, path: &Path) -> bool;
    /// Download providers and modules.
    async fn init(&self, module: &ModuleUnderTest) -> Result<String>;
    /// Static validation. Runs without variables.
    async fn validate(&self, module: &ModuleUnderTest) -> Result<String>;
    /// Produce a plan without taking the state lock.
    async fn plan(&self, module: &ModuleUnderTest, structured: bool) -> Result<PlanCapture>;
    /// Create the module's resources.
    async fn apply(&self, module: &ModuleUnderTest) -> Result<String>;
    /// Remove every resource the module created.
    async fn destroy(&self, module: &ModuleUnderTest) -> Result<String>;
    /// The `output -json` document.
    async fn output_json(&self, module: &ModuleUnderTest) -> Result<String>;
}

/// Version query for the provisioning tool.
#[allow(async_fn_in_trait)]
pub trait ToolInspector {
    /// The tool's `version -json` document.
    async fn tool_version(&self) -> Result<String>;
}

// ── Cloud Port ────────────────────────────────────────────────────────────────

/// Independent queries against the real cloud, used by probes.
#[allow(async_fn_in_trait)]
pub trait CloudInspector {
    /// Version line of the cloud CLI.
    async fn cli_version(&self) -> Result<String>;
    /// CIDR block of a VPC.
    async fn vpc_cidr_block(&self, vpc_id: &str, region: &str) -> Result<String>;
}

// ── Staging Port ──────────────────────────────────────────────────────────────

/// A private copy of a module directory. The copy lives as long as `guard`.
pub struct StagedModule {
    pub path: PathBuf,
    pub guard: Box<dyn std::any::Any + Send>,
}

impl std::fmt::Debug for StagedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedModule")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Copies module directories so concurrent cases do not share local state.
#[allow(async_fn_in_trait)]
pub trait ModuleStager {
    /// Copy `source` into a fresh private directory, skipping local state
    /// and provider caches.
    async fn stage(&self, source: &Path) -> Result<StagedModule>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
