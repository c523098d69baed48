//! Application service: drive one module through a run mode.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through the injected `ModuleWorkflow`.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use anyhow::Result;
use futures_util::FutureExt;
use tracing::{debug, error, warn};
use verify_common::{Expectation, RunMode};

use crate::application::ports::ModuleWorkflow;
use crate::domain::error::{ModuleError, TeardownError};
use crate::domain::expectation::{Verdict, evaluate_all};
use crate::domain::plan::PlanReport;
use crate::domain::run_result::parse_outputs;
use crate::domain::{ModuleUnderTest, RunResult, VerifierConfig};

/// Runs modules through the provisioning tool with a fixed configuration.
pub struct Verifier<W> {
    workflow: W,
    config: VerifierConfig,
}

impl<W: ModuleWorkflow> Verifier<W> {
    #[must_use]
    pub fn new(workflow: W, config: VerifierConfig) -> Self {
        Self { workflow, config }
    }

    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    #[must_use]
    pub fn workflow(&self) -> &W {
        &self.workflow
    }

    /// The mode that will actually run for `requested`.
    ///
    /// With `plan_only` set, apply-and-destroy is downgraded to plan-only.
    #[must_use]
    pub fn effective_mode(&self, requested: RunMode) -> RunMode {
        if requested == RunMode::ApplyAndDestroy && self.config.plan_only {
            RunMode::PlanOnly
        } else {
            requested
        }
    }

    /// Run `module` in `mode` and return what it produced.
    ///
    /// In apply-and-destroy mode the resources are already destroyed when
    /// this returns. Use [`Verifier::apply_scoped`] to inspect them first.
    ///
    /// # Errors
    ///
    /// Returns an error if any tool invocation fails or teardown fails.
    pub async fn run(&self, module: &ModuleUnderTest, mode: RunMode) -> Result<RunResult> {
        match self.effective_mode(mode) {
            RunMode::SyntaxCheck => self.syntax_check(module).await,
            RunMode::PlanOnly => {
                self.note_downgrade(mode);
                self.plan(module).await
            }
            RunMode::ApplyAndDestroy => {
                self.apply_scoped(module, |result| async move { Ok(result) })
                    .await
            }
        }
    }

    /// Run `module` and check every expectation against the result.
    ///
    /// In apply-and-destroy mode the expectations are evaluated before
    /// teardown. Named-output checks are skipped when the run was downgraded
    /// to plan-only.
    ///
    /// # Errors
    ///
    /// Returns an error if any tool invocation fails or teardown fails.
    /// Unmet expectations are reported in the verdict, not as an error.
    pub async fn verify(
        &self,
        module: &ModuleUnderTest,
        mode: RunMode,
        expectations: &[Expectation],
    ) -> Result<Verdict> {
        if self.effective_mode(mode) == RunMode::ApplyAndDestroy {
            return self
                .apply_scoped(module, |result| async move {
                    Ok(evaluate_all(expectations, &result))
                })
                .await;
        }
        let result = self.run(module, mode).await?;
        Ok(evaluate_all(expectations, &result))
    }

    /// `init` then `validate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the module is missing or either invocation fails.
    pub async fn syntax_check(&self, module: &ModuleUnderTest) -> Result<RunResult> {
        self.ensure_module(module)?;
        debug!(module = %module.label(), "syntax check");
        self.workflow.init(module).await?;
        let text = self.workflow.validate(module).await?;
        Ok(RunResult::new(RunMode::SyntaxCheck, text))
    }

    /// `init` then `plan`. Never mutates real infrastructure.
    ///
    /// # Errors
    ///
    /// Returns an error if the module is missing, either invocation fails or
    /// the structured plan cannot be parsed.
    pub async fn plan(&self, module: &ModuleUnderTest) -> Result<RunResult> {
        self.ensure_module(module)?;
        debug!(module = %module.label(), structured = self.config.structured_plan, "plan");
        self.workflow.init(module).await?;
        let capture = self
            .workflow
            .plan(module, self.config.structured_plan)
            .await?;
        let report = match capture.show_json.as_deref() {
            Some(json) => Some(PlanReport::from_show_json(json)?),
            None => PlanReport::from_text(&capture.text),
        };
        Ok(RunResult::new(RunMode::PlanOnly, capture.text).with_plan(report))
    }

    /// `init`, `apply`, `output -json`, then `body`, then `destroy`.
    ///
    /// Once `init` has succeeded, `destroy` runs exactly once whatever
    /// happens afterwards: success, a failed apply, a failed output query,
    /// an error from `body`, or a panic inside `body`. A panic is resumed
    /// after teardown.
    ///
    /// # Errors
    ///
    /// Returns the first error of apply, output or `body`. A failed destroy
    /// is returned as [`TeardownError`], attached as context when the run
    /// had already failed.
    pub async fn apply_scoped<F, Fut, T>(&self, module: &ModuleUnderTest, body: F) -> Result<T>
    where
        F: FnOnce(RunResult) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.ensure_module(module)?;
        debug!(module = %module.label(), "apply");
        self.workflow.init(module).await?;

        let outcome = AssertUnwindSafe(async {
            let text = self.workflow.apply(module).await?;
            let outputs = parse_outputs(&self.workflow.output_json(module).await?)?;
            let plan = PlanReport::from_text(&text);
            body(
                RunResult::new(RunMode::ApplyAndDestroy, text)
                    .with_outputs(outputs)
                    .with_plan(plan),
            )
            .await
        })
        .catch_unwind()
        .await;

        let teardown = self.teardown(module).await;

        match outcome {
            Err(panic) => std::panic::resume_unwind(panic),
            Ok(Ok(value)) => teardown.map(|()| value).map_err(Into::into),
            Ok(Err(err)) => match teardown {
                Ok(()) => Err(err),
                Err(teardown_err) => Err(err.context(teardown_err)),
            },
        }
    }

    async fn teardown(&self, module: &ModuleUnderTest) -> Result<(), TeardownError> {
        debug!(module = %module.label(), "destroy");
        match self.workflow.destroy(module).await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(module = %module.label(), error = %format!("{e:#}"), "destroy failed");
                Err(TeardownError::DestroyFailed {
                    module: module.label(),
                    detail: format!("{e:#}"),
                })
            }
        }
    }

    fn ensure_module(&self, module: &ModuleUnderTest) -> Result<()> {
        if self.workflow.module_exists(module.path()) {
            Ok(())
        } else {
            Err(ModuleError::NotFound(module.label()).into())
        }
    }

    fn note_downgrade(&self, requested: RunMode) {
        if requested != RunMode::PlanOnly {
            warn!(%requested, "plan_only is set, running plan-only instead");
        }
    }
}
