//! Application service: run the cases of a suite file.
//!
//! Imports only from `crate::domain`, `crate::application::ports` and the
//! verifier service. All I/O is routed through injected port traits.

use std::cell::RefCell;
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::Result;
use futures_util::StreamExt;
use futures_util::future::{self, Either};
use futures_util::stream;
use tracing::{info, warn};
use verify_common::{CaseSpec, Expectation, Probe, RunMode, SuiteFile};

use crate::application::ports::{CloudInspector, ModuleStager, ModuleWorkflow, ProgressReporter};
use crate::application::services::verifier::Verifier;
use crate::domain::config::REGION_VARS;
use crate::domain::error::{ModuleError, SuiteError};
use crate::domain::expectation::{Outcome, Verdict, evaluate_all};
use crate::domain::{
    CaseReport, ModuleUnderTest, NamingStrategy, RunResult, SuiteReport, TemplateContext,
};

/// How a suite is run.
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    /// Only run these cases (all when empty).
    pub cases: Vec<String>,
    /// Override every case's mode.
    pub mode: Option<RunMode>,
    pub parallel: usize,
    /// Stop scheduling new cases after the first failure.
    pub fail_fast: bool,
    /// Copy each module to a private directory first. With `parallel > 1`,
    /// cases that share a module directory are staged regardless.
    pub isolate: bool,
    pub naming: NamingStrategy,
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self {
            cases: Vec::new(),
            mode: None,
            parallel: 1,
            fail_fast: false,
            isolate: false,
            naming: NamingStrategy::default(),
        }
    }
}

/// A case with every placeholder expanded, ready to run.
#[derive(Debug, Clone)]
pub struct PreparedCase {
    pub name: String,
    pub mode: RunMode,
    pub module: ModuleUnderTest,
    pub expectations: Vec<Expectation>,
    pub probes: Vec<Probe>,
    /// `${name}` for this case.
    pub unique_name: String,
}

// ── Static checks ─────────────────────────────────────────────────────────────

/// Check a suite without invoking anything.
///
/// # Errors
///
/// Returns [`SuiteError`] for an empty suite, an empty or duplicate case
/// name, or a placeholder no case context can resolve.
pub fn check_suite(suite: &SuiteFile, region: &str) -> Result<()> {
    if suite.cases.is_empty() {
        return Err(SuiteError::Empty.into());
    }
    let mut seen = HashSet::new();
    for case in &suite.cases {
        if case.name.trim().is_empty() {
            return Err(SuiteError::EmptyCaseName.into());
        }
        if !seen.insert(case.name.as_str()) {
            return Err(SuiteError::DuplicateCase(case.name.clone()).into());
        }
        let unresolved = unresolved_placeholders(case, region);
        if !unresolved.is_empty() {
            return Err(SuiteError::UnresolvedPlaceholder {
                case: case.name.clone(),
                names: unresolved.join(", "),
            }
            .into());
        }
    }
    Ok(())
}

fn unresolved_placeholders(case: &CaseSpec, region: &str) -> Vec<String> {
    let ctx = TemplateContext::for_case(&case.name, case.name_prefix.as_deref(), "0", region);
    let mut found = Vec::new();
    let mut scan = |s: &str| {
        for name in ctx.find_unresolved(s) {
            if !found.contains(&name) {
                found.push(name);
            }
        }
    };
    for value in case.vars.values() {
        value.for_each_string(&mut scan);
    }
    for value in case.env.values() {
        scan(value);
    }
    for expectation in &case.expect {
        for operand in expectation.predicate.operands() {
            scan(operand);
        }
    }
    for probe in &case.probes {
        match probe {
            Probe::VpcCidrBlock {
                vpc_id_output,
                equals,
            } => {
                scan(vpc_id_output);
                scan(equals);
            }
        }
    }
    found
}

/// The cases named in `names`, in suite order. All cases when `names` is empty.
///
/// # Errors
///
/// Returns [`SuiteError::UnknownCase`] for a name not in the suite.
pub fn select_cases<'a>(suite: &'a SuiteFile, names: &[String]) -> Result<Vec<&'a CaseSpec>> {
    if let Some(unknown) = names
        .iter()
        .find(|n| !suite.cases.iter().any(|c| &c.name == *n))
    {
        return Err(SuiteError::UnknownCase(unknown.clone()).into());
    }
    Ok(suite
        .cases
        .iter()
        .filter(|c| names.is_empty() || names.contains(&c.name))
        .collect())
}

/// Expand every placeholder of `case` and build its module.
///
/// Relative module paths are resolved against `base_dir` (the directory of
/// the suite file).
///
/// # Errors
///
/// Returns an error if the module cannot be built.
pub fn prepare_case(
    case: &CaseSpec,
    base_dir: &Path,
    mode: RunMode,
    unique_id: &str,
    region: &str,
) -> Result<PreparedCase> {
    let ctx = TemplateContext::for_case(&case.name, case.name_prefix.as_deref(), unique_id, region);
    let expand = |s: &str| ctx.expand(s);
    let module = ModuleUnderTest::builder(base_dir.join(&case.module))
        .vars(
            case.vars
                .iter()
                .map(|(k, v)| (k.clone(), v.map_strings(&expand))),
        )
        .envs(case.env.iter().map(|(k, v)| (k.clone(), expand(v))))
        .build()?;
    Ok(PreparedCase {
        name: case.name.clone(),
        mode,
        module,
        expectations: case
            .expect
            .iter()
            .map(|e| Expectation {
                predicate: e.predicate.map_strings(&expand),
                message: e.message.clone(),
            })
            .collect(),
        probes: case.probes.iter().map(|p| p.map_strings(&expand)).collect(),
        unique_name: ctx
            .get(crate::domain::template::NAME)
            .unwrap_or(case.name.as_str())
            .to_string(),
    })
}

// ── Running ───────────────────────────────────────────────────────────────────

/// Run the selected cases of `suite` with bounded concurrency.
///
/// Case failures are recorded in the report. Only a bad selection fails the
/// whole call.
///
/// # Errors
///
/// Returns an error if `options.cases` names an unknown case.
pub async fn run_suite(
    verifier: &Verifier<impl ModuleWorkflow>,
    cloud: &impl CloudInspector,
    stager: &impl ModuleStager,
    reporter: &impl ProgressReporter,
    suite: &SuiteFile,
    base_dir: &Path,
    options: &SuiteOptions,
) -> Result<SuiteReport> {
    run_suite_until(
        verifier,
        cloud,
        stager,
        reporter,
        suite,
        base_dir,
        options,
        future::pending::<()>(),
    )
    .await
}

/// [`run_suite`], stopping early when `interrupt` resolves.
///
/// No case starts after the interrupt. Cases already running finish,
/// including the destroy of anything they applied, and the rest are
/// reported as not run.
///
/// # Errors
///
/// Returns an error if `options.cases` names an unknown case.
#[allow(clippy::too_many_arguments)]
pub async fn run_suite_until(
    verifier: &Verifier<impl ModuleWorkflow>,
    cloud: &impl CloudInspector,
    stager: &impl ModuleStager,
    reporter: &impl ProgressReporter,
    suite: &SuiteFile,
    base_dir: &Path,
    options: &SuiteOptions,
    interrupt: impl Future<Output = ()>,
) -> Result<SuiteReport> {
    let selected = select_cases(suite, &options.cases)?;
    let names: Vec<String> = selected.iter().map(|c| c.name.clone()).collect();
    let shared = shared_modules(&selected, base_dir, options.parallel);
    let stop = AtomicBool::new(false);

    let cases = pin!(
        stream::iter(selected.into_iter().enumerate())
            .map(|(index, case)| {
                let stop = &stop;
                let isolate = options.isolate || shared.contains(&base_dir.join(&case.module));
                async move {
                    if stop.load(Ordering::SeqCst) {
                        return (index, None);
                    }
                    let report = run_case(
                        verifier, cloud, stager, reporter, case, base_dir, options, isolate,
                    )
                    .await;
                    if options.fail_fast && !report.passed() {
                        stop.store(true, Ordering::SeqCst);
                    }
                    (index, Some(report))
                }
            })
            .buffer_unordered(options.parallel.max(1))
            .collect::<Vec<(usize, Option<CaseReport>)>>()
    );

    let mut interrupted = false;
    let mut results = match future::select(pin!(interrupt), cases).await {
        Either::Right((results, _)) => results,
        Either::Left(((), running)) => {
            interrupted = true;
            stop.store(true, Ordering::SeqCst);
            warn!("interrupt received, no further cases will start");
            reporter.warn("interrupted: waiting for running cases to clean up");
            running.await
        }
    };

    results.sort_by_key(|(index, _)| *index);
    let mut report = SuiteReport {
        interrupted,
        ..SuiteReport::default()
    };
    for (index, case_report) in results {
        match case_report {
            Some(r) => report.cases.push(r),
            None => report.not_run.push(names[index].clone()),
        }
    }
    Ok(report)
}

/// The region a case's invocations target: a region variable in the case's
/// own env wins over the configured one.
fn case_region(module: &ModuleUnderTest, configured: &str) -> String {
    REGION_VARS
        .iter()
        .find_map(|key| module.env().get(*key))
        .map_or_else(|| configured.to_string(), Clone::clone)
}

/// Module directories used by more than one selected case.
///
/// When cases run in parallel these are staged so that each case gets its
/// own `.terraform` directory and local state.
fn shared_modules(cases: &[&CaseSpec], base_dir: &Path, parallel: usize) -> HashSet<PathBuf> {
    if parallel <= 1 {
        return HashSet::new();
    }
    let mut seen = HashSet::new();
    cases
        .iter()
        .map(|case| base_dir.join(&case.module))
        .filter(|path| !seen.insert(path.clone()))
        .collect()
}

#[allow(clippy::too_many_arguments)]
async fn run_case(
    verifier: &Verifier<impl ModuleWorkflow>,
    cloud: &impl CloudInspector,
    stager: &impl ModuleStager,
    reporter: &impl ProgressReporter,
    case: &CaseSpec,
    base_dir: &Path,
    options: &SuiteOptions,
    isolate: bool,
) -> CaseReport {
    let started = Instant::now();
    let requested = options.mode.unwrap_or(case.mode);
    let region = verifier.config().region.clone();
    let unique_id = options.naming.unique_id();

    let mut report = CaseReport {
        name: case.name.clone(),
        requested_mode: requested,
        effective_mode: None,
        verdict: Verdict::default(),
        error: None,
        duration_ms: 0,
        unique_name: case.name.clone(),
    };

    match prepare_case(case, base_dir, requested, &unique_id, &region) {
        Ok(prepared) => {
            let region = case_region(&prepared.module, &region);
            report.unique_name.clone_from(&prepared.unique_name);
            let effective = verifier.effective_mode(requested);
            report.effective_mode = Some(effective);
            if effective != requested {
                reporter.warn(&format!(
                    "{}: plan_only is set, running {effective}",
                    case.name
                ));
            }
            reporter.step(&format!("{}: {effective}", case.name));
            info!(case = %case.name, mode = %effective, name = %prepared.unique_name, "running case");
            let (verdict, error) = execute(
                verifier,
                cloud,
                stager,
                &prepared,
                effective,
                isolate,
                &region,
            )
            .await;
            report.verdict = verdict;
            report.error = error.map(|e| format!("{e:#}"));
        }
        Err(e) => report.error = Some(format!("{e:#}")),
    }

    report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if report.passed() {
        reporter.success(&format!("{} passed", case.name));
    } else {
        warn!(case = %case.name, error = ?report.error, failures = ?report.verdict.failures(), "case failed");
        reporter.warn(&format!("{} failed", case.name));
    }
    report
}

async fn execute(
    verifier: &Verifier<impl ModuleWorkflow>,
    cloud: &impl CloudInspector,
    stager: &impl ModuleStager,
    case: &PreparedCase,
    effective: RunMode,
    isolate: bool,
    region: &str,
) -> (Verdict, Option<anyhow::Error>) {
    if !verifier.workflow().module_exists(case.module.path()) {
        return (
            Verdict::default(),
            Some(ModuleError::NotFound(case.module.label()).into()),
        );
    }

    // The staged copy is removed when `staged` drops at the end of the case.
    let staged = if isolate {
        match stager.stage(case.module.path()).await {
            Ok(staged) => Some(staged),
            Err(e) => return (Verdict::default(), Some(e)),
        }
    } else {
        None
    };
    let module = match &staged {
        Some(staged) => case.module.relocated(&staged.path),
        None => case.module.clone(),
    };

    if effective == RunMode::ApplyAndDestroy {
        let captured = RefCell::new(None);
        let slot = &captured;
        let outcome = verifier
            .apply_scoped(&module, |result| async move {
                let mut verdict = evaluate_all(&case.expectations, &result);
                run_probes(cloud, &case.probes, &result, region, &mut verdict).await;
                *slot.borrow_mut() = Some(verdict);
                Ok(())
            })
            .await;
        return (captured.into_inner().unwrap_or_default(), outcome.err());
    }

    match verifier.run(&module, case.mode).await {
        Ok(result) => {
            let mut verdict = evaluate_all(&case.expectations, &result);
            run_probes(cloud, &case.probes, &result, region, &mut verdict).await;
            (verdict, None)
        }
        Err(e) => (Verdict::default(), Some(e)),
    }
}

/// Evaluate probes against the real cloud. Skipped unless the module was
/// applied.
pub async fn run_probes(
    cloud: &impl CloudInspector,
    probes: &[Probe],
    result: &RunResult,
    region: &str,
    verdict: &mut Verdict,
) {
    for probe in probes {
        let outcome = if result.has_outputs() {
            probe_outcome(cloud, probe, result, region).await
        } else {
            Outcome::Skipped {
                reason: format!("probes need an applied module, ran {}", result.mode),
            }
        };
        verdict.push(probe.to_string(), outcome);
    }
}

async fn probe_outcome(
    cloud: &impl CloudInspector,
    probe: &Probe,
    result: &RunResult,
    region: &str,
) -> Outcome {
    match probe {
        Probe::VpcCidrBlock {
            vpc_id_output,
            equals,
        } => {
            let Some(vpc_id) = result.output(vpc_id_output).and_then(|v| v.as_str()) else {
                return Outcome::Failed {
                    message: format!("expected {probe}, no string output named `{vpc_id_output}`"),
                };
            };
            match cloud.vpc_cidr_block(vpc_id, region).await {
                Ok(cidr) if cidr == *equals => Outcome::Passed,
                Ok(cidr) => Outcome::Failed {
                    message: format!("expected {probe}, got {cidr:?}"),
                },
                Err(e) => Outcome::Failed {
                    message: format!("expected {probe}, lookup failed: {e:#}"),
                },
            }
        }
    }
}
