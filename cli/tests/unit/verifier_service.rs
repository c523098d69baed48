//! Tests for the `Verifier` application service.
//!
//! The central guarantee: once `init` succeeds, an apply-and-destroy run
//! calls `destroy` exactly once, whatever happens in between.

#![allow(clippy::expect_used)]

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use infra_verify::application::services::verifier::Verifier;
use infra_verify::domain::error::{InvocationError, ModuleError, TeardownError};
use infra_verify::domain::{ModuleUnderTest, VerifierConfig};
use verify_common::{Expectation, RunMode};

use crate::mocks::MockWorkflow;

fn module() -> ModuleUnderTest {
    ModuleUnderTest::builder("modules/alb")
        .var("name", "test-alb")
        .build()
        .expect("module")
}

fn verifier(workflow: MockWorkflow) -> Verifier<MockWorkflow> {
    Verifier::new(workflow, VerifierConfig::default())
}

// ── Syntax check and plan ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_syntax_check_runs_init_then_validate() {
    let v = verifier(MockWorkflow::new());
    let result = v
        .run(&module(), RunMode::SyntaxCheck)
        .await
        .expect("syntax check");
    assert_eq!(v.workflow().calls(), ["init", "validate"]);
    assert!(result.text.contains("configuration is valid"));
    assert!(result.plan.is_none());
}

#[tokio::test]
async fn test_plan_never_applies_or_destroys() {
    let v = verifier(MockWorkflow::new());
    for _ in 0..3 {
        v.run(&module(), RunMode::PlanOnly).await.expect("plan");
    }
    assert_eq!(v.workflow().count("apply"), 0);
    assert_eq!(v.workflow().count("destroy"), 0);
    assert_eq!(v.workflow().count("plan"), 3);
}

#[tokio::test]
async fn test_plan_reads_structured_plan() {
    let v = verifier(MockWorkflow::new());
    let result = v.run(&module(), RunMode::PlanOnly).await.expect("plan");
    let plan = result.plan.expect("structured plan");
    assert_eq!(plan.add, 3);
    assert!(plan.addresses().any(|a| a == "aws_lb.main"));
    assert!(result.text.contains("aws_lb.main"));
}

#[tokio::test]
async fn test_plan_falls_back_to_text_summary() {
    let config = VerifierConfig {
        structured_plan: false,
        ..VerifierConfig::default()
    };
    let v = Verifier::new(MockWorkflow::new(), config);
    let result = v.run(&module(), RunMode::PlanOnly).await.expect("plan");
    let plan = result.plan.expect("text summary");
    assert_eq!((plan.add, plan.change, plan.destroy), (3, 0, 0));
    assert!(plan.resource_changes.is_empty());
}

#[tokio::test]
async fn test_malformed_show_json_is_an_invocation_error() {
    let mut workflow = MockWorkflow::new();
    workflow.show_json = Some("not json".to_string());
    let err = verifier(workflow)
        .run(&module(), RunMode::PlanOnly)
        .await
        .expect_err("malformed");
    assert!(matches!(
        err.downcast_ref::<InvocationError>(),
        Some(InvocationError::MalformedOutput { .. })
    ));
}

#[tokio::test]
async fn test_missing_module_fails_before_any_invocation() {
    let v = verifier(MockWorkflow::new().missing_module());
    let err = v
        .run(&module(), RunMode::ApplyAndDestroy)
        .await
        .expect_err("missing");
    assert!(matches!(
        err.downcast_ref::<ModuleError>(),
        Some(ModuleError::NotFound(_))
    ));
    assert!(v.workflow().calls().is_empty());
}

#[tokio::test]
async fn test_plan_only_config_downgrades_apply() {
    let config = VerifierConfig {
        plan_only: true,
        ..VerifierConfig::default()
    };
    let v = Verifier::new(MockWorkflow::new(), config);
    assert_eq!(v.effective_mode(RunMode::ApplyAndDestroy), RunMode::PlanOnly);
    assert_eq!(v.effective_mode(RunMode::SyntaxCheck), RunMode::SyntaxCheck);

    let result = v
        .run(&module(), RunMode::ApplyAndDestroy)
        .await
        .expect("downgraded run");
    assert_eq!(result.mode, RunMode::PlanOnly);
    assert_eq!(v.workflow().calls(), ["init", "plan"]);
}

// ── Apply and destroy ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_apply_success_destroys_once_after_body() {
    let v = verifier(MockWorkflow::new());
    let dns = v
        .apply_scoped(&module(), |result| async move {
            let dns = result
                .output("alb_dns_name")
                .and_then(|o| o.as_str())
                .map(str::to_string);
            Ok(dns)
        })
        .await
        .expect("apply");
    assert_eq!(
        dns.as_deref(),
        Some("test-alb-123.ap-northeast-1.elb.amazonaws.com")
    );
    assert_eq!(v.workflow().calls(), ["init", "apply", "output", "destroy"]);
}

#[tokio::test]
async fn test_apply_resource_counts_use_apply_plan_summary() {
    let mut workflow = MockWorkflow::new();
    workflow.apply_text = "Plan: 3 to add, 0 to change, 0 to destroy.\naws_lb.main: Creating...\nApply complete! Resources: 3 added, 0 changed, 0 destroyed.\n".to_string();
    let v = verifier(workflow);
    let verdict = v
        .verify(
            &module(),
            RunMode::ApplyAndDestroy,
            &[Expectation::resources_to_add(3)],
        )
        .await
        .expect("apply");
    verdict.assert_passed();
    assert_eq!(v.workflow().count("destroy"), 1);
}

#[tokio::test]
async fn test_apply_failure_still_destroys() {
    let v = verifier(MockWorkflow::new().failing("apply"));
    let err = v
        .run(&module(), RunMode::ApplyAndDestroy)
        .await
        .expect_err("apply fails");
    assert!(format!("{err:#}").contains("apply failed"));
    assert_eq!(v.workflow().count("destroy"), 1);
}

#[tokio::test]
async fn test_init_failure_does_not_destroy() {
    let v = verifier(MockWorkflow::new().failing("init"));
    v.run(&module(), RunMode::ApplyAndDestroy)
        .await
        .expect_err("init fails");
    assert_eq!(v.workflow().calls(), ["init"]);
}

#[tokio::test]
async fn test_malformed_outputs_still_destroy() {
    let v = verifier(MockWorkflow::new().with_outputs("[1, 2"));
    let err = v
        .run(&module(), RunMode::ApplyAndDestroy)
        .await
        .expect_err("bad outputs");
    assert!(matches!(
        err.downcast_ref::<InvocationError>(),
        Some(InvocationError::MalformedOutput { .. })
    ));
    assert_eq!(v.workflow().count("destroy"), 1);
}

#[tokio::test]
async fn test_body_error_still_destroys() {
    let v = verifier(MockWorkflow::new());
    let err = v
        .apply_scoped(&module(), |_| async {
            Err::<(), _>(anyhow::anyhow!("check exploded"))
        })
        .await
        .expect_err("body fails");
    assert!(err.to_string().contains("check exploded"));
    assert_eq!(v.workflow().count("destroy"), 1);
}

#[tokio::test]
async fn test_body_panic_destroys_then_resumes() {
    let v = verifier(MockWorkflow::new());
    let m = module();
    let outcome = AssertUnwindSafe(v.apply_scoped(&m, |result| async move {
        assert!(result.text.is_empty(), "assertion inside body");
        Ok(())
    }))
    .catch_unwind()
    .await;
    assert!(outcome.is_err(), "panic must propagate");
    assert_eq!(v.workflow().count("destroy"), 1);
}

#[tokio::test]
async fn test_destroy_failure_is_teardown_error() {
    let v = verifier(MockWorkflow::new().failing("destroy"));
    let err = v
        .run(&module(), RunMode::ApplyAndDestroy)
        .await
        .expect_err("destroy fails");
    assert!(matches!(
        err.downcast_ref::<TeardownError>(),
        Some(TeardownError::DestroyFailed { .. })
    ));
    assert_eq!(v.workflow().count("destroy"), 1);
}

#[tokio::test]
async fn test_destroy_failure_after_apply_failure_reports_both() {
    let v = verifier(MockWorkflow::new().failing("apply").failing("destroy"));
    let err = v
        .run(&module(), RunMode::ApplyAndDestroy)
        .await
        .expect_err("both fail");
    let text = format!("{err:#}");
    assert!(text.contains("apply failed"), "{text}");
    assert!(text.contains("resources may be left behind"), "{text}");
}

// ── verify ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_verify_evaluates_named_outputs_before_destroy() {
    let v = verifier(MockWorkflow::new());
    let verdict = v
        .verify(
            &module(),
            RunMode::ApplyAndDestroy,
            &[
                Expectation::named_contains("alb_dns_name", "elb.amazonaws.com"),
                Expectation::output_contains("Apply complete"),
            ],
        )
        .await
        .expect("verify");
    verdict.assert_passed();
    assert_eq!(v.workflow().count("destroy"), 1);
}

#[tokio::test]
async fn test_verify_reports_every_failure() {
    let v = verifier(MockWorkflow::new());
    let verdict = v
        .verify(
            &module(),
            RunMode::PlanOnly,
            &[
                Expectation::output_contains("aws_lb.main"),
                Expectation::output_contains("aws_ecs_cluster.main"),
                Expectation::output_not_contains("aws_lb.main"),
                Expectation::named_not_empty("alb_dns_name"),
            ],
        )
        .await
        .expect("verify");
    assert!(!verdict.passed());
    assert_eq!(verdict.failures().len(), 2);
    assert_eq!(verdict.skipped(), 1, "named checks are skipped without an apply");
}
