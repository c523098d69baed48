//! End-to-end tests for `infra-verify run` against a scripted terraform.

#![allow(clippy::expect_used)]
#![cfg(unix)]

use predicates::prelude::*;

use crate::fake_terraform::Sandbox;

const PLAN_SUITE: &str = r"
cases:
  - name: alb-plan
    module: modules/alb
    mode: plan_only
    name_prefix: test-alb
    vars:
      name: ${name}
      vpc_id: vpc-12345678
      target_group_port: 3000
    expect:
      - kind: output_contains
        text: aws_lb.main
        message: Plan should include ALB resource
      - kind: resource_counts
        add: 3
";

const APPLY_SUITE: &str = r"
cases:
  - name: alb-apply
    module: modules/alb
    mode: apply_and_destroy
    name_prefix: test-alb
    vars:
      name: ${name}
    expect:
      - kind: named_contains
        name: alb_dns_name
        value: elb.amazonaws.com
";

#[test]
fn test_run_plan_only_never_applies() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite("suite.yaml", PLAN_SUITE);
    sandbox
        .cmd()
        .arg("run")
        .arg(&suite)
        .assert()
        .success()
        .stdout(predicate::str::contains("alb-plan"))
        .stdout(predicate::str::contains("1 passed, 0 failed"));

    let calls = sandbox.subcommands();
    assert_eq!(calls, ["init", "plan", "show"]);
}

#[test]
fn test_run_apply_destroys_once() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite("suite.yaml", APPLY_SUITE);
    sandbox.cmd().arg("run").arg(&suite).assert().success();

    let calls = sandbox.subcommands();
    assert_eq!(calls, ["init", "apply", "output", "destroy"]);
}

#[test]
fn test_run_failed_apply_still_destroys() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite("suite.yaml", APPLY_SUITE);
    sandbox
        .cmd()
        .env("FAKE_TF_FAIL", "apply")
        .arg("run")
        .arg(&suite)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("simulated apply failure"));

    let calls = sandbox.subcommands();
    assert_eq!(calls.iter().filter(|c| *c == "destroy").count(), 1);
}

#[test]
fn test_run_failing_expectation_exits_nonzero() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite(
        "suite.yaml",
        "cases:\n  - name: a\n    module: modules/alb\n    expect:\n      - kind: output_contains\n        text: aws_ecs_cluster\n        message: Plan should include ECS cluster\n",
    );
    sandbox
        .cmd()
        .arg("run")
        .arg(&suite)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Plan should include ECS cluster"))
        .stderr(predicate::str::contains("0 passed, 1 failed"));
}

#[test]
fn test_plan_only_flag_downgrades_apply() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite("suite.yaml", APPLY_SUITE);
    sandbox
        .cmd()
        .args(["run", "--plan-only"])
        .arg(&suite)
        .assert()
        .success()
        .stdout(predicate::str::contains("requested apply-and-destroy"));

    let calls = sandbox.subcommands();
    assert!(!calls.iter().any(|c| c == "apply" || c == "destroy"));
}

#[test]
fn test_plan_only_env_downgrades_apply() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite("suite.yaml", APPLY_SUITE);
    sandbox
        .cmd()
        .env("TERRATEST_PLAN_ONLY", "true")
        .arg("run")
        .arg(&suite)
        .assert()
        .success();
    assert!(!sandbox.subcommands().iter().any(|c| c == "apply"));
}

#[test]
fn test_run_json_report() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite("suite.yaml", PLAN_SUITE);
    let output = sandbox
        .cmd()
        .args(["--json", "run"])
        .arg(&suite)
        .output()
        .expect("run");
    assert!(output.status.success(), "{output:?}");
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["passed"], true);
    assert_eq!(value["summary"]["passed"], 1);
    assert_eq!(value["cases"][0]["name"], "alb-plan");
    assert_eq!(value["cases"][0]["requested_mode"], "plan_only");
}

#[test]
fn test_run_syntax_check_mode_override() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite("suite.yaml", PLAN_SUITE);
    sandbox
        .cmd()
        .args(["run", "--mode", "syntax-check"])
        .arg(&suite)
        .assert()
        .success();
    assert_eq!(sandbox.subcommands(), ["init", "validate"]);
}

#[test]
fn test_run_missing_module_fails_without_terraform() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite(
        "suite.yaml",
        "cases:\n  - name: gone\n    module: modules/does-not-exist\n",
    );
    sandbox
        .cmd()
        .arg("run")
        .arg(&suite)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("does-not-exist"));
    assert!(sandbox.subcommands().is_empty());
}

#[test]
fn test_run_unknown_case_selection() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite("suite.yaml", PLAN_SUITE);
    sandbox
        .cmd()
        .args(["run", "--case", "nope"])
        .arg(&suite)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nope"));
}
