//! Integration tests for the infra-verify CLI surface.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use infra_verify::infra::fs::load_suite;
use predicates::prelude::*;
use verify_common::{Predicate, Probe, RunMode, VarValue};

use crate::fake_terraform::Sandbox;

fn demo_suite(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../demos/suites")
        .join(name)
}

fn infra_verify() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("infra-verify"));
    cmd.env("NO_COLOR", "1");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    // clap with arg_required_else_help shows help on stderr and exits 2
    infra_verify().assert().code(2).stderr(predicate::str::contains(
        "Verify infrastructure modules by driving terraform",
    ));
}

#[test]
fn test_cli_help_lists_commands() {
    infra_verify()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn test_version_command_shows_version() {
    infra_verify()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!(
            "infra-verify ",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = infra_verify()
        .args(["version", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_no_color_env_accepts_any_value() {
    for value in ["1", "true", "yes", "0"] {
        Command::new(assert_cmd::cargo::cargo_bin!("infra-verify"))
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("infra-verify"));
    }
}

#[test]
fn test_run_rejects_unknown_mode() {
    infra_verify()
        .args(["run", "suite.yaml", "--mode", "apply-only"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("apply-only"));
}

// --- check ---

#[test]
fn test_check_accepts_valid_suite() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite(
        "suite.yaml",
        "cases:\n  - name: alb-plan\n    module: modules/alb\n    name_prefix: test-alb\n    vars:\n      name: ${name}\n",
    );
    sandbox
        .cmd()
        .arg("check")
        .arg(&suite)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 case OK"));
    assert!(sandbox.subcommands().is_empty(), "check never runs terraform");
}

#[test]
fn test_demo_suites_pass_check() {
    let sandbox = Sandbox::new();
    for name in ["alb.yaml", "ecs.yaml", "vpc.yaml", "dev-env.yaml"] {
        sandbox
            .cmd()
            .arg("check")
            .arg(demo_suite(name))
            .assert()
            .success();
    }
    assert!(sandbox.subcommands().is_empty());
}

#[test]
fn test_vpc_demo_checks_subnets_security_group_and_cidr() {
    let loaded = load_suite(&demo_suite("vpc.yaml")).expect("load");
    let case = &loaded.suite.cases[0];
    assert_eq!(case.mode, RunMode::ApplyAndDestroy);
    let predicates: Vec<&Predicate> = case.expect.iter().map(|e| &e.predicate).collect();
    assert!(predicates.contains(&&Predicate::NamedLen {
        name: "subnets".into(),
        len: 2
    }));
    assert!(predicates.contains(&&Predicate::NamedHasKey {
        name: "security_group_ids".into(),
        key: "web-sg".into()
    }));
    assert!(case.probes.iter().any(|p| matches!(
        p,
        Probe::VpcCidrBlock { vpc_id_output, equals }
            if vpc_id_output == "vpc_id" && equals == "10.0.0.0/16"
    )));

    let VarValue::Map(subnets) = &case.vars["subnets"] else {
        panic!("subnets should be a map");
    };
    assert!(
        subnets
            .values()
            .all(|s| matches!(s, VarValue::Map(m) if m.contains_key("subnet_type")))
    );
    let VarValue::List(rules) = &case.vars["security_group_rules"] else {
        panic!("security_group_rules should be a list");
    };
    assert!(matches!(&rules[0], VarValue::Map(m) if m.contains_key("security_group_name")));
}

#[test]
fn test_ecs_minimal_demo_applies() {
    let loaded = load_suite(&demo_suite("ecs.yaml")).expect("load");
    let case = loaded
        .suite
        .cases
        .iter()
        .find(|c| c.name == "ecs-minimal")
        .expect("ecs-minimal case");
    assert_eq!(case.mode, RunMode::ApplyAndDestroy);
    assert!(case.expect.iter().any(|e| e.predicate
        == Predicate::NamedContains {
            name: "cluster_arn".into(),
            value: "arn:aws:ecs".into()
        }));
    assert!(case.expect.iter().any(|e| e.predicate
        == Predicate::NamedNotEmpty {
            name: "cluster_arn".into()
        }));
}

#[test]
fn test_check_rejects_unknown_placeholder() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite(
        "suite.yaml",
        "cases:\n  - name: a\n    module: modules/alb\n    vars:\n      name: ${nmae}\n",
    );
    sandbox
        .cmd()
        .arg("check")
        .arg(&suite)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown placeholder"))
        .stderr(predicate::str::contains("nmae"));
}

#[test]
fn test_check_json_error_object() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite("suite.yaml", "cases: []\n");
    let output = sandbox
        .cmd()
        .args(["--json", "check"])
        .arg(&suite)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "invalid_suite");
}

#[cfg(unix)]
#[test]
fn test_non_utf8_environment_does_not_panic() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt as _;

    let sandbox = Sandbox::new();
    let suite = sandbox.suite("suite.yaml", "cases:\n  - name: a\n    module: modules/alb\n");
    sandbox
        .cmd()
        .env("INFRA_VERIFY_UNRELATED", OsStr::from_bytes(b"\xff\xfe"))
        .arg("check")
        .arg(&suite)
        .assert()
        .success();
}

#[test]
fn test_invalid_region_is_rejected() {
    let sandbox = Sandbox::new();
    let suite = sandbox.suite("suite.yaml", "cases:\n  - name: a\n    module: modules/alb\n");
    sandbox
        .cmd()
        .args(["run", "--region", "tokyo"])
        .arg(&suite)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid region 'tokyo'"));
}

// --- doctor ---

#[test]
fn test_doctor_with_fake_terraform_is_healthy() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .args(["--json", "doctor"])
        .output()
        .expect("run");
    assert!(output.status.success(), "{output:?}");
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["status"], "healthy");
    assert_eq!(value["checks"]["tool_version"], "1.7.5");
    assert_eq!(value["checks"]["cloud_cli_found"], false);
    assert_eq!(value["warnings"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_doctor_without_terraform_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .env("INFRA_VERIFY_TERRAFORM_BIN", "/nonexistent/terraform")
        .arg("doctor")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("terraform not found"));
}
