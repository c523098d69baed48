//! Tests for the `run_doctor` application service.

#![allow(clippy::expect_used)]

use infra_verify::application::services::doctor::run_doctor;

use crate::mocks::{CollectingReporter, FakeCloud, FakeTool};

#[tokio::test]
async fn test_healthy_toolchain_has_no_issues() {
    let cloud = FakeCloud::with_version("aws-cli/2.15.0 Python/3.11.6");
    let reporter = CollectingReporter::default();
    let checks = run_doctor(
        &FakeTool(Some(r#"{"terraform_version":"1.7.5"}"#)),
        &cloud,
        &reporter,
    )
    .await
    .expect("doctor");
    assert!(checks.tool_found);
    assert_eq!(checks.tool_version.as_deref(), Some("1.7.5"));
    assert!(checks.tool_version_ok);
    assert!(checks.issues().is_empty());
    assert!(checks.warnings().is_empty());
    assert!(reporter.messages().iter().any(|m| m.starts_with("ok:")));
}

#[tokio::test]
async fn test_missing_terraform_is_an_issue() {
    let checks = run_doctor(
        &FakeTool(None),
        &FakeCloud::default(),
        &CollectingReporter::default(),
    )
    .await
    .expect("doctor");
    assert!(!checks.tool_found);
    assert_eq!(checks.issues(), ["terraform not found or not runnable"]);
}

#[tokio::test]
async fn test_old_terraform_is_an_issue() {
    let checks = run_doctor(
        &FakeTool(Some("Terraform v0.12.31\n")),
        &FakeCloud::default(),
        &CollectingReporter::default(),
    )
    .await
    .expect("doctor");
    assert!(checks.tool_found);
    assert!(!checks.tool_version_ok);
    assert!(checks.issues()[0].contains("0.12.31"));
}

#[tokio::test]
async fn test_missing_aws_cli_is_only_a_warning() {
    let checks = run_doctor(
        &FakeTool(Some(r#"{"terraform_version":"1.9.0"}"#)),
        &FakeCloud::default(),
        &CollectingReporter::default(),
    )
    .await
    .expect("doctor");
    assert!(checks.issues().is_empty());
    assert_eq!(checks.warnings().len(), 1);
}
