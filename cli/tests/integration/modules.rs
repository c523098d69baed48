//! Scenario tests against real modules and a real AWS account.
//!
//! Ignored by default. Run with
//! `INFRA_VERIFY_MODULES_DIR=<infra/aws> cargo test -- --ignored` and valid
//! AWS credentials. `TERRATEST_PLAN_ONLY=true` keeps the apply scenarios
//! from creating anything.

#![allow(clippy::expect_used)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use infra_verify::application::services::suite::run_probes;
use infra_verify::application::services::verifier::Verifier;
use infra_verify::domain::{
    ModuleUnderTest, VerifierConfig, evaluate_all, unique_id, unique_name,
};
use infra_verify::infra::aws::AwsCli;
use infra_verify::infra::config::YamlConfigStore;
use infra_verify::infra::terraform::TerraformCli;
use verify_common::{Expectation, Probe, RunMode, VarValue};

fn modules_dir() -> PathBuf {
    std::env::var_os("INFRA_VERIFY_MODULES_DIR")
        .map(PathBuf::from)
        .expect("INFRA_VERIFY_MODULES_DIR must point at the infra/aws directory")
}

fn config() -> VerifierConfig {
    YamlConfigStore::new(None).load().expect("config")
}

fn tags(component: &str) -> BTreeMap<String, VarValue> {
    BTreeMap::from([
        ("Environment".to_string(), VarValue::from("test")),
        ("Component".to_string(), VarValue::from(component)),
    ])
}

const SUBNETS: [&str; 2] = ["subnet-12345678", "subnet-87654321"];

#[tokio::test]
#[ignore = "requires terraform, AWS credentials and INFRA_VERIFY_MODULES_DIR"]
async fn alb_module_plan() {
    let config = config();
    let verifier = Verifier::new(TerraformCli::from_config(&config), config);
    let name = unique_name("test-alb");
    let module = ModuleUnderTest::builder(modules_dir().join("modules/alb"))
        .var("name", &name)
        .var("vpc_id", "vpc-12345678")
        .var("security_groups", vec!["sg-12345678"])
        .var("subnets", SUBNETS.to_vec())
        .var("target_group_port", 3000)
        .var("listener_port", "80")
        .var("tags", tags("LoadBalancer"))
        .build()
        .expect("module");

    let expectations = [
        Expectation::output_contains("aws_lb.main").with_message("Plan should include ALB resource"),
        Expectation::output_contains(&name).with_message("Plan should include ALB name"),
        Expectation::output_contains("application").with_message("ALB should be application type"),
        Expectation::output_contains("aws_lb_target_group.main"),
        Expectation::output_contains("3000").with_message("Target group should use port 3000"),
        Expectation::output_contains("HTTP"),
        Expectation::output_contains("aws_lb_listener.main"),
        Expectation::output_contains("sg-12345678"),
        Expectation::output_contains("subnet-12345678"),
        Expectation::output_contains("LoadBalancer"),
        Expectation::resources_to_add(3),
    ];
    verifier
        .verify(&module, RunMode::PlanOnly, &expectations)
        .await
        .expect("plan")
        .assert_passed();
}

#[tokio::test]
#[ignore = "requires terraform and INFRA_VERIFY_MODULES_DIR"]
async fn alb_module_validates_without_vars() {
    let config = config();
    let verifier = Verifier::new(TerraformCli::from_config(&config), config);
    let module = ModuleUnderTest::builder(modules_dir().join("modules/alb"))
        .build()
        .expect("module");
    let result = verifier
        .run(&module, RunMode::SyntaxCheck)
        .await
        .expect("validate");
    assert!(!result.text.contains("Error:"), "{}", result.text);
}

#[tokio::test]
#[ignore = "creates real ECS resources; requires AWS credentials"]
async fn ecs_module_apply() {
    let config = config();
    let verifier = Verifier::new(TerraformCli::from_config(&config), config);
    let id = unique_id();
    let cluster = format!("test-ecs-cluster-{id}");
    let family = format!("test-task-{id}");
    let service = format!("test-service-{id}");
    let module = ModuleUnderTest::builder(modules_dir().join("modules/ecs"))
        .var("cluster_name", &cluster)
        .var("task_definition_family", &family)
        .var("service_name", &service)
        .var("cpu", "256")
        .var("memory", "512")
        .var("container_name", "test-app")
        .var("container_image", "nginx:latest")
        .var("container_port", 80)
        .var("subnets", SUBNETS.to_vec())
        .var("security_groups", vec!["sg-12345678"])
        .var(
            "target_group_arn",
            "arn:aws:elasticloadbalancing:ap-northeast-1:123456789012:targetgroup/test-tg/1234567890123456",
        )
        .var("tags", tags("ECS"))
        .build()
        .expect("module");

    let expectations = [
        Expectation::named_not_empty("cluster_id"),
        Expectation::named_contains("cluster_id", &cluster),
        Expectation::named_contains("cluster_arn", "arn:aws:ecs"),
        Expectation::named_contains("cluster_arn", &cluster),
        Expectation::named_contains("task_definition_arn", "arn:aws:ecs"),
        Expectation::named_contains("task_definition_arn", &family),
        Expectation::named_equals("service_name", &service),
    ];
    verifier
        .verify(&module, RunMode::ApplyAndDestroy, &expectations)
        .await
        .expect("apply")
        .assert_passed();
}

#[tokio::test]
#[ignore = "creates real ECS resources; requires AWS credentials"]
async fn ecs_module_minimal_apply() {
    let config = config();
    let verifier = Verifier::new(TerraformCli::from_config(&config), config);
    let id = unique_id();
    let module = ModuleUnderTest::builder(modules_dir().join("modules/ecs"))
        .var("cluster_name", format!("test-ecs-min-{id}"))
        .var("task_definition_family", format!("test-task-min-{id}"))
        .var("service_name", format!("test-service-min-{id}"))
        .var("cpu", "256")
        .var("memory", "512")
        .var("container_name", "test-app")
        .var("container_image", "nginx:latest")
        .var("container_port", 80)
        .var("subnets", vec!["subnet-12345678"])
        .var("security_groups", vec!["sg-12345678"])
        .var(
            "target_group_arn",
            "arn:aws:elasticloadbalancing:ap-northeast-1:123456789012:targetgroup/test-tg/1234567890123456",
        )
        .build()
        .expect("module");

    let expectations = [
        Expectation::named_not_empty("cluster_arn"),
        Expectation::named_contains("cluster_arn", "arn:aws:ecs"),
        Expectation::named_not_empty("task_definition_arn"),
    ];
    verifier
        .verify(&module, RunMode::ApplyAndDestroy, &expectations)
        .await
        .expect("apply")
        .assert_passed();
}

#[tokio::test]
#[ignore = "creates a real VPC; requires AWS credentials"]
async fn vpc_module_apply() {
    let config = config();
    let cloud = AwsCli::from_config(&config);
    let region = config.region.clone();
    let zone = format!("{region}a");
    let verifier = Verifier::new(TerraformCli::from_config(&config), config);
    let subnet = |cidr: &str, kind: &str| {
        VarValue::map([
            ("cidr_block", VarValue::from(cidr)),
            ("availability_zone", VarValue::from(zone.as_str())),
            ("subnet_type", VarValue::from(kind)),
        ])
    };
    let module = ModuleUnderTest::builder(modules_dir().join("modules/vpc"))
        .var("name", unique_name("test-vpc"))
        .var("cidr_block", "10.0.0.0/16")
        .var("enable_dns_support", true)
        .var("enable_dns_hostnames", true)
        .var(
            "subnets",
            VarValue::map([
                ("public", subnet("10.0.1.0/24", "public")),
                ("private", subnet("10.0.2.0/24", "private")),
            ]),
        )
        .var("create_internet_gateway", true)
        .var(
            "security_groups",
            VarValue::map([(
                "web-sg",
                VarValue::map([
                    ("name", "web-sg"),
                    ("description", "Security group for web servers"),
                ]),
            )]),
        )
        .var(
            "security_group_rules",
            VarValue::list([VarValue::map([
                ("security_group_name", VarValue::from("web-sg")),
                ("type", VarValue::from("ingress")),
                ("cidr_blocks", VarValue::from(vec!["0.0.0.0/0"])),
                ("from_port", VarValue::from(80)),
                ("to_port", VarValue::from(80)),
                ("protocol", VarValue::from("tcp")),
                ("description", VarValue::from("Allow HTTP inbound traffic")),
            ])]),
        )
        .build()
        .expect("module");

    let (cloud, region) = (&cloud, region.as_str());
    let verdict = verifier
        .apply_scoped(&module, |result| async move {
            let mut verdict = evaluate_all(
                &[
                    Expectation::named_not_empty("vpc_id"),
                    Expectation::named_len("subnets", 2),
                    Expectation::named_has_key("security_group_ids", "web-sg"),
                ],
                &result,
            );
            let cidr = Probe::VpcCidrBlock {
                vpc_id_output: "vpc_id".into(),
                equals: "10.0.0.0/16".into(),
            };
            run_probes(cloud, &[cidr], &result, region, &mut verdict).await;
            Ok(verdict)
        })
        .await
        .expect("apply");
    verdict.assert_passed();
}

#[tokio::test]
#[ignore = "requires terraform, AWS credentials and INFRA_VERIFY_MODULES_DIR"]
async fn dev_environment_plan() {
    let config = config();
    let verifier = Verifier::new(TerraformCli::from_config(&config), config);
    let project = unique_name("test-english-card");
    let module = ModuleUnderTest::builder(modules_dir().join("env/dev"))
        .var("project_name", &project)
        .var("environment", "test")
        .var("vpc_cidr", "10.1.0.0/16")
        .build()
        .expect("module");

    let mut expectations: Vec<Expectation> = [
        "module.vpc",
        "aws_vpc",
        "aws_subnet",
        "aws_internet_gateway",
        "aws_nat_gateway",
        "aws_route_table",
        "aws_security_group",
        "module.alb",
        "aws_lb",
        "aws_lb_target_group",
        "aws_lb_listener",
        "module.ecs",
        "aws_ecs_cluster",
        "aws_ecs_service",
        "aws_ecs_task_definition",
        "aws_iam_role",
        "aws_iam_policy",
        "aws_cloudwatch_log_group",
    ]
    .into_iter()
    .map(Expectation::output_contains)
    .collect();
    expectations.push(Expectation::output_contains(&project));

    verifier
        .verify(&module, RunMode::PlanOnly, &expectations)
        .await
        .expect("plan")
        .assert_passed();
}
