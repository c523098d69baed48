//! Infrastructure implementation of the `CloudInspector` port via the AWS CLI.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::application::ports::{CloudInspector, CommandRunner};
use crate::domain::VerifierConfig;
use crate::domain::error::{InvocationError, Operation};
use crate::infra::command_runner::{QUERY_TIMEOUT, TokioCommandRunner};

/// Adapter that queries AWS through the `aws` CLI.
pub struct AwsCli<R: CommandRunner> {
    runner: R,
    binary: String,
    env: BTreeMap<String, String>,
}

impl<R: CommandRunner> AwsCli<R> {
    pub fn new(runner: R, binary: impl Into<String>, env: BTreeMap<String, String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
            env,
        }
    }

    async fn query(&self, args: &[&str]) -> Result<String> {
        let output = self
            .runner
            .run(&self.binary, args, &self.env)
            .await
            .with_context(|| format!("{} {}", self.binary, args.join(" ")))?;
        if !output.status.success() {
            return Err(InvocationError::ToolFailed {
                operation: Operation::Probe,
                exit_code: output.status.code(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl AwsCli<TokioCommandRunner> {
    /// Production adapter for `config`.
    #[must_use]
    pub fn from_config(config: &VerifierConfig) -> Self {
        Self::new(
            TokioCommandRunner::new(QUERY_TIMEOUT),
            config.aws_bin.clone(),
            config.base_env(),
        )
    }
}

impl<R: CommandRunner> CloudInspector for AwsCli<R> {
    async fn cli_version(&self) -> Result<String> {
        self.query(&["--version"]).await
    }

    async fn vpc_cidr_block(&self, vpc_id: &str, region: &str) -> Result<String> {
        let cidr = self
            .query(&[
                "ec2",
                "describe-vpcs",
                "--vpc-ids",
                vpc_id,
                "--region",
                region,
                "--query",
                "Vpcs[0].CidrBlock",
                "--output",
                "text",
            ])
            .await?;
        if cidr.is_empty() || cidr == "None" {
            anyhow::bail!("VPC {vpc_id} not found in {region}");
        }
        Ok(cidr)
    }
}
