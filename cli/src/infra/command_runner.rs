//! Process execution for the terraform and AWS CLI adapters.
//!
//! Every child gets a null stdin, piped stdout and stderr, and a hard
//! deadline after which it is killed.

use std::collections::BTreeMap;
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::application::ports::CommandRunner;
use crate::domain::error::InvocationError;

/// Timeout for short queries such as `version`.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// `CommandRunner` backed by `tokio::process`.
///
/// The deadline is enforced with `select!` and an explicit `kill()`, because
/// dropping a timed-out future leaves the child running on Windows.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Read a pipe to the end. A broken pipe yields whatever arrived before it.
async fn drain(pipe: Option<impl AsyncRead + Unpin>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        env: &BTreeMap<String, String>,
    ) -> Result<Output> {
        self.run_with_timeout(program, args, env, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        env: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Output> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        tokio::select! {
            (status, stdout, stderr) = async {
                tokio::join!(child.wait(), drain(stdout), drain(stderr))
            } => Ok(Output {
                status: status.with_context(|| format!("waiting for {program}"))?,
                stdout,
                stderr,
            }),
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                Err(InvocationError::TimedOut {
                    program: program.to_string(),
                    seconds: timeout.as_secs(),
                }
                .into())
            }
        }
    }
}
