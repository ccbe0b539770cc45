//! Driving the external compose tool.
//!
//! [`ComposeDriver`] is the seam between the reconciler and the process
//! running `docker compose` (or any compatible tool). [`ComposeCli`] is the
//! production implementation; tests substitute a fake.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ComposeSettings;
use crate::error::ReconcileError;

pub const UP_ARGS: [&str; 4] = ["up", "-d", "--remove-orphans", "--force-recreate"];
pub const DOWN_ARGS: [&str; 2] = ["down", "--remove-orphans"];
pub const PS_ARGS: [&str; 3] = ["ps", "--format", "json"];

/// Captured output of a successful compose invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ComposeOutput {
    pub fn combined(&self) -> String {
        combined_output(&self.stdout, &self.stderr)
    }
}

/// One row of `compose ps --format json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceStatus {
    #[serde(rename = "Service", default)]
    pub service: String,

    #[serde(rename = "State", default)]
    pub state: String,

    /// Empty when the service has no healthcheck
    #[serde(rename = "Health", default)]
    pub health: String,
}

impl ServiceStatus {
    pub fn is_ready(&self) -> bool {
        self.state == "running" && (self.health.is_empty() || self.health == "healthy")
    }

    pub fn describe(&self) -> String {
        if self.health.is_empty() {
            format!("{}={}", self.service, self.state)
        } else {
            format!("{}={}({})", self.service, self.state, self.health)
        }
    }
}

/// Parse `ps --format json` output.
///
/// Newer compose releases print one JSON object per line; older ones print
/// a single array. Both are accepted.
pub fn parse_ps_output(stdout: &str) -> Result<Vec<ServiceStatus>, ReconcileError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| ReconcileError::StatusParse(e.to_string()));
    }
    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(|e| ReconcileError::StatusParse(e.to_string())))
        .collect()
}

fn combined_output(stdout: &str, stderr: &str) -> String {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, _) => stderr.trim_end().to_string(),
        (false, true) => stdout.trim_end().to_string(),
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
    }
}

fn to_args<const N: usize>(args: [&str; N]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Operations the reconciler needs from a compose tool
#[allow(async_fn_in_trait)]
pub trait ComposeDriver {
    /// Run the tool in `dir` with `args`. Non-zero exit is an error carrying
    /// the combined output; cancellation kills the process.
    async fn run(
        &self,
        dir: &Path,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<ComposeOutput, ReconcileError>;

    async fn up(&self, dir: &Path, cancel: &CancellationToken) -> Result<ComposeOutput, ReconcileError> {
        self.run(dir, &to_args(UP_ARGS), cancel).await
    }

    async fn down(&self, dir: &Path, cancel: &CancellationToken) -> Result<ComposeOutput, ReconcileError> {
        self.run(dir, &to_args(DOWN_ARGS), cancel).await
    }

    async fn ps(&self, dir: &Path, cancel: &CancellationToken) -> Result<Vec<ServiceStatus>, ReconcileError> {
        let output = self.run(dir, &to_args(PS_ARGS), cancel).await?;
        parse_ps_output(&output.stdout)
    }

    async fn logs(
        &self,
        dir: &Path,
        service: Option<&str>,
        tail: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<String, ReconcileError> {
        let mut args = to_args(["logs", "--no-color"]);
        if let Some(tail) = tail {
            args.push("--tail".to_string());
            args.push(tail.to_string());
        }
        if let Some(service) = service {
            args.push(service.to_string());
        }
        let output = self.run(dir, &args, cancel).await?;
        Ok(output.combined())
    }
}

/// Production driver: spawns `<program> <subcommand...> <args...>`
#[derive(Debug, Clone)]
pub struct ComposeCli {
    program: String,
    subcommand: Vec<String>,
    timeout: Duration,
}

impl ComposeCli {
    pub fn new(program: impl Into<String>, subcommand: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            subcommand,
            timeout,
        }
    }

    pub fn from_settings(settings: &ComposeSettings) -> Self {
        Self::new(
            settings.program.clone(),
            settings.subcommand.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn display_command(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.subcommand.iter().map(String::as_str))
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ComposeDriver for ComposeCli {
    async fn run(
        &self,
        dir: &Path,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<ComposeOutput, ReconcileError> {
        let command = self.display_command(args);
        debug!(command = %command, dir = %dir.display(), "Running compose");

        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }

        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.subcommand)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ReconcileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                let _ = child.kill().await;
                Err(ReconcileError::Cancelled)
            }
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                (status, stdout, stderr)
            } => {
                let (status, stdout, stderr) = result;
                let status = status.map_err(|source| ReconcileError::Spawn {
                    program: self.program.clone(),
                    source,
                })?;
                let output = ComposeOutput {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                };
                if status.success() {
                    Ok(output)
                } else {
                    Err(ReconcileError::ComposeFailed {
                        command,
                        status: status.to_string(),
                        output: output.combined(),
                    })
                }
            }
            () = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                Err(ReconcileError::TimedOut {
                    command,
                    timeout: self.timeout,
                })
            }
        }
    }
}
