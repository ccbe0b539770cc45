//! Local reconciliation
//!
//! Applies a local runtime config to a working directory: write the compose
//! document, the gateway document and the side-channel files, then run
//! `compose up -d --remove-orphans --force-recreate`. Every run recreates
//! every service; nothing is diffed against what is already running.
//!
//! Callers must not reconcile the same working directory concurrently.

pub mod compose;
pub mod side_channel;
pub mod state;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ComposeSettings;
use crate::desired::DesiredState;
use crate::error::ReconcileError;
use crate::fs::{content_digest, write_document};
use crate::runtime::AiRuntimeConfig;
use crate::runtime::local::{COMPOSE_FILE_NAME, GATEWAY_CONFIG_DIR, GATEWAY_CONFIG_FILE, LocalRuntimeConfig};

pub use compose::{ComposeCli, ComposeDriver, ComposeOutput, ServiceStatus, parse_ps_output};
pub use side_channel::{SideChannelEntry, SideChannelOutcome, side_channel_entries, write_side_channel_files};
pub use state::{PhaseTransition, ReconcilePhase, ReconcileStateMachine};

/// What a successful reconciliation wrote and how it got there
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub working_dir: PathBuf,
    pub compose_digest: String,
    pub gateway_digest: String,
    pub side_channel_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
    pub services: Vec<String>,
    pub transitions: Vec<PhaseTransition>,
}

impl ReconcileReport {
    pub fn final_phase(&self) -> Option<ReconcilePhase> {
        self.transitions.last().map(|t| t.phase)
    }
}

struct Applied {
    compose_digest: String,
    gateway_digest: String,
    side_channel: SideChannelOutcome,
    services: Vec<String>,
}

pub struct LocalReconciler<D: ComposeDriver> {
    driver: D,
    working_dir: PathBuf,
    health_timeout: Duration,
    poll_interval: Duration,
}

impl LocalReconciler<ComposeCli> {
    /// Reconciler driving the configured compose tool.
    pub fn from_settings(working_dir: PathBuf, settings: &ComposeSettings) -> Self {
        Self::new(ComposeCli::from_settings(settings), working_dir)
            .with_health_timeout(Duration::from_secs(settings.health_timeout_secs))
            .with_poll_interval(Duration::from_millis(settings.health_poll_interval_ms))
    }
}

impl<D: ComposeDriver> LocalReconciler<D> {
    /// No readiness wait until [`Self::with_health_timeout`] is set.
    pub fn new(driver: D, working_dir: PathBuf) -> Self {
        Self {
            driver,
            working_dir,
            health_timeout: Duration::ZERO,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(10));
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub async fn reconcile(
        &self,
        desired: &DesiredState,
        config: &AiRuntimeConfig,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, ReconcileError> {
        let AiRuntimeConfig::Local(local) = config else {
            return Err(ReconcileError::UnsupportedRuntime(config.target().to_string()));
        };

        let mut machine = ReconcileStateMachine::new();
        machine.transition(ReconcilePhase::Applying)?;

        match self.apply(desired, local, &mut machine, cancel).await {
            Ok(applied) => {
                machine.transition(ReconcilePhase::Ready)?;
                info!(
                    dir = %self.working_dir.display(),
                    services = applied.services.len(),
                    "Reconciliation complete"
                );
                Ok(ReconcileReport {
                    working_dir: self.working_dir.clone(),
                    compose_digest: applied.compose_digest,
                    gateway_digest: applied.gateway_digest,
                    side_channel_files: applied.side_channel.written,
                    warnings: applied.side_channel.warnings,
                    services: applied.services,
                    transitions: machine.into_transitions(),
                })
            }
            Err(e) => {
                machine.abort(&e);
                warn!(phase = %machine.phase(), error = %e, "Reconciliation stopped");
                Err(e)
            }
        }
    }

    async fn apply(
        &self,
        desired: &DesiredState,
        local: &LocalRuntimeConfig,
        machine: &mut ReconcileStateMachine,
        cancel: &CancellationToken,
    ) -> Result<Applied, ReconcileError> {
        tokio::fs::create_dir_all(&self.working_dir)
            .await
            .map_err(|source| ReconcileError::Write {
                path: self.working_dir.clone(),
                source,
            })?;

        let compose_yaml = local.compose.to_yaml().map_err(|source| ReconcileError::Render {
            what: "compose document",
            source,
        })?;
        let gateway_yaml = local.gateway.to_yaml().map_err(|source| ReconcileError::Render {
            what: "gateway document",
            source,
        })?;

        write_document(&self.working_dir.join(COMPOSE_FILE_NAME), compose_yaml.as_bytes()).await?;
        write_document(
            &self
                .working_dir
                .join(GATEWAY_CONFIG_DIR)
                .join(GATEWAY_CONFIG_FILE),
            gateway_yaml.as_bytes(),
        )
        .await?;

        let side_channel = write_side_channel_files(&self.working_dir, &desired.agents).await;

        info!(dir = %self.working_dir.display(), "Starting compose services");
        self.driver.up(&self.working_dir, cancel).await?;

        let services: Vec<String> = local.compose.service_names().map(str::to_string).collect();
        if !self.health_timeout.is_zero() {
            machine.transition(ReconcilePhase::WaitingHealthy)?;
            self.wait_until_ready(&services, cancel).await?;
        }

        Ok(Applied {
            compose_digest: content_digest(compose_yaml.as_bytes()),
            gateway_digest: content_digest(gateway_yaml.as_bytes()),
            side_channel,
            services,
        })
    }

    /// Poll `ps` until every expected service is ready.
    async fn wait_until_ready(
        &self,
        expected: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        let deadline = Instant::now() + self.health_timeout;

        loop {
            let statuses = self.driver.ps(&self.working_dir, cancel).await?;
            let ready: BTreeSet<&str> = statuses
                .iter()
                .filter(|s| s.is_ready())
                .map(|s| s.service.as_str())
                .collect();
            let pending: Vec<&String> = expected
                .iter()
                .filter(|name| !ready.contains(name.as_str()))
                .collect();

            if pending.is_empty() {
                return Ok(());
            }

            if Instant::now() >= deadline {
                let pending = pending
                    .iter()
                    .map(|name| {
                        statuses
                            .iter()
                            .find(|s| &&s.service == name)
                            .map(ServiceStatus::describe)
                            .unwrap_or_else(|| format!("{name}=missing"))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(ReconcileError::NotReady {
                    timeout: self.health_timeout,
                    pending,
                });
            }

            tokio::select! {
                () = cancel.cancelled() => return Err(ReconcileError::Cancelled),
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    pub async fn down(&self, cancel: &CancellationToken) -> Result<ComposeOutput, ReconcileError> {
        info!(dir = %self.working_dir.display(), "Stopping compose services");
        self.driver.down(&self.working_dir, cancel).await
    }

    pub async fn ps(&self, cancel: &CancellationToken) -> Result<Vec<ServiceStatus>, ReconcileError> {
        self.driver.ps(&self.working_dir, cancel).await
    }

    pub async fn logs(
        &self,
        service: Option<&str>,
        tail: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<String, ReconcileError> {
        self.driver.logs(&self.working_dir, service, tail, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    use crate::desired::{Agent, AgentDeployment, LocalDeployment, LocalMcpServer, McpServer, McpServerKind};
    use crate::mcp::{LocalTransport, ResolvedServer};
    use crate::runtime::{ClusterManifests, LocalTranslator};
    use tempfile::TempDir;

    /// Records every invocation; `ps` answers are served in order, the last
    /// one repeating.
    #[derive(Default)]
    struct FakeDriver {
        calls: Mutex<Vec<Vec<String>>>,
        ps_responses: Mutex<VecDeque<String>>,
        fail_up: bool,
        block_up: bool,
    }

    impl FakeDriver {
        fn with_ps(responses: &[&str]) -> Self {
            Self {
                ps_responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ComposeDriver for FakeDriver {
        async fn run(
            &self,
            _dir: &Path,
            args: &[String],
            cancel: &CancellationToken,
        ) -> Result<ComposeOutput, ReconcileError> {
            self.calls.lock().unwrap().push(args.to_vec());

            match args.first().map(String::as_str) {
                Some("up") if self.block_up => {
                    cancel.cancelled().await;
                    Err(ReconcileError::Cancelled)
                }
                Some("up") if self.fail_up => Err(ReconcileError::ComposeFailed {
                    command: "docker compose up".to_string(),
                    status: "exit status: 1".to_string(),
                    output: "pull access denied".to_string(),
                }),
                Some("ps") => {
                    let mut queue = self.ps_responses.lock().unwrap();
                    let stdout = if queue.len() > 1 {
                        queue.pop_front().unwrap_or_default()
                    } else {
                        queue.front().cloned().unwrap_or_default()
                    };
                    Ok(ComposeOutput {
                        stdout,
                        stderr: String::new(),
                    })
                }
                _ => Ok(ComposeOutput::default()),
            }
        }
    }

    fn desired() -> DesiredState {
        DesiredState {
            agents: vec![Agent {
                name: "researcher".to_string(),
                version: "0.2.0".to_string(),
                namespace: String::new(),
                deployment: AgentDeployment {
                    image: "researcher:0.2.0".to_string(),
                    env: BTreeMap::new(),
                },
                resolved_mcp_servers: vec![ResolvedServer::remote(
                    "fetch",
                    "https://fetch.example.com/mcp",
                    BTreeMap::new(),
                )],
            }],
            mcp_servers: vec![McpServer {
                name: "time".to_string(),
                namespace: String::new(),
                kind: McpServerKind::Local(LocalMcpServer {
                    transport: LocalTransport::Stdio,
                    deployment: LocalDeployment {
                        command: "uvx".to_string(),
                        args: vec!["mcp-server-time".to_string()],
                        ..LocalDeployment::default()
                    },
                }),
            }],
        }
    }

    fn local_config(state: &DesiredState) -> AiRuntimeConfig {
        AiRuntimeConfig::Local(LocalTranslator::default().translate(state).unwrap())
    }

    const ALL_RUNNING: &str = r#"{"Service":"agent_gateway","State":"running"}
{"Service":"researcher-0.2.0","State":"running"}
{"Service":"time","State":"running"}"#;

    #[tokio::test]
    async fn test_reconcile_writes_files_then_runs_up() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("runtime");
        let reconciler = LocalReconciler::new(FakeDriver::default(), dir.clone());

        let state = desired();
        let report = reconciler
            .reconcile(&state, &local_config(&state), &CancellationToken::new())
            .await
            .unwrap();

        let compose = std::fs::read_to_string(dir.join("docker-compose.yaml")).unwrap();
        let gateway = std::fs::read_to_string(dir.join("agentgateway/local.yaml")).unwrap();
        assert!(compose.contains("agent_gateway"));
        assert!(gateway.contains("pathPrefix: /time/mcp"));
        assert!(dir.join("mcp-servers-researcher.json").exists());

        assert_eq!(report.compose_digest, content_digest(compose.as_bytes()));
        assert_eq!(report.gateway_digest, content_digest(gateway.as_bytes()));
        assert_eq!(report.side_channel_files.len(), 1);
        assert_eq!(report.final_phase(), Some(ReconcilePhase::Ready));

        assert_eq!(
            reconciler.driver().calls(),
            vec![vec!["up", "-d", "--remove-orphans", "--force-recreate"]]
        );
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent_on_disk() {
        let tmp = TempDir::new().unwrap();
        let reconciler = LocalReconciler::new(FakeDriver::default(), tmp.path().to_path_buf());
        let state = desired();
        let config = local_config(&state);

        let first = reconciler
            .reconcile(&state, &config, &CancellationToken::new())
            .await
            .unwrap();
        let second = reconciler
            .reconcile(&state, &config, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(first.compose_digest, second.compose_digest);
        assert_eq!(first.gateway_digest, second.gateway_digest);
    }

    #[tokio::test]
    async fn test_cluster_config_rejected() {
        let tmp = TempDir::new().unwrap();
        let reconciler = LocalReconciler::new(FakeDriver::default(), tmp.path().to_path_buf());

        let err = reconciler
            .reconcile(
                &DesiredState::default(),
                &AiRuntimeConfig::Cluster(ClusterManifests::default()),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::UnsupportedRuntime(ref t) if t == "cluster"));
        assert!(reconciler.driver().calls().is_empty());
    }

    #[tokio::test]
    async fn test_compose_failure_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let driver = FakeDriver {
            fail_up: true,
            ..FakeDriver::default()
        };
        let reconciler = LocalReconciler::new(driver, tmp.path().to_path_buf());
        let state = desired();

        let err = reconciler
            .reconcile(&state, &local_config(&state), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            ReconcileError::ComposeFailed { output, .. } => assert!(output.contains("pull access denied")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cancellation_during_up() {
        let tmp = TempDir::new().unwrap();
        let driver = FakeDriver {
            block_up: true,
            ..FakeDriver::default()
        };
        let reconciler = LocalReconciler::new(driver, tmp.path().to_path_buf());
        let state = desired();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = reconciler
            .reconcile(&state, &local_config(&state), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_waits_until_services_ready() {
        let tmp = TempDir::new().unwrap();
        let driver = FakeDriver::with_ps(&[
            r#"{"Service":"agent_gateway","State":"created"}"#,
            ALL_RUNNING,
        ]);
        let reconciler = LocalReconciler::new(driver, tmp.path().to_path_buf())
            .with_health_timeout(Duration::from_secs(5))
            .with_poll_interval(Duration::from_millis(10));
        let state = desired();

        let report = reconciler
            .reconcile(&state, &local_config(&state), &CancellationToken::new())
            .await
            .unwrap();

        let phases: Vec<_> = report.transitions.iter().map(|t| t.phase).collect();
        assert_eq!(
            phases,
            vec![
                ReconcilePhase::Idle,
                ReconcilePhase::Applying,
                ReconcilePhase::WaitingHealthy,
                ReconcilePhase::Ready
            ]
        );
        let ps_calls = reconciler
            .driver()
            .calls()
            .iter()
            .filter(|c| c[0] == "ps")
            .count();
        assert_eq!(ps_calls, 2);
    }

    #[tokio::test]
    async fn test_not_ready_after_timeout() {
        let tmp = TempDir::new().unwrap();
        let driver = FakeDriver::with_ps(&[
            r#"{"Service":"agent_gateway","State":"running"}
{"Service":"time","State":"restarting"}"#,
        ]);
        let reconciler = LocalReconciler::new(driver, tmp.path().to_path_buf())
            .with_health_timeout(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(10));
        let state = desired();

        let err = reconciler
            .reconcile(&state, &local_config(&state), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            ReconcileError::NotReady { pending, .. } => {
                assert!(pending.contains("time=restarting"));
                assert!(pending.contains("researcher-0.2.0=missing"));
                assert!(!pending.contains("agent_gateway"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_down_ps_logs_pass_through() {
        let tmp = TempDir::new().unwrap();
        let reconciler = LocalReconciler::new(FakeDriver::with_ps(&[ALL_RUNNING]), tmp.path().to_path_buf());
        let cancel = CancellationToken::new();

        reconciler.down(&cancel).await.unwrap();
        let statuses = reconciler.ps(&cancel).await.unwrap();
        reconciler.logs(Some("time"), Some(50), &cancel).await.unwrap();

        assert_eq!(statuses.len(), 3);
        assert_eq!(
            reconciler.driver().calls(),
            vec![
                vec!["down", "--remove-orphans"],
                vec!["ps", "--format", "json"],
                vec!["logs", "--no-color", "--tail", "50", "time"],
            ]
        );
    }
}
