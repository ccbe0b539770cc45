//! Local runtime: a compose project fronted by an MCP gateway.
//!
//! Every local MCP server and every agent gets a compose service. Every MCP
//! server, local or remote, gets a gateway route under `/<name>/mcp`.
//! Routes are sorted by name so repeated translations render identically.

pub mod compose;
pub mod gateway;

use std::collections::BTreeMap;

use tracing::info;

use super::{AiRuntimeConfig, RuntimeTarget, RuntimeTranslator, container_image, ensure_unique_names};
use crate::config::{DEFAULT_GATEWAY_PORT, ImageConfig};
use crate::desired::{Agent, DesiredState, LocalMcpServer, McpServerKind};
use crate::error::TranslateError;
use crate::mcp::LocalTransport;

pub use compose::{ComposeFile, ComposeService, service_command, service_name};
pub use gateway::{GatewayConfig, Route, SseTarget, StdioTarget, TargetSpec};

pub const COMPOSE_FILE_NAME: &str = "docker-compose.yaml";
pub const GATEWAY_SERVICE: &str = "agent_gateway";
/// Gateway config directory, relative to the working directory
pub const GATEWAY_CONFIG_DIR: &str = "agentgateway";
pub const GATEWAY_CONFIG_FILE: &str = "local.yaml";
/// Where agents find their side-channel file inside the container
pub const AGENT_SIDE_CHANNEL_MOUNT: &str = "/config/mcp-servers.json";

/// Side-channel file written next to the compose document for an agent.
pub fn side_channel_file_name(agent_name: &str) -> String {
    format!("mcp-servers-{agent_name}.json")
}

/// The two documents the local reconciler writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRuntimeConfig {
    pub compose: ComposeFile,
    pub gateway: GatewayConfig,
}

pub struct LocalTranslator {
    images: ImageConfig,
    gateway_port: u16,
    project_name: Option<String>,
}

impl Default for LocalTranslator {
    fn default() -> Self {
        Self::new(ImageConfig::default(), DEFAULT_GATEWAY_PORT)
    }
}

impl LocalTranslator {
    pub fn new(images: ImageConfig, gateway_port: u16) -> Self {
        Self {
            images,
            gateway_port,
            project_name: None,
        }
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.project_name = (!name.is_empty()).then_some(name);
        self
    }

    pub fn translate(&self, desired: &DesiredState) -> Result<LocalRuntimeConfig, TranslateError> {
        if self.gateway_port == 0 {
            return Err(TranslateError::MissingGatewayPort);
        }
        ensure_unique_names(desired)?;

        let mut services = BTreeMap::new();
        let mut routes = Vec::with_capacity(desired.mcp_servers.len());

        for server in &desired.mcp_servers {
            let target = match &server.kind {
                McpServerKind::Local(local) => {
                    let name = service_name(&server.name);
                    let image = container_image(&self.images, &server.name, &local.deployment)?;
                    let target = local_target(&name, &image, local);
                    insert_service(
                        &mut services,
                        name,
                        ComposeService {
                            image,
                            command: service_command(&local.deployment.command, &local.deployment.args),
                            environment: local.deployment.env.clone(),
                            stdin_open: local.transport == LocalTransport::Stdio,
                            ..ComposeService::default()
                        },
                    )?;
                    target
                }
                McpServerKind::Remote(remote) => TargetSpec::Sse(SseTarget {
                    host: remote.host.clone(),
                    port: remote.port,
                    path: remote.path.clone(),
                }),
            };
            routes.push(Route::for_server(&server.name, target));
        }
        routes.sort_by(|a, b| a.name.cmp(&b.name));

        for agent in &desired.agents {
            let name = service_name(&agent.resource_name());
            insert_service(&mut services, name, agent_service(agent)?)?;
        }

        insert_service(&mut services, GATEWAY_SERVICE.to_string(), self.gateway_service())?;

        info!(
            services = services.len(),
            routes = routes.len(),
            gateway_port = self.gateway_port,
            "Translated local runtime config"
        );

        Ok(LocalRuntimeConfig {
            compose: ComposeFile {
                name: self.project_name.clone(),
                services,
            },
            gateway: GatewayConfig {
                binds: vec![gateway::Bind {
                    port: self.gateway_port,
                    listeners: vec![gateway::Listener {
                        name: "default".to_string(),
                        protocol: "HTTP".to_string(),
                        routes,
                    }],
                }],
            },
        })
    }

    fn gateway_service(&self) -> ComposeService {
        let port = self.gateway_port;
        ComposeService {
            image: self.images.gateway.clone(),
            command: vec!["-f".to_string(), format!("/config/{GATEWAY_CONFIG_FILE}")],
            ports: vec![format!("{port}:{port}")],
            volumes: vec![format!("./{GATEWAY_CONFIG_DIR}:/config")],
            ..ComposeService::default()
        }
    }
}

impl RuntimeTranslator for LocalTranslator {
    fn target(&self) -> RuntimeTarget {
        RuntimeTarget::Local
    }

    fn translate_runtime_config(&self, desired: &DesiredState) -> Result<AiRuntimeConfig, TranslateError> {
        self.translate(desired).map(AiRuntimeConfig::Local)
    }
}

fn local_target(service: &str, image: &str, local: &LocalMcpServer) -> TargetSpec {
    match &local.transport {
        LocalTransport::Http { port, path } => TargetSpec::Sse(SseTarget {
            host: service.to_string(),
            port: *port,
            path: path.clone(),
        }),
        LocalTransport::Stdio if local.deployment.command.is_empty() => {
            // Entrypoint-only images are spawned as throwaway containers
            let mut args = vec![
                "run".to_string(),
                "-i".to_string(),
                "--rm".to_string(),
            ];
            for (key, value) in &local.deployment.env {
                args.push("-e".to_string());
                args.push(format!("{key}={value}"));
            }
            args.push(image.to_string());
            args.extend(local.deployment.args.iter().cloned());
            TargetSpec::Stdio(StdioTarget {
                cmd: "docker".to_string(),
                args,
                env: BTreeMap::new(),
            })
        }
        LocalTransport::Stdio => TargetSpec::Stdio(StdioTarget {
            cmd: local.deployment.command.clone(),
            args: local.deployment.args.clone(),
            env: local.deployment.env.clone(),
        }),
    }
}

fn agent_service(agent: &Agent) -> Result<ComposeService, TranslateError> {
    if agent.deployment.image.is_empty() {
        return Err(TranslateError::MissingImage {
            server: agent.name.clone(),
            command: String::new(),
        });
    }

    let volumes = if agent.resolved_mcp_servers.is_empty() {
        Vec::new()
    } else {
        vec![format!(
            "./{}:{AGENT_SIDE_CHANNEL_MOUNT}:ro",
            side_channel_file_name(&agent.name)
        )]
    };

    Ok(ComposeService {
        image: agent.deployment.image.clone(),
        environment: agent.deployment.env.clone(),
        volumes,
        depends_on: vec![GATEWAY_SERVICE.to_string()],
        ..ComposeService::default()
    })
}

fn insert_service(
    services: &mut BTreeMap<String, ComposeService>,
    name: String,
    service: ComposeService,
) -> Result<(), TranslateError> {
    if services.contains_key(&name) {
        return Err(TranslateError::DuplicateServer(name));
    }
    services.insert(name, service);
    Ok(())
}
