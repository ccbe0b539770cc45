//! Cluster runtime: custom resources handed off as multi-document YAML.
//!
//! Every resource derived from an agent or server carries that entity's
//! namespace unchanged.

pub mod resources;

use std::collections::BTreeMap;

use tracing::info;

use super::{AiRuntimeConfig, RuntimeTarget, RuntimeTranslator, container_image, ensure_unique_names};
use crate::config::ImageConfig;
use crate::desired::{Agent, DesiredState, LocalMcpServer, McpServer, McpServerKind, RemoteMcpServer};
use crate::error::TranslateError;
use crate::mcp::{DEFAULT_MCP_PORT, LocalTransport};

pub use resources::{
    AgentDeploymentSpec, AgentResource, ConfigMap, ConfigMapVolumeSource, HttpTransportSpec,
    McpServerDeployment, McpServerResource, McpServerResourceSpec, NameValue, ObjectMeta,
    RemoteMcpServerResource, RemoteMcpServerSpec, Volume, VolumeMount,
};

/// Key holding the resolved-server list inside an agent's ConfigMap
pub const MCP_CONFIG_KEY: &str = "mcp-servers.json";
pub const MCP_CONFIG_VOLUME: &str = "mcp-config";
pub const MCP_CONFIG_MOUNT_PATH: &str = "/config";

pub fn config_map_name(agent_resource_name: &str) -> String {
    format!("{agent_resource_name}-mcp-config")
}

/// All cluster resources for one desired state, each list sorted by name
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterManifests {
    pub config_maps: Vec<ConfigMap>,
    pub agents: Vec<AgentResource>,
    pub mcp_servers: Vec<McpServerResource>,
    pub remote_mcp_servers: Vec<RemoteMcpServerResource>,
}

impl ClusterManifests {
    pub fn len(&self) -> usize {
        self.config_maps.len() + self.agents.len() + self.mcp_servers.len() + self.remote_mcp_servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Namespaces of every resource, in rendering order.
    pub fn namespaces(&self) -> Vec<&str> {
        self.config_maps
            .iter()
            .map(|r| r.metadata.namespace.as_str())
            .chain(self.agents.iter().map(|r| r.metadata.namespace.as_str()))
            .chain(self.mcp_servers.iter().map(|r| r.metadata.namespace.as_str()))
            .chain(self.remote_mcp_servers.iter().map(|r| r.metadata.namespace.as_str()))
            .collect()
    }

    /// Render ConfigMaps, Agents, MCPServers then RemoteMCPServers as one
    /// multi-document YAML stream.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let mut documents = Vec::with_capacity(self.len());
        for config_map in &self.config_maps {
            documents.push(serde_yaml::to_string(config_map)?);
        }
        for agent in &self.agents {
            documents.push(serde_yaml::to_string(agent)?);
        }
        for server in &self.mcp_servers {
            documents.push(serde_yaml::to_string(server)?);
        }
        for server in &self.remote_mcp_servers {
            documents.push(serde_yaml::to_string(server)?);
        }
        Ok(documents
            .iter()
            .map(|doc| format!("---\n{doc}"))
            .collect::<String>())
    }
}

pub struct ClusterTranslator {
    images: ImageConfig,
}

impl Default for ClusterTranslator {
    fn default() -> Self {
        Self::new(ImageConfig::default())
    }
}

impl ClusterTranslator {
    pub fn new(images: ImageConfig) -> Self {
        Self { images }
    }

    pub fn translate(&self, desired: &DesiredState) -> Result<ClusterManifests, TranslateError> {
        ensure_unique_names(desired)?;

        let mut manifests = ClusterManifests::default();

        for agent in &desired.agents {
            let (resource, config_map) = translate_agent(agent)?;
            manifests.agents.push(resource);
            manifests.config_maps.extend(config_map);
        }

        for server in &desired.mcp_servers {
            match &server.kind {
                McpServerKind::Local(local) => {
                    manifests
                        .mcp_servers
                        .push(self.translate_local_server(server, local)?);
                }
                McpServerKind::Remote(remote) => {
                    manifests
                        .remote_mcp_servers
                        .push(translate_remote_server(server, remote));
                }
            }
        }

        manifests
            .config_maps
            .sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        manifests
            .agents
            .sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        manifests
            .mcp_servers
            .sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        manifests
            .remote_mcp_servers
            .sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));

        info!(
            agents = manifests.agents.len(),
            config_maps = manifests.config_maps.len(),
            mcp_servers = manifests.mcp_servers.len(),
            remote_mcp_servers = manifests.remote_mcp_servers.len(),
            "Translated cluster runtime config"
        );
        Ok(manifests)
    }

    fn translate_local_server(
        &self,
        server: &McpServer,
        local: &LocalMcpServer,
    ) -> Result<McpServerResource, TranslateError> {
        let image = container_image(&self.images, &server.name, &local.deployment)?;

        let (transport_type, port, http_transport) = match &local.transport {
            LocalTransport::Stdio => ("stdio", DEFAULT_MCP_PORT, None),
            LocalTransport::Http { port, path } => (
                "http",
                *port,
                Some(HttpTransportSpec {
                    target_port: *port,
                    path: path.clone(),
                }),
            ),
        };

        Ok(McpServerResource::new(
            ObjectMeta::managed(&server.name, &server.namespace),
            McpServerResourceSpec {
                transport_type: transport_type.to_string(),
                deployment: McpServerDeployment {
                    image,
                    port,
                    cmd: local.deployment.command.clone(),
                    args: local.deployment.args.clone(),
                    env: local.deployment.env.clone(),
                },
                http_transport,
            },
        ))
    }
}

impl RuntimeTranslator for ClusterTranslator {
    fn target(&self) -> RuntimeTarget {
        RuntimeTarget::Cluster
    }

    fn translate_runtime_config(&self, desired: &DesiredState) -> Result<AiRuntimeConfig, TranslateError> {
        self.translate(desired).map(AiRuntimeConfig::Cluster)
    }
}

fn translate_agent(agent: &Agent) -> Result<(AgentResource, Option<ConfigMap>), TranslateError> {
    let name = agent.resource_name();
    let mut deployment = AgentDeploymentSpec {
        image: agent.deployment.image.clone(),
        env: resources::name_values(&agent.deployment.env),
        volumes: Vec::new(),
        volume_mounts: Vec::new(),
    };

    let config_map = if agent.resolved_mcp_servers.is_empty() {
        None
    } else {
        let cm_name = config_map_name(&name);
        let payload = serde_json::to_string_pretty(&agent.resolved_mcp_servers).map_err(|source| {
            TranslateError::Serialize {
                what: format!("resolved MCP servers for agent '{}'", agent.name),
                source,
            }
        })?;

        deployment.volumes.push(Volume {
            name: MCP_CONFIG_VOLUME.to_string(),
            config_map: ConfigMapVolumeSource {
                name: cm_name.clone(),
            },
        });
        deployment.volume_mounts.push(VolumeMount {
            name: MCP_CONFIG_VOLUME.to_string(),
            mount_path: MCP_CONFIG_MOUNT_PATH.to_string(),
        });

        Some(ConfigMap::new(
            ObjectMeta::managed(cm_name, &agent.namespace),
            BTreeMap::from([(MCP_CONFIG_KEY.to_string(), payload)]),
        ))
    };

    Ok((
        AgentResource::new(ObjectMeta::managed(name, &agent.namespace), deployment),
        config_map,
    ))
}

/// Declared transport first; the `/sse` path suffix only when none was declared.
fn remote_protocol(remote: &RemoteMcpServer) -> &'static str {
    match remote.transport.as_str() {
        "sse" => "SSE",
        "streamable-http" | "http" => "STREAMABLE_HTTP",
        _ if remote.path.trim_end_matches('/').ends_with("/sse") => "SSE",
        _ => "STREAMABLE_HTTP",
    }
}

fn translate_remote_server(server: &McpServer, remote: &RemoteMcpServer) -> RemoteMcpServerResource {
    RemoteMcpServerResource::new(
        ObjectMeta::managed(&server.name, &server.namespace),
        RemoteMcpServerSpec {
            protocol: remote_protocol(remote).to_string(),
            url: remote.url.clone(),
            headers_from: resources::name_values(&remote.headers),
        },
    )
}
