//! Cluster custom resources emitted by the cluster translator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const AGENT_API_VERSION: &str = "kagent.dev/v1alpha2";
pub const REMOTE_MCP_SERVER_API_VERSION: &str = "kagent.dev/v1alpha2";
pub const MCP_SERVER_API_VERSION: &str = "kagent.dev/v1alpha1";

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "agentdeck";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn managed(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::from([(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string())]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

pub(crate) fn name_values(map: &BTreeMap<String, String>) -> Vec<NameValue> {
    map.iter()
        .map(|(name, value)| NameValue {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

// ── ConfigMap ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub data: BTreeMap<String, String>,
}

impl ConfigMap {
    pub fn new(metadata: ObjectMeta, data: BTreeMap<String, String>) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            metadata,
            data,
        }
    }
}

// ── Agent ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResource {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: AgentResourceSpec,
}

/// Bring-your-own agent: the engine supplies the container, kagent runs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResourceSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub byo: ByoAgentSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByoAgentSpec {
    pub deployment: AgentDeploymentSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDeploymentSpec {
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<NameValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub config_map: ConfigMapVolumeSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMapVolumeSource {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
}

impl AgentResource {
    pub fn new(metadata: ObjectMeta, deployment: AgentDeploymentSpec) -> Self {
        Self {
            api_version: AGENT_API_VERSION.to_string(),
            kind: "Agent".to_string(),
            metadata,
            spec: AgentResourceSpec {
                kind: "BYO".to_string(),
                byo: ByoAgentSpec { deployment },
            },
        }
    }
}

// ── MCPServer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerResource {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: McpServerResourceSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerResourceSpec {
    /// stdio or http
    pub transport_type: String,

    pub deployment: McpServerDeployment,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_transport: Option<HttpTransportSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerDeployment {
    pub image: String,
    pub port: u16,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cmd: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpTransportSpec {
    pub target_port: u16,
    pub path: String,
}

impl McpServerResource {
    pub fn new(metadata: ObjectMeta, spec: McpServerResourceSpec) -> Self {
        Self {
            api_version: MCP_SERVER_API_VERSION.to_string(),
            kind: "MCPServer".to_string(),
            metadata,
            spec,
        }
    }
}

// ── RemoteMCPServer ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMcpServerResource {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: RemoteMcpServerSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMcpServerSpec {
    /// STREAMABLE_HTTP or SSE
    pub protocol: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers_from: Vec<NameValue>,
}

impl RemoteMcpServerResource {
    pub fn new(metadata: ObjectMeta, spec: RemoteMcpServerSpec) -> Self {
        Self {
            api_version: REMOTE_MCP_SERVER_API_VERSION.to_string(),
            kind: "RemoteMCPServer".to_string(),
            metadata,
            spec,
        }
    }
}
