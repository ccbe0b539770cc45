//! MCP gateway routing document (`agentgateway/local.yaml`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Weight of the single backend each route carries
pub const ROUTE_WEIGHT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    pub binds: Vec<Bind>,
}

impl GatewayConfig {
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Every route across all binds and listeners, in document order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.binds
            .iter()
            .flat_map(|b| b.listeners.iter())
            .flat_map(|l| l.routes.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bind {
    pub port: u16,
    pub listeners: Vec<Listener>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub name: String,
    pub protocol: String,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub matches: Vec<RouteMatch>,
    pub backends: Vec<Backend>,
}

impl Route {
    /// A route for one MCP server under `/<name>/mcp`.
    pub fn for_server(name: &str, target: TargetSpec) -> Self {
        Self {
            name: name.to_string(),
            matches: vec![RouteMatch {
                path: PathMatch {
                    path_prefix: format!("/{name}/mcp"),
                },
            }],
            backends: vec![Backend {
                weight: ROUTE_WEIGHT,
                mcp: McpBackend {
                    targets: vec![McpTarget {
                        name: name.to_string(),
                        spec: target,
                    }],
                },
            }],
        }
    }

    pub fn path_prefix(&self) -> Option<&str> {
        self.matches.first().map(|m| m.path.path_prefix.as_str())
    }

    pub fn target(&self) -> Option<&TargetSpec> {
        self.backends
            .first()
            .and_then(|b| b.mcp.targets.first())
            .map(|t| &t.spec)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatch {
    pub path: PathMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMatch {
    pub path_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    pub weight: u32,
    pub mcp: McpBackend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpBackend {
    pub targets: Vec<McpTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpTarget {
    pub name: String,
    #[serde(flatten)]
    pub spec: TargetSpec,
}

/// How the gateway reaches a server: spawn it, or connect over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSpec {
    Stdio(StdioTarget),
    Sse(SseTarget),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioTarget {
    pub cmd: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseTarget {
    pub host: String,
    pub port: u16,
    pub path: String,
}
