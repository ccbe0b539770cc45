//! Desired state: the runtime-agnostic description of what should run.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ResolveError;
use crate::mcp::{LocalTransport, ResolvedServer, ServerLaunch};

/// Environment override that places an agent in a cluster namespace
pub const NAMESPACE_ENV: &str = "KAGENT_NAMESPACE";

/// Resource identity shared by compose services and cluster resources.
pub fn resource_name(name: &str, version: &str) -> String {
    if version.is_empty() {
        name.to_string()
    } else {
        format!("{name}-{version}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DesiredState {
    #[serde(default)]
    pub agents: Vec<Agent>,

    #[serde(default)]
    pub mcp_servers: Vec<McpServer>,
}

impl DesiredState {
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.mcp_servers.is_empty()
    }

    /// First MCP server name that appears more than once, in list order.
    pub fn find_duplicate_server(&self) -> Option<&str> {
        let mut seen = BTreeSet::new();
        self.mcp_servers
            .iter()
            .find(|server| !seen.insert(server.name.as_str()))
            .map(|server| server.name.as_str())
    }

    /// First agent resource name (`name-version`) that appears more than once.
    pub fn find_duplicate_agent(&self) -> Option<String> {
        let mut seen = BTreeSet::new();
        self.agents
            .iter()
            .map(Agent::resource_name)
            .find(|name| !seen.insert(name.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentDeployment {
    pub image: String,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Agent {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub namespace: String,

    pub deployment: AgentDeployment,

    #[serde(default)]
    pub resolved_mcp_servers: Vec<ResolvedServer>,
}

impl Agent {
    pub fn resource_name(&self) -> String {
        resource_name(&self.name, &self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LocalDeployment {
    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LocalMcpServer {
    pub transport: LocalTransport,
    pub deployment: LocalDeployment,
}

/// A remote endpoint split into the parts the gateway routes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMcpServer {
    /// The URL exactly as published
    pub url: String,

    /// Declared transport, empty when the registry did not say
    #[serde(default)]
    pub transport: String,

    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Path including any query string
    pub path: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RemoteMcpServer {
    /// Split a URL, filling in the scheme's default port when it has none.
    pub fn from_url(
        server: &str,
        raw: &str,
        headers: BTreeMap<String, String>,
    ) -> Result<Self, ResolveError> {
        let invalid = |reason: String| ResolveError::InvalidRemoteUrl {
            server: server.to_string(),
            url: raw.to_string(),
            reason,
        };

        let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| invalid(format!("no default port for scheme '{}'", parsed.scheme())))?;

        let mut path = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self {
            url: raw.to_string(),
            transport: String::new(),
            scheme: parsed.scheme().to_string(),
            host: host.to_string(),
            port,
            path,
            headers,
        })
    }

    pub fn with_transport(mut self, transport: impl Into<String>) -> Self {
        self.transport = transport.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum McpServerKind {
    Local(LocalMcpServer),
    Remote(RemoteMcpServer),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(flatten)]
    pub kind: McpServerKind,
}

impl McpServer {
    pub fn from_resolved(resolved: ResolvedServer, namespace: impl Into<String>) -> Result<Self, ResolveError> {
        let kind = match resolved.launch {
            ServerLaunch::Command(launch) => McpServerKind::Local(LocalMcpServer {
                transport: launch.transport,
                deployment: LocalDeployment {
                    image: launch.image,
                    command: launch.command,
                    args: launch.args,
                    env: launch.env,
                },
            }),
            ServerLaunch::Remote(remote) => McpServerKind::Remote(
                RemoteMcpServer::from_url(&resolved.name, &remote.url, remote.headers)?
                    .with_transport(remote.transport),
            ),
        };

        Ok(Self {
            name: resolved.name,
            namespace: namespace.into(),
            kind,
        })
    }

    pub fn as_local(&self) -> Option<&LocalMcpServer> {
        match &self.kind {
            McpServerKind::Local(local) => Some(local),
            McpServerKind::Remote(_) => None,
        }
    }

    pub fn as_remote(&self) -> Option<&RemoteMcpServer> {
        match &self.kind {
            McpServerKind::Remote(remote) => Some(remote),
            McpServerKind::Local(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::CommandLaunch;

    #[test]
    fn test_resource_name() {
        assert_eq!(resource_name("researcher", "0.2.0"), "researcher-0.2.0");
        assert_eq!(resource_name("researcher", ""), "researcher");
    }

    #[test]
    fn test_remote_url_split_with_default_port() {
        let remote =
            RemoteMcpServer::from_url("fetch", "https://fetch.example.com/v1/mcp?team=a", BTreeMap::new())
                .unwrap();
        assert_eq!(remote.scheme, "https");
        assert_eq!(remote.host, "fetch.example.com");
        assert_eq!(remote.port, 443);
        assert_eq!(remote.path, "/v1/mcp?team=a");
        assert_eq!(remote.url, "https://fetch.example.com/v1/mcp?team=a");
    }

    #[test]
    fn test_remote_url_kept_verbatim() {
        let raw = "https://user:pw@events.example.com/v1/events#live";
        let remote = RemoteMcpServer::from_url("events", raw, BTreeMap::new()).unwrap();
        assert_eq!(remote.url, raw);
        assert_eq!(remote.port, 443);
        assert_eq!(remote.path, "/v1/events");
    }

    #[test]
    fn test_from_resolved_remote_keeps_transport() {
        let resolved = ResolvedServer::remote("events", "https://events.example.com/v1/events", BTreeMap::new())
            .with_transport("sse");

        let server = McpServer::from_resolved(resolved, "").unwrap();
        let remote = server.as_remote().unwrap();
        assert_eq!(remote.transport, "sse");
        assert_eq!(remote.url, "https://events.example.com/v1/events");
    }

    #[test]
    fn test_remote_url_explicit_port() {
        let remote =
            RemoteMcpServer::from_url("local", "http://127.0.0.1:8931/sse", BTreeMap::new()).unwrap();
        assert_eq!(remote.port, 8931);
        assert_eq!(remote.path, "/sse");
    }

    #[test]
    fn test_invalid_remote_url() {
        let err = RemoteMcpServer::from_url("bad", "not a url", BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidRemoteUrl { ref server, .. } if server == "bad"));
    }

    #[test]
    fn test_from_resolved_command() {
        let resolved = ResolvedServer::command(
            "fs",
            CommandLaunch {
                image: "node:24-alpine".to_string(),
                command: "npx".to_string(),
                args: vec!["-y".to_string(), "fs".to_string()],
                ..CommandLaunch::default()
            },
        );

        let server = McpServer::from_resolved(resolved, "agents").unwrap();
        assert_eq!(server.namespace, "agents");
        let local = server.as_local().unwrap();
        assert_eq!(local.deployment.command, "npx");
        assert_eq!(local.transport, LocalTransport::Stdio);
    }

    #[test]
    fn test_find_duplicate_server() {
        let server = |name: &str| {
            McpServer::from_resolved(
                ResolvedServer::remote(name, "https://example.com/mcp", BTreeMap::new()),
                "",
            )
            .unwrap()
        };
        let mut state = DesiredState {
            agents: vec![],
            mcp_servers: vec![server("a"), server("b")],
        };
        assert_eq!(state.find_duplicate_server(), None);

        state.mcp_servers.push(server("a"));
        assert_eq!(state.find_duplicate_server(), Some("a"));
    }

    #[test]
    fn test_find_duplicate_agent() {
        let agent = |name: &str, version: &str| Agent {
            name: name.to_string(),
            version: version.to_string(),
            ..Agent::default()
        };
        let mut state = DesiredState {
            agents: vec![agent("scout", "0.1.0"), agent("scout", "0.2.0")],
            mcp_servers: vec![],
        };
        assert_eq!(state.find_duplicate_agent(), None);

        state.agents.push(agent("scout", "0.1.0"));
        assert_eq!(state.find_duplicate_agent().as_deref(), Some("scout-0.1.0"));
    }
}
