//! Deployment requests: which agents and servers to run, with overrides.
//!
//! Requests are usually loaded from a `deploy.toml`:
//!
//! ```toml
//! [[agents]]
//! name = "researcher"
//! env = { KAGENT_NAMESPACE = "production" }
//!
//! [[agents.mcp_servers]]
//! name = "fetch"
//! prefer_remote = true
//!
//! [[mcp_servers]]
//! name = "filesystem"
//! args = { "--root" = "/srv/data" }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::config::parse_toml_str;
use crate::resolve::ResolveOverrides;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeploymentRequest {
    #[serde(default)]
    pub agents: Vec<AgentRunRequest>,

    #[serde(default)]
    pub mcp_servers: Vec<McpServerRunRequest>,
}

impl DeploymentRequest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment request: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse deployment request: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        parse_toml_str(content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentRunRequest {
    pub name: String,

    /// Catalog version; the most recently listed one when unset
    #[serde(default)]
    pub version: Option<String>,

    /// Overrides for the agent's own environment variables
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Per-dependency overrides, matched by server name
    #[serde(default)]
    pub mcp_servers: Vec<McpServerRunRequest>,
}

impl AgentRunRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn dependency(&self, server: &str) -> Option<&McpServerRunRequest> {
        self.mcp_servers.iter().find(|s| s.name == server)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct McpServerRunRequest {
    pub name: String,

    /// Falls back to the agent's declared preference, then `false`
    #[serde(default)]
    pub prefer_remote: Option<bool>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(flatten)]
    pub overrides: ResolveOverrides,
}

impl McpServerRunRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn prefer_remote(mut self, prefer: bool) -> Self {
        self.prefer_remote = Some(prefer);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.env.insert(key.into(), value.into());
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.args.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.headers.insert(key.into(), value.into());
        self
    }
}
