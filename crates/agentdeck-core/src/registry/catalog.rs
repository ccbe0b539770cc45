//! Catalog lookups for server and agent specs.
//!
//! The registry service owns publishing and approval. The engine only reads
//! already-approved specs through the `Catalog` trait.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

use super::schema::{AgentSpec, ServerSpec};

/// Read access to registry-resident specs
pub trait Catalog {
    /// Look up a server spec by its registry name.
    fn server(&self, name: &str) -> Result<ServerSpec, ResolveError>;

    /// Look up an agent spec. `None` selects the most recently listed version.
    fn agent(&self, name: &str, version: Option<&str>) -> Result<AgentSpec, ResolveError>;
}

/// Catalog export document: `{ "servers": [...], "agents": [...] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub servers: Vec<ServerSpec>,

    #[serde(default)]
    pub agents: Vec<AgentSpec>,
}

/// In-memory catalog built from a registry export
#[derive(Debug, Clone, Default)]
pub struct FileCatalog {
    servers: BTreeMap<String, ServerSpec>,
    agents: Vec<AgentSpec>,
}

impl FileCatalog {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse catalog: {}", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: CatalogDocument) -> Self {
        let mut servers = BTreeMap::new();
        for server in document.servers {
            // Later entries replace earlier ones with the same name
            servers.insert(server.name.clone(), server);
        }
        Self {
            servers,
            agents: document.agents,
        }
    }

    pub fn with_server(mut self, server: ServerSpec) -> Self {
        self.servers.insert(server.name.clone(), server);
        self
    }

    pub fn with_agent(mut self, agent: AgentSpec) -> Self {
        self.agents.push(agent);
        self
    }
}

impl Catalog for FileCatalog {
    fn server(&self, name: &str) -> Result<ServerSpec, ResolveError> {
        self.servers
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownServer(name.to_string()))
    }

    fn agent(&self, name: &str, version: Option<&str>) -> Result<AgentSpec, ResolveError> {
        self.agents
            .iter()
            .rev()
            .find(|agent| agent.name == name && version.is_none_or(|v| agent.version == v))
            .cloned()
            .ok_or_else(|| ResolveError::UnknownAgent {
                name: name.to_string(),
                version: version.map(str::to_string),
            })
    }
}
