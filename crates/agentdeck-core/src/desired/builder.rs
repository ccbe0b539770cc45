//! Builds a [`DesiredState`] from a deployment request and the catalog.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use super::model::{Agent, AgentDeployment, DesiredState, McpServer, NAMESPACE_ENV};
use super::request::{AgentRunRequest, DeploymentRequest, McpServerRunRequest};
use crate::config::ImageConfig;
use crate::error::{BuildError, ParamKind};
use crate::mcp::ServerKind;
use crate::registry::Catalog;
use crate::resolve::{PackageResolver, ResolveOverrides, resolve_key_values};

pub struct DesiredStateBuilder<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    resolver: PackageResolver,
    default_namespace: String,
}

impl<'a, C: Catalog + ?Sized> DesiredStateBuilder<'a, C> {
    pub fn new(catalog: &'a C, images: ImageConfig) -> Self {
        Self {
            catalog,
            resolver: PackageResolver::new(images),
            default_namespace: String::new(),
        }
    }

    /// Namespace used when a request carries no explicit override.
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    /// Resolve every requested agent and server.
    ///
    /// Any failure aborts the whole build; no partial state is returned.
    pub fn build(&self, request: &DeploymentRequest) -> Result<DesiredState, BuildError> {
        // Duplicates are checked before resolving so the error does not depend
        // on which server would have failed resolution first
        if let Some(dup) = find_duplicate(request.mcp_servers.iter().map(|s| s.name.as_str())) {
            return Err(BuildError::DuplicateServer(dup.to_string()));
        }

        let agents = request
            .agents
            .iter()
            .map(|agent| self.build_agent(agent))
            .collect::<Result<Vec<_>, _>>()?;

        let mut mcp_servers = request
            .mcp_servers
            .iter()
            .map(|server| self.build_server(server))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(dup) = find_duplicate(mcp_servers.iter().map(|s| s.name.as_str())) {
            return Err(BuildError::DuplicateServer(dup.to_string()));
        }
        deploy_command_dependencies(&agents, &mut mcp_servers)?;

        let state = DesiredState {
            agents,
            mcp_servers,
        };
        if let Some(dup) = state.find_duplicate_agent() {
            return Err(BuildError::DuplicateAgent(dup));
        }

        info!(
            agents = state.agents.len(),
            mcp_servers = state.mcp_servers.len(),
            "Built desired state"
        );
        Ok(state)
    }

    fn build_agent(&self, request: &AgentRunRequest) -> Result<Agent, BuildError> {
        let spec = self.catalog.agent(&request.name, request.version.as_deref())?;

        let env = resolve_key_values(
            &spec.name,
            ParamKind::EnvironmentVariable,
            &spec.environment_variables,
            &request.env,
        )?;
        let namespace = self.namespace_from(env.get(NAMESPACE_ENV).map(String::as_str));

        for extra in &request.mcp_servers {
            if !spec.mcp_servers.iter().any(|dep| dep.name == extra.name) {
                warn!(
                    agent = %spec.name,
                    server = %extra.name,
                    "Ignoring overrides for a server the agent does not depend on"
                );
            }
        }

        let default_overrides = ResolveOverrides::default();
        let mut resolved_mcp_servers = Vec::with_capacity(spec.mcp_servers.len());
        for dependency in &spec.mcp_servers {
            let dependency_request = request.dependency(&dependency.name);
            let prefer_remote = dependency_request
                .and_then(|r| r.prefer_remote)
                .unwrap_or(dependency.prefer_remote);
            let overrides = dependency_request
                .map(|r| &r.overrides)
                .unwrap_or(&default_overrides);

            let resolved = self
                .catalog
                .server(&dependency.name)
                .and_then(|server| self.resolver.resolve(&server, prefer_remote, overrides))
                .map_err(|source| BuildError::AgentDependency {
                    agent: spec.name.clone(),
                    source,
                })?;
            debug!(agent = %spec.name, server = %resolved.name, kind = ?resolved.kind(), "Resolved agent dependency");
            resolved_mcp_servers.push(resolved);
        }

        Ok(Agent {
            name: spec.name,
            version: spec.version,
            namespace,
            deployment: AgentDeployment {
                image: spec.image,
                env,
            },
            resolved_mcp_servers,
        })
    }

    fn build_server(&self, request: &McpServerRunRequest) -> Result<McpServer, BuildError> {
        let spec = self.catalog.server(&request.name)?;
        let resolved = self.resolver.resolve(
            &spec,
            request.prefer_remote.unwrap_or(false),
            &request.overrides,
        )?;

        let namespace = match request.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns.to_string(),
            _ => self.namespace_from(request.overrides.env.get(NAMESPACE_ENV).map(String::as_str)),
        };

        debug!(server = %resolved.name, kind = ?resolved.kind(), namespace = %namespace, "Resolved MCP server");
        Ok(McpServer::from_resolved(resolved, namespace)?)
    }

    fn namespace_from(&self, explicit: Option<&str>) -> String {
        match explicit {
            Some(ns) if !ns.is_empty() => ns.to_string(),
            _ => self.default_namespace.clone(),
        }
    }
}

/// Command-type agent dependencies need something running to connect to.
///
/// Each one becomes an MCP server in the agent's namespace unless a server
/// with that name is already deployed. The first agent to declare it wins.
fn deploy_command_dependencies(agents: &[Agent], mcp_servers: &mut Vec<McpServer>) -> Result<(), BuildError> {
    for agent in agents {
        for resolved in &agent.resolved_mcp_servers {
            if resolved.kind() != ServerKind::Command
                || mcp_servers.iter().any(|s| s.name == resolved.name)
            {
                continue;
            }
            debug!(agent = %agent.name, server = %resolved.name, "Deploying agent dependency");
            mcp_servers.push(McpServer::from_resolved(resolved.clone(), agent.namespace.clone())?);
        }
    }
    Ok(())
}

fn find_duplicate<'n>(names: impl Iterator<Item = &'n str>) -> Option<&'n str> {
    let mut seen = BTreeSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}
