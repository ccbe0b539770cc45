//! Package spec resolution
//!
//! Picks one alternative from a [`ServerSpec`] and turns it into a
//! [`ResolvedServer`]. Only the first package or the first remote is ever
//! considered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::params::{resolve_arguments, resolve_key_values};
use crate::config::ImageConfig;
use crate::error::{ParamKind, ResolveError};
use crate::mcp::{CommandLaunch, DEFAULT_MCP_PATH, DEFAULT_MCP_PORT, LocalTransport, ResolvedServer};
use crate::registry::{PackageAlternative, PackageTransport, RemoteAlternative, ServerSpec};

/// Caller-supplied values that win over anything the registry declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResolveOverrides {
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub args: BTreeMap<String, String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl ResolveOverrides {
    pub fn is_empty(&self) -> bool {
        self.env.is_empty() && self.args.is_empty() && self.headers.is_empty()
    }
}

/// Package ecosystems the resolver knows how to launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ecosystem {
    Npm,
    Pypi,
    Oci,
}

impl Ecosystem {
    pub fn from_registry_type(registry_type: &str) -> Option<Self> {
        match registry_type {
            "npm" => Some(Ecosystem::Npm),
            "pypi" => Some(Ecosystem::Pypi),
            "oci" => Some(Ecosystem::Oci),
            _ => None,
        }
    }

    /// Command used when the package has no runtime hint
    pub fn default_command(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npx",
            Ecosystem::Pypi => "uvx",
            Ecosystem::Oci => "",
        }
    }
}

/// The alternative chosen for a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected<'a> {
    Package(&'a PackageAlternative),
    Remote(&'a RemoteAlternative),
}

/// First remote when remotes are preferred or no packages exist, else first package.
pub fn select_alternative(spec: &ServerSpec, prefer_remote: bool) -> Result<Selected<'_>, ResolveError> {
    if (prefer_remote || spec.packages.is_empty())
        && let Some(remote) = spec.remotes.first()
    {
        return Ok(Selected::Remote(remote));
    }
    spec.packages
        .first()
        .map(Selected::Package)
        .ok_or_else(|| ResolveError::NoAlternatives(spec.name.clone()))
}

/// Map a package transport declaration onto a local transport.
pub fn resolve_transport(
    server: &str,
    transport: Option<&PackageTransport>,
) -> Result<LocalTransport, ResolveError> {
    let Some(transport) = transport else {
        return Ok(LocalTransport::Stdio);
    };

    let default_path = match transport.kind.as_str() {
        "" | "stdio" => return Ok(LocalTransport::Stdio),
        "streamable-http" | "http" => DEFAULT_MCP_PATH,
        "sse" => "/sse",
        other => {
            return Err(ResolveError::UnsupportedTransport {
                server: server.to_string(),
                transport: other.to_string(),
            });
        }
    };

    Ok(LocalTransport::http(
        transport.port.unwrap_or(DEFAULT_MCP_PORT),
        transport
            .path
            .clone()
            .unwrap_or_else(|| default_path.to_string()),
    ))
}

/// Resolves server specs using the configured runtime images
#[derive(Debug, Clone, Default)]
pub struct PackageResolver {
    images: ImageConfig,
}

impl PackageResolver {
    pub fn new(images: ImageConfig) -> Self {
        Self { images }
    }

    pub fn images(&self) -> &ImageConfig {
        &self.images
    }

    pub fn resolve(
        &self,
        spec: &ServerSpec,
        prefer_remote: bool,
        overrides: &ResolveOverrides,
    ) -> Result<ResolvedServer, ResolveError> {
        match select_alternative(spec, prefer_remote)? {
            Selected::Remote(remote) => {
                debug!(server = %spec.name, url = %remote.url, "Resolving remote alternative");
                Self::resolve_remote(&spec.name, remote, overrides)
            }
            Selected::Package(package) => {
                debug!(
                    server = %spec.name,
                    registry_type = %package.registry_type,
                    identifier = %package.identifier,
                    "Resolving package alternative"
                );
                self.resolve_package(&spec.name, package, overrides)
            }
        }
    }

    fn resolve_remote(
        server: &str,
        remote: &RemoteAlternative,
        overrides: &ResolveOverrides,
    ) -> Result<ResolvedServer, ResolveError> {
        if remote.url.trim().is_empty() {
            return Err(ResolveError::MissingRemoteUrl(server.to_string()));
        }
        let headers = resolve_key_values(server, ParamKind::Header, &remote.headers, &overrides.headers)?;
        Ok(ResolvedServer::remote(server, remote.url.clone(), headers).with_transport(remote.transport.trim()))
    }

    fn resolve_package(
        &self,
        server: &str,
        package: &PackageAlternative,
        overrides: &ResolveOverrides,
    ) -> Result<ResolvedServer, ResolveError> {
        let ecosystem = Ecosystem::from_registry_type(&package.registry_type).ok_or_else(|| {
            ResolveError::UnsupportedRegistryType {
                server: server.to_string(),
                registry_type: package.registry_type.clone(),
            }
        })?;
        let transport = resolve_transport(server, package.transport.as_ref())?;

        let mut args = resolve_arguments(server, &package.runtime_arguments, &overrides.args)?;

        let command = if package.runtime_hint.is_empty() {
            ecosystem.default_command().to_string()
        } else {
            package.runtime_hint.clone()
        };

        let image = match ecosystem {
            Ecosystem::Npm => {
                if !args.iter().any(|a| a == "-y" || a == "--yes") {
                    args.push("-y".to_string());
                }
                args.push(npm_identifier(&package.identifier, &package.version));
                self.images.node.clone()
            }
            Ecosystem::Pypi => {
                args.push(pypi_identifier(&package.identifier, &package.version));
                self.images.python.clone()
            }
            Ecosystem::Oci => oci_image(&package.identifier, &package.version),
        };

        args.extend(resolve_arguments(server, &package.package_arguments, &overrides.args)?);

        let env = resolve_key_values(
            server,
            ParamKind::EnvironmentVariable,
            &package.environment_variables,
            &overrides.env,
        )?;

        Ok(ResolvedServer::command(
            server,
            CommandLaunch {
                image,
                command,
                args,
                env,
                transport,
            },
        ))
    }
}

fn npm_identifier(identifier: &str, version: &str) -> String {
    // Scoped names start with '@'; any later '@' already pins a version
    let pinned = identifier.get(1..).is_some_and(|rest| rest.contains('@'));
    if version.is_empty() || version == "latest" || pinned {
        identifier.to_string()
    } else {
        format!("{identifier}@{version}")
    }
}

fn pypi_identifier(identifier: &str, version: &str) -> String {
    if version.is_empty() || identifier.contains("==") {
        identifier.to_string()
    } else {
        format!("{identifier}=={version}")
    }
}

fn oci_image(identifier: &str, version: &str) -> String {
    let tagged = identifier.contains('@')
        || identifier
            .rsplit('/')
            .next()
            .is_some_and(|last| last.contains(':'));
    if version.is_empty() || tagged {
        identifier.to_string()
    } else {
        format!("{identifier}:{version}")
    }
}
