//! Resolved MCP server specification.
//!
//! A `ResolvedServer` is either a command launch or a remote endpoint. The
//! enum keeps the two halves from ever being populated together.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Port a local HTTP server listens on when the package does not say.
pub const DEFAULT_MCP_PORT: u16 = 3000;

/// Path a local streamable-http server serves MCP on when the package does not say.
pub const DEFAULT_MCP_PATH: &str = "/mcp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    Command,
    Remote,
}

/// Transport a locally launched server speaks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LocalTransport {
    #[default]
    Stdio,
    Http { port: u16, path: String },
}

impl LocalTransport {
    pub fn http(port: u16, path: impl Into<String>) -> Self {
        LocalTransport::Http {
            port,
            path: path.into(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LocalTransport::Stdio => "stdio",
            LocalTransport::Http { .. } => "http",
        }
    }
}

/// Everything needed to start a server in a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CommandLaunch {
    /// Empty when the image should be inferred from the command
    #[serde(default)]
    pub image: String,
    /// Empty to use the image's entrypoint
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub transport: LocalTransport,
}

/// A hosted server reached over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RemoteEndpoint {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Transport declared by the registry: `sse` or `streamable-http`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub transport: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerLaunch {
    Command(CommandLaunch),
    Remote(RemoteEndpoint),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedServer {
    pub name: String,
    #[serde(flatten)]
    pub launch: ServerLaunch,
}

impl ResolvedServer {
    pub fn command(name: impl Into<String>, launch: CommandLaunch) -> Self {
        Self {
            name: name.into(),
            launch: ServerLaunch::Command(launch),
        }
    }

    pub fn remote(
        name: impl Into<String>,
        url: impl Into<String>,
        headers: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            launch: ServerLaunch::Remote(RemoteEndpoint {
                url: url.into(),
                headers,
                transport: String::new(),
            }),
        }
    }

    /// Record the declared remote transport. No effect on command servers.
    pub fn with_transport(mut self, transport: impl Into<String>) -> Self {
        if let ServerLaunch::Remote(remote) = &mut self.launch {
            remote.transport = transport.into();
        }
        self
    }

    pub fn kind(&self) -> ServerKind {
        match self.launch {
            ServerLaunch::Command(_) => ServerKind::Command,
            ServerLaunch::Remote(_) => ServerKind::Remote,
        }
    }

    pub fn as_command(&self) -> Option<&CommandLaunch> {
        match &self.launch {
            ServerLaunch::Command(launch) => Some(launch),
            ServerLaunch::Remote(_) => None,
        }
    }

    pub fn as_remote(&self) -> Option<&RemoteEndpoint> {
        match &self.launch {
            ServerLaunch::Remote(remote) => Some(remote),
            ServerLaunch::Command(_) => None,
        }
    }
}
