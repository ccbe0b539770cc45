//! Registry server and agent schema
//!
//! Mirrors the registry's `server.json` field naming so catalog documents
//! exported by the registry can be consumed without conversion.

use serde::{Deserialize, Serialize};

/// How an argument contributes to the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    /// Contributes only its value
    #[default]
    Positional,
    /// Contributes its name, then its value when non-empty
    Named,
}

/// A runtime or package argument declared by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Argument {
    #[serde(rename = "type", default)]
    pub kind: ArgumentKind,

    /// Flag name for named arguments, override key for both kinds
    #[serde(default)]
    pub name: String,

    #[serde(rename = "value", default)]
    pub static_value: String,

    #[serde(rename = "default", default)]
    pub default_value: String,

    #[serde(rename = "isRequired", default)]
    pub required: bool,
}

impl Argument {
    pub fn positional(value: impl Into<String>) -> Self {
        Self {
            kind: ArgumentKind::Positional,
            static_value: value.into(),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            kind: ArgumentKind::Named,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.static_value = value.into();
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Environment variable or HTTP header declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeyValueSpec {
    pub name: String,

    #[serde(rename = "value", default)]
    pub static_value: String,

    #[serde(rename = "default", default)]
    pub default_value: String,

    #[serde(rename = "isRequired", default)]
    pub required: bool,
}

impl KeyValueSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.static_value = value.into();
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Transport a packaged server speaks once started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageTransport {
    /// stdio, streamable-http, http or sse
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub path: Option<String>,
}

/// One way to run a server from a package ecosystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PackageAlternative {
    /// npm, pypi or oci
    pub registry_type: String,

    #[serde(default)]
    pub runtime_hint: String,

    pub identifier: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub transport: Option<PackageTransport>,

    #[serde(default)]
    pub runtime_arguments: Vec<Argument>,

    #[serde(default)]
    pub package_arguments: Vec<Argument>,

    #[serde(default)]
    pub environment_variables: Vec<KeyValueSpec>,
}

impl PackageAlternative {
    pub fn new(registry_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            registry_type: registry_type.into(),
            identifier: identifier.into(),
            ..Self::default()
        }
    }
}

/// A hosted endpoint for a server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RemoteAlternative {
    /// sse or streamable-http
    #[serde(rename = "type", default)]
    pub transport: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub headers: Vec<KeyValueSpec>,
}

impl RemoteAlternative {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// A logical MCP server as published in the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub packages: Vec<PackageAlternative>,

    #[serde(default)]
    pub remotes: Vec<RemoteAlternative>,
}

/// Reference from an agent to an MCP server it depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentServerRef {
    pub name: String,

    #[serde(default)]
    pub prefer_remote: bool,
}

/// A published agent: its container image and its MCP dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    pub name: String,

    #[serde(default)]
    pub version: String,

    pub image: String,

    #[serde(default)]
    pub environment_variables: Vec<KeyValueSpec>,

    #[serde(default)]
    pub mcp_servers: Vec<AgentServerRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_spec_parses_registry_json() {
        let json = r#"{
            "name": "io.github.example/filesystem",
            "packages": [{
                "registryType": "npm",
                "identifier": "@modelcontextprotocol/server-filesystem",
                "version": "1.0.2",
                "runtimeArguments": [{"type": "named", "name": "--yes"}],
                "packageArguments": [{"type": "positional", "value": "/data", "isRequired": true}],
                "environmentVariables": [{"name": "LOG_LEVEL", "default": "info"}]
            }],
            "remotes": [{"type": "streamable-http", "url": "https://fs.example.com/mcp"}]
        }"#;

        let spec: ServerSpec = serde_json::from_str(json).unwrap();

        assert_eq!(spec.packages.len(), 1);
        let package = &spec.packages[0];
        assert_eq!(package.registry_type, "npm");
        assert_eq!(package.runtime_arguments[0], Argument::named("--yes"));
        assert!(package.package_arguments[0].required);
        assert_eq!(package.package_arguments[0].static_value, "/data");
        assert_eq!(package.environment_variables[0].default_value, "info");
        assert_eq!(spec.remotes[0].url, "https://fs.example.com/mcp");
    }

    #[test]
    fn test_argument_defaults_to_positional() {
        let arg: Argument = serde_json::from_str(r#"{"value": "x"}"#).unwrap();
        assert_eq!(arg.kind, ArgumentKind::Positional);
        assert!(!arg.required);
    }

    #[test]
    fn test_agent_spec_parses_dependencies() {
        let json = r#"{
            "name": "researcher",
            "version": "0.3.0",
            "image": "ghcr.io/example/researcher:0.3.0",
            "mcpServers": [{"name": "fetch", "preferRemote": true}, {"name": "fs"}]
        }"#;

        let agent: AgentSpec = serde_json::from_str(json).unwrap();

        assert_eq!(agent.mcp_servers.len(), 2);
        assert!(agent.mcp_servers[0].prefer_remote);
        assert!(!agent.mcp_servers[1].prefer_remote);
    }
}
