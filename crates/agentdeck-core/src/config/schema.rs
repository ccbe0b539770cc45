//! Configuration schema for agentdeck.toml
//!
//! Everything the translators need that is not part of the desired state
//! (images, ports, the compose command) is passed in explicitly from here.
//! Nothing in the engine reads the process environment for these values.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default published port of the MCP gateway
pub const DEFAULT_GATEWAY_PORT: u16 = 21212;

/// Root configuration structure for agentdeck.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub runtime: RuntimeSettings,

    #[serde(default)]
    pub images: ImageConfig,

    #[serde(default)]
    pub compose: ComposeSettings,
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.runtime.gateway_port == 0 {
            anyhow::bail!("runtime.gateway_port must be a non-zero port");
        }
        if self.images.gateway.is_empty() {
            anyhow::bail!("images.gateway must not be empty");
        }
        if self.compose.program.is_empty() {
            anyhow::bail!("compose.program must not be empty");
        }
        if self.compose.timeout_secs == 0 {
            anyhow::bail!("compose.timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

/// Where and how the local runtime is deployed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Directory holding the compose file, gateway config and side-channel files.
    /// Falls back to the platform data directory when unset.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,

    /// Namespace for cluster resources without an explicit override
    #[serde(default)]
    pub default_namespace: String,

    /// Compose project name
    #[serde(default = "default_project_name")]
    pub project_name: String,
}

fn default_gateway_port() -> u16 {
    DEFAULT_GATEWAY_PORT
}

fn default_project_name() -> String {
    "agentdeck".to_string()
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            working_dir: None,
            gateway_port: default_gateway_port(),
            default_namespace: String::new(),
            project_name: default_project_name(),
        }
    }
}

/// Container images used when a package does not name its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_gateway_image")]
    pub gateway: String,

    /// Image for npm packages launched with npx
    #[serde(default = "default_node_image")]
    pub node: String,

    /// Image for PyPI packages launched with uvx
    #[serde(default = "default_python_image")]
    pub python: String,
}

fn default_gateway_image() -> String {
    "ghcr.io/agentgateway/agentgateway:0.7.4".to_string()
}

fn default_node_image() -> String {
    "node:24-alpine3.21".to_string()
}

fn default_python_image() -> String {
    "ghcr.io/astral-sh/uv:python3.12-alpine".to_string()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            gateway: default_gateway_image(),
            node: default_node_image(),
            python: default_python_image(),
        }
    }
}

/// External compose tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeSettings {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before every compose command, e.g. `["compose"]`
    #[serde(default = "default_subcommand")]
    pub subcommand: Vec<String>,

    /// Upper bound for a single compose invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long to wait for services to report running; zero skips the wait
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,

    #[serde(default = "default_health_poll_interval_ms")]
    pub health_poll_interval_ms: u64,
}

fn default_program() -> String {
    "docker".to_string()
}

fn default_subcommand() -> Vec<String> {
    vec!["compose".to_string()]
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_health_timeout_secs() -> u64 {
    60
}

fn default_health_poll_interval_ms() -> u64 {
    1000
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            subcommand: default_subcommand(),
            timeout_secs: default_timeout_secs(),
            health_timeout_secs: default_health_timeout_secs(),
            health_poll_interval_ms: default_health_poll_interval_ms(),
        }
    }
}
