//! Runtime translation of a desired state.
//!
//! A [`RuntimeTranslator`] turns a [`DesiredState`] into an
//! [`AiRuntimeConfig`] for one target runtime. Translation is pure: images,
//! ports and names come from the constructor, never from the environment.
//!
//! ## Targets
//!
//! | Target    | Output                                              | Applied by            |
//! |-----------|-----------------------------------------------------|-----------------------|
//! | `local`   | compose document + gateway routing document         | `LocalReconciler`     |
//! | `cluster` | Agent, MCPServer, RemoteMCPServer and ConfigMap CRs | external (YAML hand-off) |
//!
//! ## Image inference
//!
//! Local servers resolved without an image fall back to a runtime image
//! picked by command: `npx` → node image, `uvx` → python image.

pub mod cluster;
pub mod local;

use std::fmt;

use crate::config::{EngineConfig, ImageConfig};
use crate::desired::{DesiredState, LocalDeployment};
use crate::error::TranslateError;

pub use cluster::{ClusterManifests, ClusterTranslator};
pub use local::{LocalRuntimeConfig, LocalTranslator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeTarget {
    Local,
    Cluster,
}

impl RuntimeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeTarget::Local => "local",
            RuntimeTarget::Cluster => "cluster",
        }
    }
}

impl fmt::Display for RuntimeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RuntimeTarget {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "local" => Ok(RuntimeTarget::Local),
            "cluster" | "kubernetes" => Ok(RuntimeTarget::Cluster),
            other => anyhow::bail!("Unknown runtime target '{}': expected local or cluster", other),
        }
    }
}

/// Runtime-specific output of a translation
#[derive(Debug, Clone, PartialEq)]
pub enum AiRuntimeConfig {
    Local(LocalRuntimeConfig),
    Cluster(ClusterManifests),
}

impl AiRuntimeConfig {
    pub fn target(&self) -> RuntimeTarget {
        match self {
            AiRuntimeConfig::Local(_) => RuntimeTarget::Local,
            AiRuntimeConfig::Cluster(_) => RuntimeTarget::Cluster,
        }
    }
}

pub trait RuntimeTranslator {
    fn target(&self) -> RuntimeTarget;

    fn translate_runtime_config(&self, desired: &DesiredState) -> Result<AiRuntimeConfig, TranslateError>;
}

/// Pick the translator for a target using the engine configuration.
pub fn translator_for(target: RuntimeTarget, config: &EngineConfig) -> Box<dyn RuntimeTranslator> {
    match target {
        RuntimeTarget::Local => Box::new(
            LocalTranslator::new(config.images.clone(), config.runtime.gateway_port)
                .with_project_name(config.runtime.project_name.clone()),
        ),
        RuntimeTarget::Cluster => Box::new(ClusterTranslator::new(config.images.clone())),
    }
}

/// Fail on the first MCP server name or agent resource name that appears twice.
pub(crate) fn ensure_unique_names(desired: &DesiredState) -> Result<(), TranslateError> {
    if let Some(name) = desired.find_duplicate_server() {
        return Err(TranslateError::DuplicateServer(name.to_string()));
    }
    if let Some(name) = desired.find_duplicate_agent() {
        return Err(TranslateError::DuplicateAgent(name));
    }
    Ok(())
}

/// Image for a local server, inferred from its command when none was resolved.
pub(crate) fn container_image(
    images: &ImageConfig,
    server: &str,
    deployment: &LocalDeployment,
) -> Result<String, TranslateError> {
    if !deployment.image.is_empty() {
        return Ok(deployment.image.clone());
    }
    match deployment.command.as_str() {
        "npx" => Ok(images.node.clone()),
        "uvx" => Ok(images.python.clone()),
        other => Err(TranslateError::MissingImage {
            server: server.to_string(),
            command: other.to_string(),
        }),
    }
}
