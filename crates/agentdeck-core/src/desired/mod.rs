//! Desired state assembly
//!
//! A deployment request names agents and MCP servers; the builder resolves
//! them against the catalog into a [`DesiredState`] that the runtime
//! translators consume.

pub mod builder;
pub mod model;
pub mod request;

pub use builder::DesiredStateBuilder;
pub use model::{
    Agent, AgentDeployment, DesiredState, LocalDeployment, LocalMcpServer, McpServer, McpServerKind,
    NAMESPACE_ENV, RemoteMcpServer, resource_name,
};
pub use request::{AgentRunRequest, DeploymentRequest, McpServerRunRequest};
