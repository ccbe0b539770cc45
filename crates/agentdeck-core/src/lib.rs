//! Agentdeck Core Library
//!
//! Turns registry-resolved agents and MCP servers into runnable
//! infrastructure: a local compose project fronted by an MCP gateway, or a
//! set of cluster custom resources.

pub mod config;
pub mod context;
pub mod desired;
pub mod error;
pub mod fs;
pub mod mcp;
pub mod reconcile;
pub mod registry;
pub mod resolve;
pub mod runtime;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ComposeSettings, ConfigStore, EngineConfig, ImageConfig, RuntimeSettings};
    pub use crate::context::EngineContext;

    // Registry
    pub use crate::registry::{AgentSpec, Catalog, FileCatalog, ServerSpec};

    // Resolution
    pub use crate::mcp::{LocalTransport, ResolvedServer, ServerKind};
    pub use crate::resolve::{PackageResolver, ResolveOverrides};

    // Desired state
    pub use crate::desired::{
        Agent, DeploymentRequest, DesiredState, DesiredStateBuilder, McpServer,
    };

    // Runtime translation
    pub use crate::runtime::{AiRuntimeConfig, RuntimeTarget, RuntimeTranslator};

    // Reconciliation
    pub use crate::reconcile::{ComposeCli, ComposeDriver, LocalReconciler, ReconcileReport};

    // Errors
    pub use crate::error::{BuildError, ReconcileError, ResolveError, TranslateError};
}
