//! Typed error enums for each engine stage.
//!
//! Resolution, building and translation errors are validation failures and
//! are always raised before anything touches the filesystem. Reconciliation
//! errors keep the compose tool's combined output for diagnosis.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Which parameter list a missing required value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Argument,
    EnvironmentVariable,
    Header,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Argument => write!(f, "arguments"),
            ParamKind::EnvironmentVariable => write!(f, "environment variables"),
            ParamKind::Header => write!(f, "headers"),
        }
    }
}

// ── Resolution errors ────────────────────────────────────────────────────────

/// Errors raised while turning a registry spec into concrete launch parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("'{owner}' is missing required {kind}: {}", .missing.join(", "))]
    MissingRequired {
        owner: String,
        kind: ParamKind,
        missing: Vec<String>,
    },

    #[error("server '{0}' has no packages or remotes defined")]
    NoAlternatives(String),

    #[error("server '{0}' selected a remote with an empty URL")]
    MissingRemoteUrl(String),

    #[error("server '{server}' has an invalid remote URL '{url}': {reason}")]
    InvalidRemoteUrl {
        server: String,
        url: String,
        reason: String,
    },

    #[error("server '{server}' uses unsupported package registry type '{registry_type}'")]
    UnsupportedRegistryType {
        server: String,
        registry_type: String,
    },

    #[error("server '{server}' uses unsupported transport '{transport}'")]
    UnsupportedTransport { server: String, transport: String },

    #[error("MCP server '{0}' not found in catalog")]
    UnknownServer(String),

    #[error("agent '{name}'{} not found in catalog", version_suffix(.version))]
    UnknownAgent {
        name: String,
        version: Option<String>,
    },
}

fn version_suffix(version: &Option<String>) -> String {
    version
        .as_deref()
        .map(|v| format!(" version '{v}'"))
        .unwrap_or_default()
}

// ── Build errors ─────────────────────────────────────────────────────────────

/// Errors raised while assembling a desired state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("agent '{agent}' dependency failed: {source}")]
    AgentDependency {
        agent: String,
        #[source]
        source: ResolveError,
    },

    #[error("duplicate MCP server name '{0}' in desired state")]
    DuplicateServer(String),

    #[error("duplicate agent '{0}' in desired state")]
    DuplicateAgent(String),
}

// ── Translation errors ───────────────────────────────────────────────────────

/// Errors raised by runtime translators.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("gateway port must be set to a non-zero value")]
    MissingGatewayPort,

    #[error("duplicate MCP server name '{0}' in desired state")]
    DuplicateServer(String),

    #[error("duplicate agent '{0}' in desired state")]
    DuplicateAgent(String),

    #[error("no image resolved for MCP server '{server}' and none can be inferred from command '{command}'")]
    MissingImage { server: String, command: String },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

// ── Reconciliation errors ────────────────────────────────────────────────────

/// Errors raised while applying a runtime configuration.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("the local reconciler cannot apply a {0} runtime config")]
    UnsupportedRuntime(String),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render {what}: {source}")]
    Render {
        what: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}):\n{output}")]
    ComposeFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },

    #[error("reconciliation cancelled")]
    Cancelled,

    #[error("services not ready after {}s: {pending}", .timeout.as_secs())]
    NotReady { timeout: Duration, pending: String },

    #[error("failed to parse compose status output: {0}")]
    StatusParse(String),

    #[error("invalid reconcile transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl ReconcileError {
    /// True when the caller cancelled the reconciliation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReconcileError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_lists_every_name() {
        let err = ResolveError::MissingRequired {
            owner: "github".to_string(),
            kind: ParamKind::EnvironmentVariable,
            missing: vec!["GITHUB_TOKEN".to_string(), "GITHUB_ORG".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "'github' is missing required environment variables: GITHUB_TOKEN, GITHUB_ORG"
        );
    }

    #[test]
    fn test_unknown_agent_message_includes_version() {
        let err = ResolveError::UnknownAgent {
            name: "researcher".to_string(),
            version: Some("1.2.0".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "agent 'researcher' version '1.2.0' not found in catalog"
        );

        let err = ResolveError::UnknownAgent {
            name: "researcher".to_string(),
            version: None,
        };
        assert_eq!(err.to_string(), "agent 'researcher' not found in catalog");
    }

    #[test]
    fn test_cancelled_is_distinguishable() {
        assert!(ReconcileError::Cancelled.is_cancelled());
        let failed = ReconcileError::ComposeFailed {
            command: "docker compose up".to_string(),
            status: "exit status: 1".to_string(),
            output: "boom".to_string(),
        };
        assert!(!failed.is_cancelled());
    }
}
