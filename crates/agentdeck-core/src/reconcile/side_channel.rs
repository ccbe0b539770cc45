//! Per-agent side-channel files listing resolved MCP servers.
//!
//! Agents read `mcp-servers-<agent>.json` to reach their dependencies
//! without querying the registry. Write failures are warnings only.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::desired::Agent;
use crate::fs::write_document;
use crate::mcp::{ResolvedServer, ServerKind, ServerLaunch};
use crate::runtime::local::side_channel_file_name;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideChannelEntry {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ServerKind,

    /// Command entries have no URL; agents derive it from the server name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

impl From<&ResolvedServer> for SideChannelEntry {
    fn from(server: &ResolvedServer) -> Self {
        match &server.launch {
            ServerLaunch::Command(_) => Self {
                name: server.name.clone(),
                kind: ServerKind::Command,
                url: None,
                headers: None,
            },
            ServerLaunch::Remote(remote) => Self {
                name: server.name.clone(),
                kind: ServerKind::Remote,
                url: Some(remote.url.clone()),
                headers: (!remote.headers.is_empty()).then(|| remote.headers.clone()),
            },
        }
    }
}

pub fn side_channel_entries(agent: &Agent) -> Vec<SideChannelEntry> {
    agent
        .resolved_mcp_servers
        .iter()
        .map(SideChannelEntry::from)
        .collect()
}

/// Files written and problems hit while writing side-channel files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideChannelOutcome {
    pub written: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Write one file per agent that has resolved servers.
pub async fn write_side_channel_files(dir: &Path, agents: &[Agent]) -> SideChannelOutcome {
    let mut outcome = SideChannelOutcome::default();

    for agent in agents.iter().filter(|a| !a.resolved_mcp_servers.is_empty()) {
        let path = dir.join(side_channel_file_name(&agent.name));
        let result = match serde_json::to_vec_pretty(&side_channel_entries(agent)) {
            Ok(content) => write_document(&path, &content).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => {
                debug!(agent = %agent.name, path = %path.display(), "Wrote side-channel file");
                outcome.written.push(path);
            }
            Err(e) => {
                let message = format!(
                    "failed to write MCP server list for agent '{}' to {}: {}",
                    agent.name,
                    path.display(),
                    e
                );
                warn!("{}", message);
                outcome.warnings.push(message);
            }
        }
    }

    outcome
}
