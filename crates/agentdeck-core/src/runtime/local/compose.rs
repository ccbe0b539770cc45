//! Compose document (`docker-compose.yaml`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ComposeFile {
    /// Compose project name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub services: BTreeMap<String, ComposeService>,
}

impl ComposeFile {
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ComposeService {
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Keeps stdin attached for stdio servers
    #[serde(default, skip_serializing_if = "is_false")]
    pub stdin_open: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Compose service names allow `[a-zA-Z0-9._-]`; anything else becomes `-`.
pub fn service_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// `[command, args...]`, or just the args when the image entrypoint is used.
pub fn service_command(command: &str, args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len() + 1);
    if !command.is_empty() {
        out.push(command.to_string());
    }
    out.extend(args.iter().cloned());
    out
}
