//! TOML parser with helpful error messages

use super::schema::EngineConfig;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parse agentdeck.toml with detailed error messages
pub fn parse_engine_toml(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_engine_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse agentdeck.toml content from string
pub fn parse_engine_toml_str(content: &str) -> Result<EngineConfig> {
    let config: EngineConfig = parse_toml_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Parse any TOML document, attaching line context to syntax errors
pub fn parse_toml_str<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| enhance_toml_error(e, content))
}

/// Point at the offending line using the error's byte span
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();
    let Some(span) = error.span() else {
        return anyhow::anyhow!("TOML parsing error: {}", message);
    };

    let offset = span.start.min(content.len());
    let line_no = content[..offset].matches('\n').count() + 1;
    anyhow::anyhow!(
        "TOML parsing error at line {}: {}\n{}",
        line_no,
        message,
        excerpt(content, line_no)
    )
}

/// The failing line with one line of context on each side
fn excerpt(content: &str, line_no: usize) -> String {
    content
        .lines()
        .enumerate()
        .skip(line_no.saturating_sub(2))
        .take(3)
        .map(|(idx, text)| {
            let marker = if idx + 1 == line_no { '>' } else { ' ' };
            format!("{marker} {:>4} | {text}", idx + 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a configuration to TOML string
pub fn to_toml(config: &EngineConfig) -> Result<String> {
    toml::to_string_pretty(config).with_context(|| "Failed to serialize configuration to TOML")
}
