//! Config store for loading and saving agentdeck.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{EngineConfig, parser, paths::default_config_path};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_home() -> anyhow::Result<Self> {
        let home_dir =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(Self::from_path(default_config_path(&home_dir)))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the config, falling back to defaults when the file does not exist.
    pub fn load(&self) -> anyhow::Result<EngineConfig> {
        if !self.config_path.exists() {
            return Ok(EngineConfig::default());
        }
        parser::parse_engine_toml(&self.config_path)
    }

    pub fn save(&self, config: &EngineConfig) -> anyhow::Result<()> {
        config.validate()?;
        let content = parser::to_toml(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::from_path(temp.path().join("agentdeck.toml"));
        assert_eq!(store.load().unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::from_path(temp.path().join("nested").join("agentdeck.toml"));

        let mut config = EngineConfig::default();
        config.runtime.gateway_port = 18080;
        config.runtime.working_dir = Some(temp.path().join("runtime"));
        store.save(&config).unwrap();

        assert_eq!(store.load().unwrap(), config);
    }
}
