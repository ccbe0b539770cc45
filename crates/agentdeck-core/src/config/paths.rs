//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "agentdeck.toml";

/// `~/.config/agentdeck/agentdeck.toml`, or `<home>/.config/...` when the
/// platform has no config directory.
pub fn default_config_path(home_dir: &Path) -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("agentdeck"))
        .unwrap_or_else(|| home_dir.join(".config").join("agentdeck"))
        .join(CONFIG_FILE_NAME)
}

/// Working directory used when the config does not set one.
pub fn default_working_dir(home_dir: &Path) -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("agentdeck"))
        .unwrap_or_else(|| home_dir.join(".local").join("share").join("agentdeck"))
        .join("runtime")
}
