//! Engine configuration
//!
//! `agentdeck.toml` carries the settings that shape translation and
//! reconciliation: the working directory, gateway port, default namespace,
//! container images and the compose tool invocation.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_engine_toml, parse_engine_toml_str, parse_toml_str, to_toml};
pub use paths::{default_config_path, default_working_dir};
pub use schema::{ComposeSettings, DEFAULT_GATEWAY_PORT, EngineConfig, ImageConfig, RuntimeSettings};
pub use store::ConfigStore;
