//! Engine context for unified dependency injection.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::{ConfigStore, EngineConfig, default_working_dir};
use crate::desired::{DeploymentRequest, DesiredState, DesiredStateBuilder};
use crate::reconcile::{ComposeCli, LocalReconciler};
use crate::registry::Catalog;
use crate::runtime::{AiRuntimeConfig, RuntimeTarget, RuntimeTranslator, translator_for};

/// Unified engine context.
///
/// Holds the loaded configuration and the resolved working directory.
/// Frontends create this once and hand out builders, translators and
/// reconcilers from it.
#[derive(Debug, Clone)]
pub struct EngineContext {
    config_path: PathBuf,
    config: EngineConfig,
    working_dir: PathBuf,
}

impl EngineContext {
    /// Create a context from an already loaded config.
    ///
    /// `runtime.working_dir` wins over `fallback_working_dir`.
    pub fn new(config_path: PathBuf, config: EngineConfig, fallback_working_dir: PathBuf) -> Self {
        let working_dir = config
            .runtime
            .working_dir
            .clone()
            .unwrap_or(fallback_working_dir);
        Self {
            config_path,
            config,
            working_dir,
        }
    }

    /// Load the config from `config_path`, or from the default location.
    pub fn load(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let home_dir =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        let store = match config_path {
            Some(path) => ConfigStore::from_path(path),
            None => ConfigStore::from_home()?,
        };
        let config = store.load()?;
        Ok(Self::new(
            store.config_path().to_path_buf(),
            config,
            default_working_dir(&home_dir),
        ))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::from_path(self.config_path.clone())
    }

    /// A desired-state builder using the configured images and namespace.
    pub fn builder<'a, C: Catalog + ?Sized>(&self, catalog: &'a C) -> DesiredStateBuilder<'a, C> {
        DesiredStateBuilder::new(catalog, self.config.images.clone())
            .with_default_namespace(self.config.runtime.default_namespace.clone())
    }

    pub fn translator(&self, target: RuntimeTarget) -> Box<dyn RuntimeTranslator> {
        translator_for(target, &self.config)
    }

    pub fn reconciler(&self) -> LocalReconciler<ComposeCli> {
        LocalReconciler::from_settings(self.working_dir.clone(), &self.config.compose)
    }

    /// Build the desired state and translate it for `target`.
    pub fn render<C: Catalog + ?Sized>(
        &self,
        catalog: &C,
        request: &DeploymentRequest,
        target: RuntimeTarget,
    ) -> anyhow::Result<(DesiredState, AiRuntimeConfig)> {
        let desired = self
            .builder(catalog)
            .build(request)
            .context("Failed to build desired state")?;
        let runtime = self
            .translator(target)
            .translate_runtime_config(&desired)
            .with_context(|| format!("Failed to translate desired state for the {target} runtime"))?;
        Ok((desired, runtime))
    }
}
