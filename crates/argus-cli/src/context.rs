use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use argus_config::ArgusConfig;
use argus_engine::Engine;
use argus_store::{ConfigStore, FileStore};
use argus_workflow::Sequencer;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub config: ArgusConfig,
    pub store: Arc<dyn ConfigStore>,
}

impl AppContext {
    /// Load `.env` and configuration for `project_root`, then open the store.
    pub fn init(project_root: PathBuf) -> anyhow::Result<Self> {
        load_project_dotenv(&project_root)?;

        let config = ArgusConfig::load_for(&project_root)
            .context("failed to load argus configuration")?;
        let store_root = config.store.resolve_root(&project_root);
        let store = FileStore::open(&store_root).with_context(|| {
            format!("failed to open configuration store at {}", store_root.display())
        })?;
        tracing::debug!(root = %store_root.display(), "configuration store opened");

        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    /// Build an engine over the store's current catalog.
    pub fn engine(&self) -> anyhow::Result<Engine> {
        let engine = Engine::from_config(&self.config, self.store.as_ref())
            .context("failed to build orchestration engine")?;
        if engine.catalog().snapshot().is_empty() {
            tracing::warn!("source catalog is empty; run 'argus sources seed' to install defaults");
        }
        Ok(engine)
    }

    pub fn sequencer(&self) -> anyhow::Result<Sequencer> {
        Ok(Sequencer::new(
            Arc::clone(&self.store),
            Arc::new(self.engine()?),
        ))
    }
}

fn load_project_dotenv(project_root: &Path) -> anyhow::Result<()> {
    let env_path = project_root.join(".env");
    if env_path.exists() {
        dotenvy::from_path(&env_path)
            .with_context(|| format!("failed to load dotenv file at {}", env_path.display()))?;
    }
    Ok(())
}
