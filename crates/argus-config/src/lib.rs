//! # argus-config
//!
//! Layered configuration loading for Argus using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`ARGUS_*` prefix, `__` as separator)
//! 2. Project-level `.argus/config.toml`
//! 3. User-level `~/.config/argus/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `ARGUS_DISPATCH__TIMEOUT_SECS` -> `dispatch.timeout_secs`,
//! `ARGUS_SELECTOR__ORACLE_WEIGHT` -> `selector.oracle_weight`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use argus_config::ArgusConfig;
//!
//! let config = ArgusConfig::load_with_dotenv().expect("config");
//! if config.oracle.is_configured() {
//!     println!("oracle: {}", config.oracle.endpoint);
//! }
//! ```

mod dispatch;
mod error;
mod oracle;
mod selector;
mod store;

pub use dispatch::DispatchConfig;
pub use error::ConfigError;
pub use oracle::OracleConfig;
pub use selector::SelectorConfig;
pub use store::StoreConfig;

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArgusConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl ArgusConfig {
    /// Load configuration for the current directory.
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a provider fails to parse or a value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_for(Path::new("."))
    }

    /// Load configuration for a project directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a provider fails to parse or a value is invalid.
    pub fn load_for(project_dir: &Path) -> Result<Self, ConfigError> {
        let config: Self = Self::figment_for(project_dir).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration after reading `.env` from the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a provider fails to parse or a value is invalid.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain for the current directory.
    pub fn figment() -> Figment {
        Self::figment_for(Path::new("."))
    }

    /// Build the figment provider chain for a project directory.
    ///
    /// Public so tests can inspect the figment or layer extra providers.
    pub fn figment_for(project_dir: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = project_dir.join(".argus").join("config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("ARGUS_").split("__"))
    }

    /// Reject values no component can work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dispatch.validate()?;
        self.selector.validate()?;
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("argus").join("config.toml"))
    }
}
