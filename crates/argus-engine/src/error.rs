//! Engine error types.

use argus_config::ConfigError;
use argus_core::CoreError;
use argus_dispatch::DispatchError;
use argus_select::OracleError;
use argus_store::StoreError;
use thiserror::Error;

/// Hard errors: the engine could not be built or the catalog could not be
/// loaded. Everything that goes wrong during a run ends up in the report.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("catalog unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("cannot build dispatcher: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("cannot build ranking oracle: {0}")]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
