//! Configuration
//!
//! Layered settings for the remote platform, local storage, and logging.
//! Precedence: built-in defaults -> global config file -> explicit `--config` file ->
//! `COURSEMIRROR_*` environment variables.

mod facade;
mod merge;
mod paths;
mod remote;
mod sources;
mod storage_paths;

pub use crate::logging::LoggingConfig;
pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use remote::{CatalogStrategy, RemoteConfig};
pub use storage_paths::StorageConfig;

use serde::{Deserialize, Serialize};

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}
