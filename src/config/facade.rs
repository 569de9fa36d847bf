//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::MirrorConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from defaults, the global file, an optional explicit file,
    /// and the environment.
    pub fn load(explicit_file: Option<&Path>) -> Result<MirrorConfig, ConfigError> {
        MergeService::load(explicit_file)
    }

    /// Create default configuration.
    pub fn default() -> MirrorConfig {
        MirrorConfig::default()
    }
}
