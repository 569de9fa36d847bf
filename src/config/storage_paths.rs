//! StorageConfig and path resolution for downloads and the state file.

use super::merge::merge_policy::DEFAULT_DOWNLOAD_DIR;
use crate::config::xdg;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_download_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DOWNLOAD_DIR)
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the mirrored course tree
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// State file location; None means `$XDG_DATA_HOME/coursemirror/state.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the state file to an actual filesystem location.
    pub fn resolve_state_file(&self) -> Result<PathBuf, ApiError> {
        match &self.state_file {
            Some(path) if !path.as_os_str().is_empty() => Ok(path.clone()),
            _ => Ok(xdg::app_data_dir()?.join("state.json")),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            state_file: None,
        }
    }
}
