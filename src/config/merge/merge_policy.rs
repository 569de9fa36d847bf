//! Built-in defaults forming the lowest layer of the merge.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

pub const DEFAULT_SERVICE: &str = "moodle_mobile_app";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_DOWNLOAD_DIR: &str = "moodle_downloads";

/// Start a builder seeded with the defaults every other source overrides.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("remote.base_url", "")?
        .set_default("remote.service", DEFAULT_SERVICE)?
        .set_default("remote.timeout_secs", DEFAULT_TIMEOUT_SECS as i64)?
        .set_default("storage.download_dir", DEFAULT_DOWNLOAD_DIR)
}
