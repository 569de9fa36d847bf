//! Environment variable source: COURSEMIRROR_ prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
/// `COURSEMIRROR_REMOTE__PASSWORD` maps to `remote.password`. Values stay strings;
/// numeric fields are converted on deserialization, so credentials keep leading zeros.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix("COURSEMIRROR")
            .prefix_separator("_")
            .separator("__"),
    );
    Ok(builder)
}
