//! Logging System
//!
//! Structured logging with the `tracing` crate. Status lines meant for the user are
//! printed by the CLI; the log stream carries the detail and defaults to a file so the
//! two never interleave on the terminal.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Resolve the log file path: the configured file, else the default under the
/// platform state directory.
pub fn resolve_log_file_path(configured: Option<&Path>) -> Result<PathBuf, ApiError> {
    match configured {
        Some(path) if !path.as_os_str().is_empty() => Ok(path.to_path_buf()),
        _ => default_log_file_path(),
    }
}

fn default_log_file_path() -> Result<PathBuf, ApiError> {
    let project_dirs =
        directories::ProjectDirs::from("", "coursemirror", "coursemirror").ok_or_else(|| {
            ApiError::ConfigError(
                "Could not determine platform state directory for log file".to_string(),
            )
        })?;
    let dir = project_dirs
        .state_dir()
        .unwrap_or_else(|| project_dirs.data_local_dir())
        .to_path_buf();
    Ok(dir.join("coursemirror.log"))
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file, file+stderr, both
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output includes file; None means use runtime default
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format only, stdout/stderr only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "file".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Layer the `COURSEMIRROR_LOG*` environment variables over the loaded configuration.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(filter) = lookup("COURSEMIRROR_LOG").filter(|v| !v.trim().is_empty()) {
            self.level = filter;
        }
        if let Some(format) = lookup("COURSEMIRROR_LOG_FORMAT") {
            self.format = format;
        }
        if let Some(output) = lookup("COURSEMIRROR_LOG_OUTPUT") {
            self.output = output;
        }
        if let Some(file) = lookup("COURSEMIRROR_LOG_FILE").filter(|v| !v.is_empty()) {
            self.file = Some(PathBuf::from(file));
        }
        if let Some(modules) = lookup("COURSEMIRROR_LOG_MODULES") {
            for entry in modules.split(',') {
                if let Some((module, level)) = entry.split_once('=') {
                    self.modules
                        .insert(module.trim().to_string(), level.trim().to_string());
                }
            }
        }
        self
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn with_overrides(
        mut self,
        level: Option<&str>,
        format: Option<&str>,
        output: Option<&str>,
        file: Option<PathBuf>,
        verbose: bool,
    ) -> Self {
        if verbose {
            self.level = "debug".to_string();
        }
        if let Some(level) = level {
            self.level = level.to_string();
        }
        if let Some(format) = format {
            self.format = format.to_string();
        }
        if let Some(output) = output {
            self.output = output.to_string();
        }
        if file.is_some() {
            self.file = file;
        }
        self
    }
}

/// Initialize the logging system
///
/// Reads only `config`. The caller layers it in priority order (highest to lowest):
/// 1. CLI arguments ([`LoggingConfig::with_overrides`])
/// 2. Environment variables ([`LoggingConfig::apply_env`])
/// 3. Configuration file
/// 4. Defaults
pub fn init_logging(config: &LoggingConfig) -> Result<(), ApiError> {
    if !config.enabled {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .try_init()
            .map_err(|e| ApiError::ConfigError(format!("Failed to install logger: {}", e)));
    }

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let use_color = config.color && !output.file;

    let writer = if output.file {
        let file = open_log_file(config)?;
        if output.stderr {
            BoxMakeWriter::new(Mutex::new(file).and(std::io::stderr))
        } else {
            BoxMakeWriter::new(Mutex::new(file))
        }
    } else if output.stdout && output.stderr {
        BoxMakeWriter::new(std::io::stdout.and(std::io::stderr))
    } else if output.stderr {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    let layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(writer);

    let installed = if format == LogFormat::Json {
        Registry::default()
            .with(filter)
            .with(layer.json())
            .try_init()
    } else {
        Registry::default()
            .with(filter)
            .with(layer.with_ansi(use_color))
            .try_init()
    };
    installed.map_err(|e| ApiError::ConfigError(format!("Failed to install logger: {}", e)))
}

fn open_log_file(config: &LoggingConfig) -> Result<std::fs::File, ApiError> {
    let log_file = resolve_log_file_path(config.file.as_deref())?;
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ApiError::ConfigError(format!("Failed to create log directory: {}", e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .map_err(|e| {
            ApiError::ConfigError(format!("Failed to open log file {:?}: {}", log_file, e))
        })
}

/// Build the filter from the level (any filter directive) and per-module levels.
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ApiError> {
    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);

    let directives: Vec<String> = config
        .modules
        .iter()
        .map(|(module, level)| format!("{}={}", module, level))
        .collect();

    for directive in directives {
        filter = filter.add_directive(directive.parse().map_err(|e| {
            ApiError::ConfigError(format!("Invalid log directive {}: {}", directive, e))
        })?);
    }

    Ok(filter)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

fn determine_format(config: &LoggingConfig) -> Result<LogFormat, ApiError> {
    match config.format.as_str() {
        "json" => Ok(LogFormat::Json),
        "text" => Ok(LogFormat::Text),
        other => Err(ApiError::ConfigError(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

/// Output destinations
#[derive(Debug)]
struct OutputDestinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

fn determine_output(config: &LoggingConfig) -> Result<OutputDestinations, ApiError> {
    parse_output_destinations(&config.output)
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, ApiError> {
    let (stdout, stderr, file) = match output {
        "stdout" => (true, false, false),
        "stderr" => (false, true, false),
        "file" => (false, false, true),
        "file+stderr" => (false, true, true),
        "both" => (true, true, false),
        _ => {
            return Err(ApiError::ConfigError(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stderr', or 'both')",
                output
            )))
        }
    };
    Ok(OutputDestinations {
        stdout,
        stderr,
        file,
    })
}
