//! CLI Tooling
//!
//! Command-line interface for mirroring courses. Every command returns its rendered
//! output as a string; the binary decides where it goes.

use crate::catalog;
use crate::config::{ConfigLoader, MirrorConfig};
use crate::error::{ApiError, StorageError};
use crate::progress::{ConsoleReporter, NoopReporter, ProgressReporter};
use crate::report::{
    format_courses_text, format_state_status_text, format_sync_report_text, StateStatus,
};
use crate::state::StateStore;
use crate::sync::{DownloadLayout, SyncEngine};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Coursemirror CLI - incremental course file mirror
#[derive(Parser)]
#[command(name = "coursemirror")]
#[command(about = "Incrementally mirror course files from a learning platform")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config file)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Download new and missing course files
    Sync {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Suppress per-file status lines
        #[arg(long)]
        quiet: bool,
    },
    /// Show what the state file tracks (offline, read-only)
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List enrolled courses
    Courses {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_format(format: &str) -> Result<OutputFormat, ApiError> {
    match format {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(ApiError::ConfigError(format!(
            "Invalid output format: {} (must be 'text' or 'json')",
            other
        ))),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::from(StorageError::from(e)))
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Sync { .. } => "sync",
        Commands::Status { .. } => "status",
        Commands::Courses { .. } => "courses",
    }
}

/// Loaded configuration plus resolved paths.
pub struct CliContext {
    config: MirrorConfig,
    state_file: PathBuf,
}

impl CliContext {
    /// Load configuration (defaults, global file, `config_path`, environment).
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Self::from_config(config)
    }

    pub fn from_config(config: MirrorConfig) -> Result<Self, ApiError> {
        let state_file = config.storage.resolve_state_file()?;
        Ok(Self { config, state_file })
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = match command {
            Commands::Sync { format, quiet } => self.handle_sync(format, *quiet),
            Commands::Status { format } => self.handle_status(format),
            Commands::Courses { format } => self.handle_courses(format),
        };
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn runtime() -> Result<tokio::runtime::Runtime, ApiError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::StorageError(StorageError::IoError(e)))
    }

    fn handle_sync(&self, format: &str, quiet: bool) -> Result<String, ApiError> {
        let format = parse_format(format)?;
        let store = StateStore::new(&self.state_file);
        let layout = DownloadLayout::new(&self.config.storage.download_dir);

        let report = Self::runtime()?.block_on(async {
            let client = catalog::connect(&self.config.remote).await?;
            let engine = SyncEngine::new(client.as_ref(), &store, layout);
            let mut console = ConsoleReporter;
            let mut silent = NoopReporter;
            let progress: &mut dyn ProgressReporter = if quiet || format == OutputFormat::Json {
                &mut silent
            } else {
                &mut console
            };
            engine.run(progress).await
        })?;

        info!(
            downloaded = report.downloaded.len(),
            redownloaded = report.redownloaded.len(),
            new_items = report.new_items.len(),
            failures = report.failures.len(),
            "Sync finished"
        );

        match format {
            OutputFormat::Json => to_json(&report),
            OutputFormat::Text => Ok(format_sync_report_text(&report)),
        }
    }

    fn handle_status(&self, format: &str) -> Result<String, ApiError> {
        let format = parse_format(format)?;
        let store = StateStore::new(&self.state_file);
        let status = StateStatus {
            state_file: self.state_file.clone(),
            exists: store.path().exists(),
            summary: store.inspect().summary(),
        };
        match format {
            OutputFormat::Json => to_json(&status),
            OutputFormat::Text => Ok(format_state_status_text(&status)),
        }
    }

    fn handle_courses(&self, format: &str) -> Result<String, ApiError> {
        let format = parse_format(format)?;
        let courses = Self::runtime()?.block_on(async {
            let client = catalog::connect(&self.config.remote).await?;
            client.list_courses().await
        })?;
        match format {
            OutputFormat::Json => to_json(&courses),
            OutputFormat::Text => Ok(format_courses_text(&courses)),
        }
    }
}
