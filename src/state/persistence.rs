//! JSON-file persistence for the sync state.
//!
//! Load fails soft: a missing file means first run, a corrupt one is moved aside and
//! treated the same way. Reconciliation drops download records whose file is
//! gone. Save always replaces the file atomically.

use crate::atomic::write_atomic;
use crate::error::StorageError;
use crate::identity::IdentityKey;
use crate::state::{DownloadedFileRecord, StateRecord, SyncState};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Download record dropped during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedEntry {
    pub key: IdentityKey,
    pub path: PathBuf,
}

/// Result of reconciling a loaded state against the filesystem.
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    pub state: SyncState,
    pub removed: Vec<RemovedEntry>,
}

enum ReadOutcome {
    Missing,
    Unreadable(String),
    Corrupt(String),
    Parsed(SyncState),
}

/// File records written before entries carried a `kind` discriminant.
#[derive(Debug, Deserialize)]
struct LegacyFileRecord {
    path: PathBuf,
    downloaded: String,
    #[serde(default)]
    course: String,
    #[serde(default)]
    module: String,
}

/// State file handle.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous state. Never fails; an empty result flags a first run.
    /// A corrupt file is moved aside so the next save cannot overwrite it unseen.
    pub fn load(&self) -> SyncState {
        match self.read() {
            ReadOutcome::Missing => {
                info!("No state file at {}, starting fresh", self.path.display());
                SyncState::new()
            }
            ReadOutcome::Unreadable(reason) => {
                warn!(
                    "Failed to read state file {}: {}, treating as first run",
                    self.path.display(),
                    reason
                );
                SyncState::new()
            }
            ReadOutcome::Corrupt(reason) => {
                warn!(
                    "State file {} is corrupt: {}, treating as first run",
                    self.path.display(),
                    reason
                );
                self.quarantine();
                SyncState::new()
            }
            ReadOutcome::Parsed(state) => state,
        }
    }

    /// Read the state without side effects on the file.
    pub fn inspect(&self) -> SyncState {
        match self.read() {
            ReadOutcome::Parsed(state) => state,
            ReadOutcome::Missing => SyncState::new(),
            ReadOutcome::Unreadable(reason) | ReadOutcome::Corrupt(reason) => {
                warn!("State file {} unusable: {}", self.path.display(), reason);
                SyncState::new()
            }
        }
    }

    fn read(&self) -> ReadOutcome {
        if !self.path.exists() {
            return ReadOutcome::Missing;
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => return ReadOutcome::Unreadable(e.to_string()),
        };

        let document: Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => return ReadOutcome::Corrupt(e.to_string()),
        };

        let Value::Object(map) = document else {
            return ReadOutcome::Corrupt("not a key/record mapping".to_string());
        };

        let mut state = SyncState::new();
        for (raw_key, raw_record) in map {
            let key: IdentityKey = match raw_key.parse() {
                Ok(k) => k,
                Err(e) => {
                    warn!("Skipping state entry: {}", e);
                    continue;
                }
            };
            match parse_record(raw_record) {
                Ok(record) if record_matches_key(&key, &record) => {
                    state.insert(key, record);
                }
                Ok(_) => warn!("Skipping state entry {}: record kind does not match key", key),
                Err(reason) => warn!("Skipping state entry {}: {}", key, reason),
            }
        }

        debug!(
            "Loaded {} state entries from {}",
            state.len(),
            self.path.display()
        );
        ReadOutcome::Parsed(state)
    }

    /// Drop every download record whose local path no longer exists. Seen markers are
    /// kept unconditionally.
    pub fn reconcile(state: SyncState) -> Reconciled {
        let mut reconciled = Reconciled::default();
        for (key, record) in state.into_entries() {
            match record {
                StateRecord::DownloadedFile(file) if !file.path.is_file() => {
                    warn!("Removed missing file from state: {}", file.path.display());
                    reconciled.removed.push(RemovedEntry {
                        key,
                        path: file.path,
                    });
                }
                record => {
                    reconciled.state.insert(key, record);
                }
            }
        }

        if !reconciled.removed.is_empty() {
            info!(
                "Cleaned {} missing files from state",
                reconciled.removed.len()
            );
        }
        reconciled
    }

    /// Persist the full mapping, replacing the previous file atomically.
    pub fn save(&self, state: &SyncState) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path, &json)?;
        info!(
            "Saved {} state entries to {}",
            state.len(),
            self.path.display()
        );
        Ok(())
    }

    fn quarantine(&self) {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".corrupt");
        let target = PathBuf::from(name);
        match std::fs::rename(&self.path, &target) {
            Ok(()) => warn!("Moved unreadable state file to {}", target.display()),
            Err(e) => warn!(
                "Failed to move unreadable state file {} aside: {}",
                self.path.display(),
                e
            ),
        }
    }
}

fn record_matches_key(key: &IdentityKey, record: &StateRecord) -> bool {
    match record {
        StateRecord::ModuleSeen { .. } => !key.is_file(),
        StateRecord::DownloadedFile(_) => key.is_file(),
    }
}

fn parse_record(value: Value) -> Result<StateRecord, String> {
    match value {
        Value::String(raw) => parse_timestamp(&raw)
            .map(|seen| StateRecord::ModuleSeen { seen })
            .ok_or_else(|| format!("unrecognized timestamp {:?}", raw)),
        Value::Object(map) if map.contains_key("kind") => {
            serde_json::from_value(Value::Object(map)).map_err(|e| e.to_string())
        }
        Value::Object(map) => {
            let legacy: LegacyFileRecord =
                serde_json::from_value(Value::Object(map)).map_err(|e| e.to_string())?;
            let downloaded = parse_timestamp(&legacy.downloaded)
                .ok_or_else(|| format!("unrecognized timestamp {:?}", legacy.downloaded))?;
            Ok(StateRecord::DownloadedFile(DownloadedFileRecord {
                path: legacy.path,
                downloaded,
                course: legacy.course,
                module: legacy.module,
            }))
        }
        other => Err(format!("unexpected record value {}", other)),
    }
}

/// RFC 3339, or a naive ISO-8601 timestamp read as local time.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
}
