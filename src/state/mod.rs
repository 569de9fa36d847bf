//! Sync State
//!
//! Durable mapping from identity key to what a previous run observed: a module that
//! has been reported once, or a file that was downloaded and where it landed.

pub mod persistence;

use crate::identity::IdentityKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub use persistence::{Reconciled, RemovedEntry, StateStore};

/// A downloaded file and where it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadedFileRecord {
    pub path: PathBuf,
    pub downloaded: DateTime<Utc>,
    pub course: String,
    pub module: String,
}

/// Persisted entry, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateRecord {
    /// A module that has already been reported as new once.
    ModuleSeen { seen: DateTime<Utc> },
    /// Meaningful only while `path` still exists on disk.
    DownloadedFile(DownloadedFileRecord),
}

/// Full key to record mapping; the unit of persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SyncState {
    entries: BTreeMap<IdentityKey, StateRecord>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&StateRecord> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: IdentityKey, record: StateRecord) -> Option<StateRecord> {
        self.entries.insert(key, record)
    }

    pub fn remove(&mut self, key: &IdentityKey) -> Option<StateRecord> {
        self.entries.remove(key)
    }

    /// Insert a seen marker unless the key is already tracked. Returns true when inserted.
    pub fn mark_module_seen(&mut self, key: IdentityKey, seen: DateTime<Utc>) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, StateRecord::ModuleSeen { seen });
        true
    }

    /// Upsert a download record, replacing any previous record for the key.
    pub fn record_download(&mut self, key: IdentityKey, record: DownloadedFileRecord) {
        self.entries.insert(key, StateRecord::DownloadedFile(record));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IdentityKey, &StateRecord)> {
        self.entries.iter()
    }

    pub(crate) fn into_entries(self) -> BTreeMap<IdentityKey, StateRecord> {
        self.entries
    }

    /// Counts for the offline status view. Checks each tracked path on disk.
    pub fn summary(&self) -> StateSummary {
        let mut summary = StateSummary::default();
        let mut courses = BTreeSet::new();
        for (key, record) in self.iter() {
            courses.insert(key.course_id());
            match record {
                StateRecord::ModuleSeen { .. } => summary.modules_seen += 1,
                StateRecord::DownloadedFile(file) => {
                    summary.files_tracked += 1;
                    if !file.path.is_file() {
                        summary.files_missing.push(file.path.clone());
                    }
                }
            }
        }
        summary.courses = courses.len();
        summary
    }
}

/// Aggregate view over a loaded state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateSummary {
    pub courses: usize,
    pub modules_seen: usize,
    pub files_tracked: usize,
    pub files_missing: Vec<PathBuf>,
}
