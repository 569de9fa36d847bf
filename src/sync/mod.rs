//! Sync Engine
//!
//! One sequential pass over the remote catalog per run:
//!
//! 1. load the state file and reconcile it against the disk;
//! 2. walk courses -> sections -> modules -> files in listing order, classifying each
//!    module (new or seen) and each file (download, re-download, or up to date);
//! 3. fetch what needs fetching, recording each success in the in-memory state;
//! 4. save the state once, at the end.
//!
//! A run that fails before step 4 leaves the previous state file untouched.

pub mod layout;

pub use layout::{sanitize_component, sanitize_file_name, DownloadLayout};

use crate::atomic::write_atomic;
use crate::catalog::{CatalogClient, Course, FileRef, Module, Section};
use crate::error::ApiError;
use crate::identity::{key_for_file, key_for_module, IdentityKey};
use crate::progress::{ProgressReporter, SyncEvent};
use crate::report::{DownloadedItem, FileFailure, ReportBuilder, SyncReport};
use crate::state::{DownloadedFileRecord, Reconciled, StateStore, SyncState};
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Mutable bookkeeping for a single run.
struct Walk {
    state: SyncState,
    first_run: bool,
    /// File keys dropped by reconciliation; fetching one again is a re-download.
    evicted: HashSet<IdentityKey>,
    /// File keys already attempted this run.
    attempted: HashSet<IdentityKey>,
    /// Module keys already reported as new this run.
    reported: HashSet<IdentityKey>,
    report: ReportBuilder,
}

/// Drives one incremental sync against a catalog, a state file, and a download root.
pub struct SyncEngine<'a> {
    catalog: &'a dyn CatalogClient,
    store: &'a StateStore,
    layout: DownloadLayout,
}

impl<'a> SyncEngine<'a> {
    pub fn new(catalog: &'a dyn CatalogClient, store: &'a StateStore, layout: DownloadLayout) -> Self {
        Self {
            catalog,
            store,
            layout,
        }
    }

    /// Run one sync. Fails only when the course list cannot be fetched or the state
    /// cannot be saved; per-course and per-file failures end up in the report.
    pub async fn run(&self, progress: &mut dyn ProgressReporter) -> Result<SyncReport, ApiError> {
        let Reconciled { state, removed } = StateStore::reconcile(self.store.load());
        for entry in &removed {
            progress.report(SyncEvent::StateEntryRemoved { path: &entry.path });
        }

        let first_run = state.is_empty();
        if first_run {
            info!("First run, downloading all content");
            progress.report(SyncEvent::FirstRun);
        }

        let mut walk = Walk {
            state,
            first_run,
            evicted: removed.iter().map(|e| e.key.clone()).collect(),
            attempted: HashSet::new(),
            reported: HashSet::new(),
            report: ReportBuilder::new(first_run, self.layout.root()),
        };
        walk.report.record_cleanup(removed.len());

        let courses = self.catalog.list_courses().await?;
        info!("Syncing {} courses", courses.len());

        for course in &courses {
            progress.report(SyncEvent::CourseStarted { name: &course.name });
            let sections = match self.catalog.list_contents(course.id).await {
                Ok(sections) => sections,
                Err(e) => {
                    let reason = e.to_string();
                    warn!("Skipping course {} ({}): {}", course.name, course.id, reason);
                    progress.report(SyncEvent::CourseSkipped {
                        name: &course.name,
                        reason: &reason,
                    });
                    walk.report.record_course_failure(&course.name, reason);
                    continue;
                }
            };

            for section in &sections {
                for module in &section.modules {
                    self.sync_module(course, section, module, &mut walk, progress)
                        .await;
                }
            }
        }

        self.store.save(&walk.state)?;
        Ok(walk.report.build())
    }

    async fn sync_module(
        &self,
        course: &Course,
        section: &Section,
        module: &Module,
        walk: &mut Walk,
        progress: &mut dyn ProgressReporter,
    ) {
        let module_key = key_for_module(course.id, module.id);
        let is_new = !walk.state.contains(&module_key) || walk.first_run;
        if is_new && walk.reported.insert(module_key.clone()) {
            debug!("New module {}: {}", module_key, module.name);
            walk.report
                .record_new_item(&course.name, &section.name, &module.name, &module.kind);
        }
        walk.state.mark_module_seen(module_key, Utc::now());

        for file in &module.files {
            self.sync_file(course, section, module, file, walk, progress)
                .await;
        }
    }

    async fn sync_file(
        &self,
        course: &Course,
        section: &Section,
        module: &Module,
        file: &FileRef,
        walk: &mut Walk,
        progress: &mut dyn ProgressReporter,
    ) {
        let file_key = key_for_file(course.id, module.id, &file.name);
        if !walk.attempted.insert(file_key.clone()) {
            debug!("Already handled {} in this run", file_key);
            return;
        }

        let target = self.layout.file_path(&course.name, &section.name, &file.name);
        let in_state = walk.state.contains(&file_key);
        let on_disk = target.is_file();

        if in_state && on_disk && !walk.first_run {
            debug!("Up to date: {}", target.display());
            return;
        }

        let redownload = (in_state && !on_disk) || walk.evicted.contains(&file_key);
        progress.report(SyncEvent::Downloading {
            file_name: &file.name,
            redownload,
        });

        let written = match self.catalog.fetch_bytes(file).await {
            Ok(bytes) => write_atomic(&target, &bytes).map_err(ApiError::from),
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => {
                info!("Downloaded {} to {}", file_key, target.display());
                walk.state.record_download(
                    file_key,
                    DownloadedFileRecord {
                        path: target.clone(),
                        downloaded: Utc::now(),
                        course: course.name.clone(),
                        module: module.name.clone(),
                    },
                );
                progress.report(SyncEvent::Downloaded { path: &target });
                walk.report.record_download(DownloadedItem {
                    course: course.name.clone(),
                    file_name: file.name.clone(),
                    path: target,
                    redownload,
                });
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Failed to download {}: {}", file_key, reason);
                progress.report(SyncEvent::DownloadFailed {
                    file_name: &file.name,
                    reason: &reason,
                });
                walk.report.record_failure(FileFailure {
                    course: course.name.clone(),
                    module: module.name.clone(),
                    file_name: file.name.clone(),
                    reason,
                });
            }
        }
    }
}
