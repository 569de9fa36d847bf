//! Report Builder
//!
//! Aggregates the sync engine's classifications into an end-of-run summary. Pure
//! bookkeeping: nothing here touches the network or the filesystem.

mod format;

pub use format::{
    format_courses_text, format_section_heading, format_state_status_text, format_sync_report_text,
};

use crate::state::StateSummary;
use serde::Serialize;
use std::path::PathBuf;

/// A module reported as new in this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewItem {
    pub course: String,
    pub section: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A file fetched in this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedItem {
    pub course: String,
    pub file_name: String,
    pub path: PathBuf,
    pub redownload: bool,
}

/// A file whose fetch or write failed; its state is untouched and it is retried next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub course: String,
    pub module: String,
    pub file_name: String,
    pub reason: String,
}

/// A course whose contents could not be listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseFailure {
    pub course: String,
    pub reason: String,
}

/// End-of-run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub first_run: bool,
    pub download_root: PathBuf,
    pub cleaned_from_state: usize,
    pub new_items: Vec<NewItem>,
    pub redownloaded: Vec<String>,
    pub downloaded: Vec<DownloadedItem>,
    pub failures: Vec<FileFailure>,
    pub skipped_courses: Vec<CourseFailure>,
}

impl SyncReport {
    /// Files fetched for the first time (excludes re-downloads).
    pub fn fresh_downloads(&self) -> usize {
        self.downloaded.iter().filter(|d| !d.redownload).count()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty() || !self.skipped_courses.is_empty()
    }
}

/// Accumulates classification outcomes during a run.
#[derive(Debug)]
pub struct ReportBuilder {
    report: SyncReport,
}

impl ReportBuilder {
    pub fn new(first_run: bool, download_root: impl Into<PathBuf>) -> Self {
        Self {
            report: SyncReport {
                first_run,
                download_root: download_root.into(),
                cleaned_from_state: 0,
                new_items: Vec::new(),
                redownloaded: Vec::new(),
                downloaded: Vec::new(),
                failures: Vec::new(),
                skipped_courses: Vec::new(),
            },
        }
    }

    pub fn record_cleanup(&mut self, removed: usize) {
        self.report.cleaned_from_state += removed;
    }

    pub fn record_new_item(&mut self, course: &str, section: &str, name: &str, kind: &str) {
        self.report.new_items.push(NewItem {
            course: course.to_string(),
            section: section.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
        });
    }

    pub fn record_download(&mut self, item: DownloadedItem) {
        if item.redownload {
            self.report.redownloaded.push(item.file_name.clone());
        }
        self.report.downloaded.push(item);
    }

    pub fn record_failure(&mut self, failure: FileFailure) {
        self.report.failures.push(failure);
    }

    pub fn record_course_failure(&mut self, course: &str, reason: impl Into<String>) {
        self.report.skipped_courses.push(CourseFailure {
            course: course.to_string(),
            reason: reason.into(),
        });
    }

    pub fn build(self) -> SyncReport {
        self.report
    }
}

/// Offline view of the state file for the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct StateStatus {
    pub state_file: PathBuf,
    pub exists: bool,
    #[serde(flatten)]
    pub summary: StateSummary,
}
