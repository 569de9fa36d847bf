//! Shared fixtures: an in-memory catalog and a temporary mirror root.

use async_trait::async_trait;
use coursemirror::catalog::{CatalogClient, Course, FileRef, Module, Section};
use coursemirror::error::ApiError;
use coursemirror::progress::{BufferedReporter, NoopReporter};
use coursemirror::report::SyncReport;
use coursemirror::state::{StateStore, SyncState};
use coursemirror::sync::{DownloadLayout, SyncEngine};
use coursemirror::types::CourseId;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

pub fn file(module_id: u64, name: &str) -> FileRef {
    FileRef {
        name: name.to_string(),
        url: format!("mem://{}/{}", module_id, name),
        parent_module_id: module_id,
    }
}

pub fn module(id: u64, name: &str, kind: &str, files: &[&str]) -> Module {
    Module {
        id,
        name: name.to_string(),
        kind: kind.to_string(),
        files: files.iter().map(|f| file(id, f)).collect(),
    }
}

pub fn section(name: &str, ordinal: u32, modules: Vec<Module>) -> Section {
    Section {
        name: name.to_string(),
        ordinal,
        modules,
    }
}

pub fn course(id: CourseId, name: &str) -> Course {
    Course {
        id,
        name: name.to_string(),
        short_name: None,
    }
}

/// Course "Algorithms101" (id 10) with module "Week1" (id 100) holding two files.
pub fn algorithms_catalog() -> FakeCatalog {
    FakeCatalog::default().with_course(
        course(10, "Algorithms101"),
        vec![section(
            "Week 1",
            1,
            vec![module(
                100,
                "Week1",
                "resource",
                &["slides.pdf", "notes.pdf"],
            )],
        )],
    )
}

/// In-memory catalog with switchable failures and a fetch log.
#[derive(Default)]
pub struct FakeCatalog {
    courses: Vec<(Course, Vec<Section>)>,
    failing_courses: HashSet<CourseId>,
    fail_listing: bool,
    failing_files: Mutex<HashSet<String>>,
    fetches: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn with_course(mut self, course: Course, sections: Vec<Section>) -> Self {
        self.courses.push((course, sections));
        self
    }

    pub fn with_failing_course(mut self, course_id: CourseId) -> Self {
        self.failing_courses.insert(course_id);
        self
    }

    pub fn with_failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn fail_file(&self, name: &str) {
        self.failing_files.lock().unwrap().insert(name.to_string());
    }

    pub fn heal_file(&self, name: &str) {
        self.failing_files.lock().unwrap().remove(name);
    }

    /// File names fetched since the last call, in order.
    pub fn take_fetches(&self) -> Vec<String> {
        std::mem::take(&mut *self.fetches.lock().unwrap())
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn list_courses(&self) -> Result<Vec<Course>, ApiError> {
        if self.fail_listing {
            return Err(ApiError::CatalogError("listing unavailable".to_string()));
        }
        Ok(self.courses.iter().map(|(c, _)| c.clone()).collect())
    }

    async fn list_contents(&self, course_id: CourseId) -> Result<Vec<Section>, ApiError> {
        if self.failing_courses.contains(&course_id) {
            return Err(ApiError::CatalogError(format!(
                "course {} unavailable",
                course_id
            )));
        }
        self.courses
            .iter()
            .find(|(c, _)| c.id == course_id)
            .map(|(_, sections)| sections.clone())
            .ok_or_else(|| ApiError::CatalogError(format!("no course {}", course_id)))
    }

    async fn fetch_bytes(&self, file: &FileRef) -> Result<Vec<u8>, ApiError> {
        self.fetches.lock().unwrap().push(file.name.clone());
        if self.failing_files.lock().unwrap().contains(&file.name) {
            return Err(ApiError::FetchFailed(format!("{}: HTTP 500", file.name)));
        }
        Ok(format!("contents of {}", file.url).into_bytes())
    }
}

/// Temporary download root plus state file.
pub struct Mirror {
    pub temp: TempDir,
    pub store: StateStore,
}

impl Mirror {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path().join("state").join("state.json"));
        Self { temp, store }
    }

    pub fn root(&self) -> PathBuf {
        self.temp.path().join("downloads")
    }

    pub fn path(&self, course: &str, section: &str, file: &str) -> PathBuf {
        DownloadLayout::new(self.root()).file_path(course, section, file)
    }

    pub async fn sync(&self, catalog: &FakeCatalog) -> SyncReport {
        SyncEngine::new(catalog, &self.store, DownloadLayout::new(self.root()))
            .run(&mut NoopReporter)
            .await
            .unwrap()
    }

    pub async fn sync_with_lines(&self, catalog: &FakeCatalog) -> (SyncReport, Vec<String>) {
        let mut reporter = BufferedReporter::default();
        let report = SyncEngine::new(catalog, &self.store, DownloadLayout::new(self.root()))
            .run(&mut reporter)
            .await
            .unwrap();
        (report, reporter.lines)
    }

    pub fn saved_state(&self) -> SyncState {
        self.store.load()
    }
}
