//! Remote Catalog
//!
//! Courses, sections, modules, and file references as listed by the learning platform.
//! Produced fresh on every run and never persisted. The sync engine consumes the
//! catalog only through [`CatalogClient`]; session and credential handling stay inside
//! the implementation.

pub mod moodle;
pub mod scrape;
mod wire;

use crate::config::{CatalogStrategy, RemoteConfig};
use crate::error::ApiError;
use crate::types::{CourseId, ModuleId};
use async_trait::async_trait;
use serde::Serialize;

pub use moodle::MoodleClient;
pub use scrape::ScrapeClient;

/// An enrolled course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
}

/// Named grouping of modules, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub ordinal: u32,
    pub modules: Vec<Module>,
}

/// A content item within a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    /// Remote module type, e.g. `resource`, `folder`, `forum`.
    pub kind: String,
    pub files: Vec<FileRef>,
}

/// A downloadable file attached to a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub url: String,
    pub parent_module_id: ModuleId,
}

/// Capabilities the sync engine needs from the remote platform.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<Course>, ApiError>;

    async fn list_contents(&self, course_id: CourseId) -> Result<Vec<Section>, ApiError>;

    async fn fetch_bytes(&self, file: &FileRef) -> Result<Vec<u8>, ApiError>;
}

/// Connect with the client matching `remote.strategy`.
pub async fn connect(config: &RemoteConfig) -> Result<Box<dyn CatalogClient>, ApiError> {
    let client: Box<dyn CatalogClient> = match config.strategy {
        CatalogStrategy::WebService => Box::new(MoodleClient::connect(config).await?),
        CatalogStrategy::Scrape => Box::new(ScrapeClient::connect(config).await?),
    };
    Ok(client)
}
