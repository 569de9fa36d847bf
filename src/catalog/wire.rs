//! Web-service response payloads.

use crate::catalog::{Course, FileRef, Module, Section};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub errorcode: Option<String>,
}

/// Error payload returned with HTTP 200 by the REST endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct WsException {
    pub exception: String,
    #[serde(default)]
    pub errorcode: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl WsException {
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.get("exception").is_none() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Token rejected or revoked.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.errorcode.as_deref(),
            Some("invalidtoken") | Some("accessexception") | Some("invalidlogin")
        )
    }

    pub fn describe(&self) -> String {
        let message = self.message.as_deref().unwrap_or(&self.exception);
        match &self.errorcode {
            Some(code) => format!("{} ({})", message, code),
            None => message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SiteInfo {
    pub userid: u64,
    #[serde(default)]
    pub sitename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireCourse {
    pub id: u64,
    pub fullname: String,
    #[serde(default)]
    pub shortname: Option<String>,
}

impl From<WireCourse> for Course {
    fn from(course: WireCourse) -> Self {
        Course {
            id: course.id,
            name: course.fullname,
            short_name: course.shortname,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireSection {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub section: Option<u32>,
    #[serde(default)]
    pub modules: Vec<WireModule>,
}

impl WireSection {
    /// Sections without a position number fall back to their listing index.
    pub fn into_section(self, index: usize) -> Section {
        Section {
            name: self.name,
            ordinal: self.section.unwrap_or(index as u32),
            modules: self.modules.into_iter().map(Module::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireModule {
    pub id: u64,
    pub name: String,
    pub modname: String,
    #[serde(default)]
    pub contents: Vec<WireContent>,
}

impl From<WireModule> for Module {
    fn from(module: WireModule) -> Self {
        let module_id = module.id;
        let files = module
            .contents
            .into_iter()
            .filter(|c| c.kind == "file")
            .filter_map(|c| {
                let url = c.fileurl?;
                if c.filename.is_empty() {
                    return None;
                }
                Some(FileRef {
                    name: c.filename,
                    url,
                    parent_module_id: module_id,
                })
            })
            .collect();
        Module {
            id: module.id,
            name: module.name,
            kind: module.modname,
            files,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub fileurl: Option<String>,
}
