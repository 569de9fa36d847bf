//! Identity Scheme
//!
//! Derives stable keys for modules and files from remote identifiers. Keys are tagged
//! by kind, so callers never infer "module or file" from the shape of a string.
//!
//! The persisted string form is `<course>_<module>` for modules and
//! `<course>_<module>_<file name>` for files. Course and module identifiers are
//! numeric, so the first two underscores always delimit them and the file name may
//! itself contain underscores.
//!
//! A file renamed upstream gets a new key and is downloaded again; the record under
//! the old key stays orphaned until its local file disappears.

use crate::types::{CourseId, ModuleId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Tagged identity of a remote object tracked in the sync state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    Module {
        course_id: CourseId,
        module_id: ModuleId,
    },
    File {
        course_id: CourseId,
        module_id: ModuleId,
        file_name: String,
    },
}

/// Key for a module within a course.
pub fn key_for_module(course_id: CourseId, module_id: ModuleId) -> IdentityKey {
    IdentityKey::Module {
        course_id,
        module_id,
    }
}

/// Key for a file within a module. The remote system assigns no per-file id,
/// so the file name disambiguates files of the same module.
pub fn key_for_file(course_id: CourseId, module_id: ModuleId, file_name: &str) -> IdentityKey {
    IdentityKey::File {
        course_id,
        module_id,
        file_name: file_name.to_string(),
    }
}

impl IdentityKey {
    pub fn course_id(&self) -> CourseId {
        match self {
            IdentityKey::Module { course_id, .. } | IdentityKey::File { course_id, .. } => {
                *course_id
            }
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, IdentityKey::File { .. })
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Module {
                course_id,
                module_id,
            } => write!(f, "{}_{}", course_id, module_id),
            IdentityKey::File {
                course_id,
                module_id,
                file_name,
            } => write!(f, "{}_{}_{}", course_id, module_id, file_name),
        }
    }
}

/// Rejected persisted key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidKey(pub String);

impl fmt::Display for InvalidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid identity key: {:?}", self.0)
    }
}

impl std::error::Error for InvalidKey {}

impl FromStr for IdentityKey {
    type Err = InvalidKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '_');
        let course_id = parts
            .next()
            .and_then(|p| p.parse::<CourseId>().ok())
            .ok_or_else(|| InvalidKey(s.to_string()))?;
        let module_id = parts
            .next()
            .and_then(|p| p.parse::<ModuleId>().ok())
            .ok_or_else(|| InvalidKey(s.to_string()))?;
        match parts.next() {
            None => Ok(key_for_module(course_id, module_id)),
            Some("") => Err(InvalidKey(s.to_string())),
            Some(file_name) => Ok(key_for_file(course_id, module_id, file_name)),
        }
    }
}

impl Serialize for IdentityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IdentityKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
