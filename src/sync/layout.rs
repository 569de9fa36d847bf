//! Download layout: `<root>/<course>/<section>/<file>`, every component sanitized.

use std::path::{Path, PathBuf};

/// Replace every character that is not alphanumeric, space, hyphen, or underscore
/// with `_`, then trim surrounding whitespace. An empty result becomes `_`, so a
/// component is never empty and never walks out of its parent (`..` becomes `__`).
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitize the stem and the extension separately so `slides.pdf` stays `slides.pdf`.
pub fn sanitize_file_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.trim().is_empty() && !ext.trim().is_empty() => {
            format!("{}.{}", sanitize_component(stem), sanitize_component(ext))
        }
        _ => sanitize_component(name),
    }
}

/// Maps catalog names to local paths under a download root.
#[derive(Debug, Clone)]
pub struct DownloadLayout {
    root: PathBuf,
}

impl DownloadLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_path(&self, course_name: &str, section_name: &str, file_name: &str) -> PathBuf {
        self.root
            .join(sanitize_component(course_name))
            .join(sanitize_component(section_name))
            .join(sanitize_file_name(file_name))
    }
}
