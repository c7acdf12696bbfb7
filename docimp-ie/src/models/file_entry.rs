//! Candidate files and their categories

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file offered for import
///
/// Identity for duplicate detection is `(name, size)`; the path is only a
/// handle to the raw bytes for the content analyzers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name including extension
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type reported by the client, if any
    #[serde(default)]
    pub mime_hint: Option<String>,
    /// Location of the raw bytes
    #[serde(default)]
    pub path: PathBuf,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, size: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            size,
            mime_hint: None,
            path: path.into(),
        }
    }

    pub fn with_mime_hint(mut self, mime: impl Into<String>) -> Self {
        self.mime_hint = Some(mime.into());
        self
    }

    /// Lower-cased extension without the dot, `None` when the name has none
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Duplicate identity
    pub fn identity(&self) -> (&str, u64) {
        (&self.name, self.size)
    }

    /// Same file under a different name
    pub fn renamed(&self, new_name: impl Into<String>) -> Self {
        Self {
            name: new_name.into(),
            ..self.clone()
        }
    }
}

/// Import categories
///
/// `Other` is the catch-all: it accepts every extension not owned by
/// another category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Documents,
    Images,
    Spreadsheets,
    Other,
}

impl FileCategory {
    pub const ALL: [FileCategory; 4] = [
        FileCategory::Documents,
        FileCategory::Images,
        FileCategory::Spreadsheets,
        FileCategory::Other,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            FileCategory::Documents => "documents",
            FileCategory::Images => "images",
            FileCategory::Spreadsheets => "spreadsheets",
            FileCategory::Other => "other",
        }
    }
}

/// Quantity step selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCountMode {
    Single,
    Multiple,
}
