//! Duplicate classification and resolution types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FileEntry;

/// Lightweight record returned by the record index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingRecord {
    pub id: Uuid,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub location_label: String,
    pub owner_label: String,
}

/// Duplicate severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateClass {
    /// Same name and size already in the target location
    Critical,
    /// Same name and size in another location
    Informative,
}

/// A file that clashes with an existing record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub file: FileEntry,
    pub existing: ExistingRecord,
    pub classification: DuplicateClass,
}

/// What to do with a duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Drop the file
    Cancel,
    /// Import under a collision-free name
    Rename,
    /// Keep the name and replace the existing record (critical only)
    Replace,
    /// Keep the name and tag the cross-location duplication (informative only)
    ImportAnyway,
}

impl ResolutionAction {
    /// Never overwrite silently, never drop a file that doesn't collide in place
    pub fn default_for(class: DuplicateClass) -> Self {
        match class {
            DuplicateClass::Critical => ResolutionAction::Cancel,
            DuplicateClass::Informative => ResolutionAction::ImportAnyway,
        }
    }

    pub fn is_permitted_for(&self, class: DuplicateClass) -> bool {
        match self {
            ResolutionAction::Cancel | ResolutionAction::Rename => true,
            ResolutionAction::Replace => class == DuplicateClass::Critical,
            ResolutionAction::ImportAnyway => class == DuplicateClass::Informative,
        }
    }
}

/// User decision for the duplicate at `duplicate_index` of a detection report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionDecision {
    pub duplicate_index: usize,
    pub action: ResolutionAction,
}
