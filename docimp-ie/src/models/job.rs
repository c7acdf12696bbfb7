//! Finalized import job

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FileEntry, WizardData};

/// Job handed to the processing collaborator
///
/// Built once per successful finish and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedJob {
    session_id: Uuid,
    files: Vec<FileEntry>,
    config: WizardData,
    target_location: String,
    quick_mode: bool,
    finalized_at: DateTime<Utc>,
}

impl FinalizedJob {
    pub(crate) fn new(
        session_id: Uuid,
        config: WizardData,
        target_location: String,
        quick_mode: bool,
    ) -> Self {
        Self {
            session_id,
            files: config.files.clone(),
            config,
            target_location,
            quick_mode,
            finalized_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn config(&self) -> &WizardData {
        &self.config
    }

    pub fn target_location(&self) -> &str {
        &self.target_location
    }

    pub fn quick_mode(&self) -> bool {
        self.quick_mode
    }

    pub fn finalized_at(&self) -> DateTime<Utc> {
        self.finalized_at
    }
}
