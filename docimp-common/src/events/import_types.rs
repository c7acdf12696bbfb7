//! Supporting types carried by import events

use serde::{Deserialize, Serialize};

/// Wizard position carried by `WizardStateChanged`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardPosition {
    /// Current step index (0-based)
    pub current_step: usize,
    /// Stable identifier of the current step (e.g. "intake")
    pub step_id: String,
    /// Whether the wizard is in review mode
    pub is_reviewing: bool,
    /// Step to return to when leaving review mode
    pub original_step: Option<usize>,
    /// Number of steps marked completed
    pub completed_steps: usize,
}

/// Duplicate classification counts for one intake batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCounts {
    /// Same name and size already present in the target location
    pub critical: usize,
    /// Same name and size present in another location
    pub informative: usize,
    /// Files with no duplicate record
    pub passthrough: usize,
}

impl DuplicateCounts {
    /// Total number of files in the batch
    pub fn total(&self) -> usize {
        self.critical + self.informative + self.passthrough
    }
}
