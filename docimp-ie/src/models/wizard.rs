//! Wizard state and accumulated selections
//!
//! Step order:
//! QUANTITY → CATEGORY → INTAKE → [ADAPTIVE_OPTIONS] → SCHEDULING → DISPOSITION → ROUTING
//!
//! ADAPTIVE_OPTIONS is skipped when the selected category has no adaptive processing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AnalysisResult, FileCategory, FileCountMode, FileEntry, ProcessingMode};

/// Wizard steps in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    /// Single or multiple files
    Quantity,
    /// Document category
    Category,
    /// File selection, validation and duplicate resolution
    Intake,
    /// OCR / text extraction mode
    AdaptiveOptions,
    /// Publication window and versioning
    Scheduling,
    /// Approved, review or approval
    Disposition,
    /// Participants for review/approval
    Routing,
}

impl WizardStep {
    pub const ALL: [WizardStep; 7] = [
        WizardStep::Quantity,
        WizardStep::Category,
        WizardStep::Intake,
        WizardStep::AdaptiveOptions,
        WizardStep::Scheduling,
        WizardStep::Disposition,
        WizardStep::Routing,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            WizardStep::Quantity => "quantity",
            WizardStep::Category => "category",
            WizardStep::Intake => "intake",
            WizardStep::AdaptiveOptions => "adaptive_options",
            WizardStep::Scheduling => "scheduling",
            WizardStep::Disposition => "disposition",
            WizardStep::Routing => "routing",
        }
    }

    /// Position in the default step order
    pub fn index(&self) -> usize {
        WizardStep::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }
}

/// One entry of the step list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub id: WizardStep,
    pub completed: bool,
}

/// Scheduling and versioning metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingOptions {
    #[serde(default)]
    pub publish_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version_label: Option<String>,
    /// Versions the persistence collaborator keeps on replace
    #[serde(default)]
    pub keep_versions: Option<u32>,
}

/// Final disposition of the imported documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionKind {
    /// Published as approved, no routing
    Approved,
    /// Routed to reviewers
    Review,
    /// Routed to approvers
    Approval,
}

/// Who reviews
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewTarget {
    #[default]
    Users,
    Group,
}

/// How approvals combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Exactly one approver
    #[default]
    Single,
    /// Any one of several approvers
    Any,
    /// Every listed approver
    All,
}

/// Participants selected on the routing step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingSelection {
    #[serde(default)]
    pub review_target: ReviewTarget,
    #[serde(default)]
    pub reviewers: Vec<String>,
    #[serde(default)]
    pub review_group: Option<String>,
    #[serde(default)]
    pub approval_mode: ApprovalMode,
    #[serde(default)]
    pub approvers: Vec<String>,
}

/// Accumulated wizard selections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardData {
    pub file_count_mode: Option<FileCountMode>,
    pub category: Option<FileCategory>,
    pub files: Vec<FileEntry>,
    /// Names imported with replacement semantics
    pub replace_tags: Vec<String>,
    /// Names imported despite a duplicate in another location
    pub import_anyway_tags: Vec<String>,
    pub processing_mode: Option<ProcessingMode>,
    /// Committed analysis results; attached when a job is assembled
    pub analysis: BTreeMap<String, AnalysisResult>,
    pub scheduling: SchedulingOptions,
    pub disposition: Option<DispositionKind>,
    pub routing: Option<RoutingSelection>,
}

/// Partial update for `WizardData`; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardDataPatch {
    pub file_count_mode: Option<FileCountMode>,
    pub category: Option<FileCategory>,
    pub files: Option<Vec<FileEntry>>,
    pub replace_tags: Option<Vec<String>>,
    pub import_anyway_tags: Option<Vec<String>>,
    pub processing_mode: Option<ProcessingMode>,
    pub scheduling: Option<SchedulingOptions>,
    pub disposition: Option<DispositionKind>,
    pub routing: Option<RoutingSelection>,
}

impl WizardData {
    /// Shallow merge
    pub(crate) fn apply(&mut self, patch: WizardDataPatch) {
        if let Some(v) = patch.file_count_mode {
            self.file_count_mode = Some(v);
        }
        if let Some(v) = patch.category {
            self.category = Some(v);
        }
        if let Some(v) = patch.files {
            self.files = v;
        }
        if let Some(v) = patch.replace_tags {
            self.replace_tags = v;
        }
        if let Some(v) = patch.import_anyway_tags {
            self.import_anyway_tags = v;
        }
        if let Some(v) = patch.processing_mode {
            self.processing_mode = Some(v);
        }
        if let Some(v) = patch.scheduling {
            self.scheduling = v;
        }
        if let Some(v) = patch.disposition {
            self.disposition = Some(v);
        }
        if let Some(v) = patch.routing {
            self.routing = Some(v);
        }
    }

    /// Clear the fields a step produces
    pub(crate) fn clear_owned_by(&mut self, step: WizardStep) {
        match step {
            WizardStep::Quantity => self.file_count_mode = None,
            WizardStep::Category => self.category = None,
            WizardStep::Intake => {
                self.files.clear();
                self.replace_tags.clear();
                self.import_anyway_tags.clear();
            }
            WizardStep::AdaptiveOptions => {
                self.processing_mode = None;
                self.analysis.clear();
            }
            WizardStep::Scheduling => self.scheduling = SchedulingOptions::default(),
            WizardStep::Disposition => self.disposition = None,
            WizardStep::Routing => self.routing = None,
        }
    }
}

/// Full wizard state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub current_step: usize,
    pub steps: Vec<StepDescriptor>,
    pub is_reviewing: bool,
    pub original_step: Option<usize>,
    pub data: WizardData,
}

impl WizardState {
    pub fn new() -> Self {
        Self {
            current_step: 0,
            steps: WizardStep::ALL
                .iter()
                .map(|&id| StepDescriptor {
                    id,
                    completed: false,
                })
                .collect(),
            is_reviewing: false,
            original_step: None,
            data: WizardData::default(),
        }
    }

    pub fn current(&self) -> WizardStep {
        self.steps[self.current_step].id
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new()
    }
}
