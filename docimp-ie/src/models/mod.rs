//! Data models for the import engine

pub mod analysis;
pub mod duplicate;
pub mod file_entry;
pub mod job;
pub mod wizard;

pub use analysis::{AnalysisResult, ProcessingMode};
pub use duplicate::{
    DuplicateCandidate, DuplicateClass, ExistingRecord, ResolutionAction, ResolutionDecision,
};
pub use file_entry::{FileCategory, FileCountMode, FileEntry};
pub use job::FinalizedJob;
pub use wizard::{
    ApprovalMode, DispositionKind, ReviewTarget, RoutingSelection, SchedulingOptions,
    StepDescriptor, WizardData, WizardDataPatch, WizardState, WizardStep,
};
