//! Import engine services

pub mod analysis_client;
pub mod content_analysis;
pub mod duplicate_detector;
pub mod import_orchestrator;
pub mod intake_validator;
pub mod resolution_engine;
pub mod submission;

pub use analysis_client::{analyzers_from_config, DisabledAnalyzer, HttpContentAnalyzer};
pub use content_analysis::{
    is_sparse, AnalysisError, ContentAnalysisScheduler, ExtractedText, QualityAnalyzer,
    QualityVerdict, TextExtractor, TriggerSignature,
};
pub use duplicate_detector::{
    DetectionReport, DuplicateDetector, IndexError, LocationScope, RecordIndex, RecordQuery,
};
pub use import_orchestrator::{ImportOrchestrator, IntakeError, IntakeSummary, SessionServices};
pub use intake_validator::{
    CategoryPolicy, FileIntakeValidator, IntakeReport, RejectedFile, RejectionReason,
};
pub use resolution_engine::{
    generate_unique_name, ResolutionError, ResolutionOutcome, ResolutionPolicyEngine,
};
pub use submission::{
    validate_disposition, DispositionViolation, SubmissionAssembler, SubmissionError,
};
