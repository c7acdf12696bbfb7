//! Per-session import orchestration
//!
//! Wires the wizard, intake validation, duplicate detection, resolution,
//! content analysis and submission together for one import session. The
//! orchestrator is the only caller that mutates the session's wizard data.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use docimp_common::events::{EventBus, ImportEvent, WizardPosition};

use super::content_analysis::{
    ContentAnalysisScheduler, QualityAnalyzer, TextExtractor, TriggerSignature,
};
use super::duplicate_detector::{DuplicateDetector, RecordIndex};
use super::intake_validator::{FileIntakeValidator, RejectedFile};
use super::resolution_engine::{ResolutionError, ResolutionPolicyEngine};
use super::submission::{SubmissionAssembler, SubmissionError};
use crate::config::EngineSettings;
use crate::models::{
    AnalysisResult, DuplicateCandidate, FileCategory, FileCountMode, FileEntry, FinalizedJob,
    ProcessingMode, ResolutionAction, ResolutionDecision, WizardDataPatch, WizardState,
    WizardStep,
};
use crate::wizard::WizardStateMachine;

/// Intake validation errors; nothing is applied when one is returned
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Select a category before adding files")]
    CategoryMissing,

    #[error("Single-file mode accepts one file, {0} were accepted")]
    TooManyFiles(usize),

    #[error("No files were accepted for this category")]
    NothingAccepted,
}

/// Collaborators shared by every session of the service
#[derive(Clone)]
pub struct SessionServices {
    pub record_index: Arc<dyn RecordIndex>,
    pub quality: Arc<dyn QualityAnalyzer>,
    pub extractor: Arc<dyn TextExtractor>,
    pub settings: EngineSettings,
    pub event_bus: EventBus,
}

/// Outcome of one intake batch
#[derive(Debug, Clone, Serialize)]
pub struct IntakeSummary {
    pub accepted: usize,
    pub rejected: Vec<RejectedFile>,
    pub duplicates: Vec<DuplicateCandidate>,
    /// Current decision per duplicate, same order as `duplicates`
    pub decisions: Vec<ResolutionAction>,
    pub lookup_failures: usize,
    /// Files destined for the job after default resolution
    pub files: Vec<FileEntry>,
}

/// Per-session facade
pub struct ImportOrchestrator {
    session_id: Uuid,
    target_location: String,
    wizard: WizardStateMachine,
    validator: FileIntakeValidator,
    detector: DuplicateDetector,
    resolution: ResolutionPolicyEngine,
    passthrough: Vec<FileEntry>,
    scheduler: ContentAnalysisScheduler,
    assembler: SubmissionAssembler,
    event_bus: EventBus,
}

impl ImportOrchestrator {
    /// Open a session importing into `target_location`
    pub fn start(services: &SessionServices, target_location: impl Into<String>) -> Self {
        let session_id = Uuid::new_v4();
        let target_location = target_location.into();
        let policy = services.settings.categories.clone();

        let mut wizard = WizardStateMachine::new(policy.adaptive_categories());
        let bus = services.event_bus.clone();
        wizard.subscribe(move |state: &WizardState| {
            bus.emit_lossy(ImportEvent::WizardStateChanged {
                session_id,
                position: position_of(state),
                timestamp: chrono::Utc::now(),
            });
        });

        let scheduler = ContentAnalysisScheduler::with_events(
            Arc::clone(&services.quality),
            Arc::clone(&services.extractor),
            services.settings.analysis.clone(),
            services.event_bus.clone(),
            session_id,
        );

        services
            .event_bus
            .emit_lossy(ImportEvent::ImportSessionStarted {
                session_id,
                target_location: target_location.clone(),
                timestamp: chrono::Utc::now(),
            });
        tracing::info!(
            session_id = %session_id,
            target_location = %target_location,
            "Import session started"
        );

        Self {
            session_id,
            target_location,
            wizard,
            validator: FileIntakeValidator::new(policy),
            detector: DuplicateDetector::new(Arc::clone(&services.record_index)),
            resolution: ResolutionPolicyEngine::default(),
            passthrough: Vec::new(),
            scheduler,
            assembler: SubmissionAssembler::new(services.event_bus.clone()),
            event_bus: services.event_bus.clone(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn target_location(&self) -> &str {
        &self.target_location
    }

    pub fn wizard(&self) -> &WizardStateMachine {
        &self.wizard
    }

    /// Direct wizard access for navigation and generic data merges
    pub fn wizard_mut(&mut self) -> &mut WizardStateMachine {
        &mut self.wizard
    }

    pub fn duplicates(&self) -> &[DuplicateCandidate] {
        self.resolution.candidates()
    }

    pub fn select_file_count_mode(&mut self, mode: FileCountMode) {
        self.wizard.merge_data(WizardDataPatch {
            file_count_mode: Some(mode),
            ..Default::default()
        });
    }

    /// Select the category; a different category resets everything after it
    pub async fn select_category(&mut self, category: FileCategory) {
        let previous = self.wizard.state().data.category;
        if previous.is_some() && previous != Some(category) {
            tracing::info!(
                session_id = %self.session_id,
                from = ?previous,
                to = ?category,
                "Category changed, resetting later steps"
            );
            self.scheduler.reset().await;
            self.resolution = ResolutionPolicyEngine::default();
            self.passthrough.clear();
            self.wizard.reset_from(WizardStep::Category.index());
        }

        self.wizard.merge_data(WizardDataPatch {
            category: Some(category),
            ..Default::default()
        });
    }

    /// Validate, classify and resolve one batch of candidate files
    ///
    /// The batch replaces any earlier one. Duplicates start with their
    /// default decision; `resolve` changes decisions afterwards.
    pub async fn intake(&mut self, files: Vec<FileEntry>) -> Result<IntakeSummary, IntakeError> {
        let category = self
            .wizard
            .state()
            .data
            .category
            .ok_or(IntakeError::CategoryMissing)?;

        let report = self.validator.validate(files, category);
        if report.accepted.is_empty() {
            return Err(IntakeError::NothingAccepted);
        }
        if self.wizard.state().data.file_count_mode == Some(FileCountMode::Single)
            && report.accepted.len() > 1
        {
            return Err(IntakeError::TooManyFiles(report.accepted.len()));
        }

        let detection = self
            .detector
            .detect(report.accepted.clone(), &self.target_location)
            .await;
        let counts = detection.counts();
        self.event_bus.emit_lossy(ImportEvent::DuplicatesDetected {
            session_id: self.session_id,
            counts,
            timestamp: chrono::Utc::now(),
        });

        self.resolution = ResolutionPolicyEngine::new(detection.duplicates);
        self.passthrough = detection.passthrough;
        self.commit_resolution().await;

        tracing::info!(
            session_id = %self.session_id,
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            critical = counts.critical,
            informative = counts.informative,
            "Intake batch processed"
        );

        Ok(IntakeSummary {
            accepted: report.accepted.len(),
            rejected: report.rejected,
            duplicates: self.resolution.candidates().to_vec(),
            decisions: self.current_actions(),
            lookup_failures: detection.lookup_failures,
            files: self.wizard.state().data.files.clone(),
        })
    }

    /// Apply user decisions for the current batch's duplicates (all or nothing)
    pub async fn resolve(
        &mut self,
        decisions: &[ResolutionDecision],
    ) -> Result<Vec<FileEntry>, ResolutionError> {
        self.resolution.decide_all(decisions)?;
        self.commit_resolution().await;
        Ok(self.wizard.state().data.files.clone())
    }

    /// Choose the processing mode and (re-)arm content analysis
    pub async fn set_processing_mode(&mut self, mode: ProcessingMode) -> TriggerSignature {
        self.wizard.merge_data(WizardDataPatch {
            processing_mode: Some(mode),
            ..Default::default()
        });
        self.scheduler.trigger(self.eligible_files(), mode).await
    }

    /// Files of the batch that go through adaptive analysis
    pub fn eligible_files(&self) -> Vec<FileEntry> {
        let data = &self.wizard.state().data;
        match data.category {
            Some(category) => data
                .files
                .iter()
                .filter(|f| self.validator.policy().is_adaptive_eligible(category, f))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Latest committed analysis results
    pub async fn analysis(&self) -> BTreeMap<String, AnalysisResult> {
        self.scheduler.results().await
    }

    /// Names of files that will use OCR
    pub async fn ocr_files(&self) -> Vec<String> {
        self.scheduler
            .results()
            .await
            .into_values()
            .filter(|r| r.needs_ocr)
            .map(|r| r.file_name)
            .collect()
    }

    /// Whether the committed results reflect the current files and mode
    pub async fn analysis_is_current(&self) -> bool {
        self.scheduler.is_current().await
    }

    /// Wait for the outstanding analysis pass
    pub async fn settle_analysis(&self) {
        self.scheduler.settle().await;
    }

    pub async fn quick_finish(&mut self) -> Result<FinalizedJob, SubmissionError> {
        let job = self
            .assembler
            .quick_finish(self.session_id, &mut self.wizard, &self.target_location)?;
        self.scheduler.cancel().await;
        Ok(job)
    }

    /// Validate the disposition and finish, waiting for pending analysis first
    ///
    /// Analysis results are attached only while a processing mode is set and
    /// they reflect the current files and mode.
    pub async fn full_finish(&mut self) -> Result<FinalizedJob, SubmissionError> {
        self.scheduler.settle().await;
        let analysis = if self.wizard.state().data.processing_mode.is_some()
            && self.scheduler.is_current().await
        {
            self.scheduler.results().await
        } else {
            BTreeMap::new()
        };
        let job = self.assembler.full_finish(
            self.session_id,
            &mut self.wizard,
            &self.target_location,
            analysis,
        )?;
        self.scheduler.cancel().await;
        Ok(job)
    }

    /// Discard the session without emitting a job
    ///
    /// Emits `ImportSessionAbandoned` unless the session already finished.
    pub async fn abandon(&mut self) {
        self.scheduler.reset().await;
        if !self.wizard.is_finalized() {
            self.event_bus.emit_lossy(ImportEvent::ImportSessionAbandoned {
                session_id: self.session_id,
                timestamp: chrono::Utc::now(),
            });
        }
        tracing::info!(session_id = %self.session_id, "Import session closed");
    }

    fn current_actions(&self) -> Vec<ResolutionAction> {
        self.resolution
            .decisions()
            .into_iter()
            .map(|d| d.action)
            .collect()
    }

    async fn commit_resolution(&mut self) {
        let outcome = self.resolution.apply(&self.passthrough);
        self.wizard.merge_data(outcome.into_patch());

        // file set changed: analysis inputs follow it
        if let Some(mode) = self.wizard.state().data.processing_mode {
            self.scheduler.trigger(self.eligible_files(), mode).await;
        }
    }
}

fn position_of(state: &WizardState) -> WizardPosition {
    WizardPosition {
        current_step: state.current_step,
        step_id: state.current().id().to_string(),
        is_reviewing: state.is_reviewing,
        original_step: state.original_step,
        completed_steps: state.completed_count(),
    }
}
