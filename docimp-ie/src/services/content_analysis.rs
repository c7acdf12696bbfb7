//! Adaptive content analysis scheduling
//!
//! Decides per eligible file whether OCR or direct text extraction is used.
//!
//! # Scheduling
//! - A pass starts only after the inputs (sorted file names + mode) have
//!   been stable for the debounce period.
//! - Re-triggering with different inputs supersedes the outstanding pass:
//!   its token is cancelled, and a pass that still completes is discarded
//!   because its signature no longer matches the live one.
//! - Files are analysed one after another inside a pass.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use docimp_common::events::{EventBus, ImportEvent};

use crate::config::AnalysisSettings;
use crate::models::{AnalysisResult, FileEntry, ProcessingMode};

/// Analyzer collaborator errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),

    #[error("Analyzer request failed: {0}")]
    Request(String),

    #[error("Invalid analyzer response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Quality analyzer verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    /// Analyzer recommends OCR
    pub needs_ocr: bool,
    #[serde(default)]
    pub score: Option<f32>,
}

/// Text extractor output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Extracted characters
    pub text_length: usize,
    pub page_count: u32,
}

/// Judges whether a file's embedded content is good enough to skip OCR
#[async_trait]
pub trait QualityAnalyzer: Send + Sync {
    async fn assess(&self, file: &FileEntry) -> Result<QualityVerdict, AnalysisError>;
}

/// Extracts embedded text from a file
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, file: &FileEntry) -> Result<ExtractedText, AnalysisError>;
}

/// Text too sparse to trust: use OCR
pub fn is_sparse(text: &ExtractedText, settings: &AnalysisSettings) -> bool {
    let pages = text.page_count.max(1) as f64;
    let chars_per_page = text.text_length as f64 / pages;
    chars_per_page < settings.min_chars_per_page || text.text_length < settings.min_total_chars
}

/// Inputs of one analysis pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerSignature {
    /// Increases with every accepted trigger
    pub generation: u64,
    /// Sorted eligible file names
    pub file_names: Vec<String>,
    pub mode: ProcessingMode,
}

impl TriggerSignature {
    fn same_inputs(&self, file_names: &[String], mode: ProcessingMode) -> bool {
        self.mode == mode && self.file_names == file_names
    }
}

struct PendingPass {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct SchedulerState {
    generation: u64,
    live: Option<TriggerSignature>,
    committed: Option<TriggerSignature>,
    results: BTreeMap<String, AnalysisResult>,
    pending: Option<PendingPass>,
}

struct Shared {
    quality: Arc<dyn QualityAnalyzer>,
    extractor: Arc<dyn TextExtractor>,
    settings: AnalysisSettings,
    event_bus: Option<EventBus>,
    session_id: Uuid,
    state: Mutex<SchedulerState>,
}

/// Debounced, cancellable per-session analysis scheduler
pub struct ContentAnalysisScheduler {
    shared: Arc<Shared>,
}

impl ContentAnalysisScheduler {
    pub fn new(
        quality: Arc<dyn QualityAnalyzer>,
        extractor: Arc<dyn TextExtractor>,
        settings: AnalysisSettings,
    ) -> Self {
        Self::build(quality, extractor, settings, None, Uuid::nil())
    }

    /// Scheduler that announces committed passes on the event bus
    pub fn with_events(
        quality: Arc<dyn QualityAnalyzer>,
        extractor: Arc<dyn TextExtractor>,
        settings: AnalysisSettings,
        event_bus: EventBus,
        session_id: Uuid,
    ) -> Self {
        Self::build(quality, extractor, settings, Some(event_bus), session_id)
    }

    fn build(
        quality: Arc<dyn QualityAnalyzer>,
        extractor: Arc<dyn TextExtractor>,
        settings: AnalysisSettings,
        event_bus: Option<EventBus>,
        session_id: Uuid,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                quality,
                extractor,
                settings,
                event_bus,
                session_id,
                state: Mutex::new(SchedulerState::default()),
            }),
        }
    }

    /// (Re-)arm the scheduler for `files` under `mode`
    ///
    /// Unchanged inputs keep the outstanding or committed pass. Changed
    /// inputs cancel the outstanding pass and start a new debounce period.
    /// Must be called from within a tokio runtime.
    pub async fn trigger(&self, files: Vec<FileEntry>, mode: ProcessingMode) -> TriggerSignature {
        let mut file_names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        file_names.sort();

        let mut state = self.shared.state.lock().await;
        if let Some(live) = &state.live {
            if live.same_inputs(&file_names, mode) {
                tracing::debug!(generation = live.generation, "Analysis inputs unchanged");
                return live.clone();
            }
        }

        state.generation += 1;
        let signature = TriggerSignature {
            generation: state.generation,
            file_names,
            mode,
        };
        state.live = Some(signature.clone());

        if let Some(previous) = state.pending.take() {
            previous.token.cancel();
            tracing::debug!(
                generation = signature.generation,
                "Outstanding analysis pass superseded"
            );
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_pass(
            Arc::clone(&self.shared),
            signature.clone(),
            files,
            token.clone(),
        ));
        state.pending = Some(PendingPass { token, handle });

        signature
    }

    /// Wait for the outstanding pass, if any, to finish or be discarded
    pub async fn settle(&self) {
        let pending = self.shared.state.lock().await.pending.take();
        if let Some(pending) = pending {
            if let Err(e) = pending.handle.await {
                tracing::warn!(error = %e, "Analysis pass task failed");
            }
        }
    }

    /// Cancel any outstanding pass and forget the live inputs
    pub async fn cancel(&self) {
        let mut state = self.shared.state.lock().await;
        if let Some(pending) = state.pending.take() {
            pending.token.cancel();
        }
        state.live = None;
    }

    /// Cancel any outstanding pass and forget committed results
    ///
    /// Used when the analysis inputs are invalidated, not just replaced.
    pub async fn reset(&self) {
        let mut state = self.shared.state.lock().await;
        if let Some(pending) = state.pending.take() {
            pending.token.cancel();
        }
        state.live = None;
        state.committed = None;
        state.results.clear();
    }

    /// Results of the last committed pass
    pub async fn results(&self) -> BTreeMap<String, AnalysisResult> {
        self.shared.state.lock().await.results.clone()
    }

    /// Signature of the last committed pass
    pub async fn committed_signature(&self) -> Option<TriggerSignature> {
        self.shared.state.lock().await.committed.clone()
    }

    /// Whether the committed results reflect the live inputs
    pub async fn is_current(&self) -> bool {
        let state = self.shared.state.lock().await;
        state.live.is_some() && state.live == state.committed
    }
}

impl Drop for ContentAnalysisScheduler {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.try_lock() {
            if let Some(pending) = state.pending.take() {
                pending.token.cancel();
            }
        }
    }
}

async fn run_pass(
    shared: Arc<Shared>,
    signature: TriggerSignature,
    files: Vec<FileEntry>,
    token: CancellationToken,
) {
    tokio::select! {
        _ = token.cancelled() => return,
        _ = tokio::time::sleep(shared.settings.debounce) => {}
    }

    tracing::debug!(
        generation = signature.generation,
        files = files.len(),
        mode = ?signature.mode,
        "Analysis pass started"
    );

    let results = match signature.mode {
        ProcessingMode::ForceOcr | ProcessingMode::ForceText => {
            let forced = signature.mode == ProcessingMode::ForceOcr;
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(shared.settings.min_visible_delay) => {}
            }
            files
                .iter()
                .map(|f| (f.name.clone(), AnalysisResult::decided(&f.name, forced)))
                .collect::<BTreeMap<_, _>>()
        }
        ProcessingMode::Automatic => {
            let mut results = BTreeMap::new();
            for file in &files {
                if token.is_cancelled() {
                    tracing::debug!(generation = signature.generation, "Analysis pass cancelled");
                    return;
                }
                let result = analyze_file(&shared, file).await;
                results.insert(file.name.clone(), result);
            }
            results
        }
    };

    let mut state = shared.state.lock().await;
    if state.live.as_ref() != Some(&signature) {
        tracing::debug!(generation = signature.generation, "Stale analysis results discarded");
        return;
    }

    let analyzed_files = results.len();
    let ocr_files = results.values().filter(|r| r.needs_ocr).count();
    state.results = results;
    state.committed = Some(signature.clone());
    drop(state);

    tracing::info!(
        generation = signature.generation,
        analyzed_files,
        ocr_files,
        "Analysis pass committed"
    );

    if let Some(bus) = &shared.event_bus {
        bus.emit_lossy(ImportEvent::ContentAnalysisCompleted {
            session_id: shared.session_id,
            analyzed_files,
            ocr_files,
            timestamp: chrono::Utc::now(),
        });
    }
}

/// Quality check first; density check only when quality passes.
/// Any collaborator error falls back to OCR.
async fn analyze_file(shared: &Shared, file: &FileEntry) -> AnalysisResult {
    let verdict = match shared.quality.assess(file).await {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::warn!(file = %file.name, error = %e, "Quality analysis failed, using OCR");
            return AnalysisResult::failed(&file.name, e.to_string());
        }
    };

    if verdict.needs_ocr {
        tracing::debug!(file = %file.name, score = ?verdict.score, "Low quality, OCR required");
        return AnalysisResult::decided(&file.name, true).with_quality_score(verdict.score);
    }

    match shared.extractor.extract(file).await {
        Ok(text) => {
            let needs_ocr = is_sparse(&text, &shared.settings);
            tracing::debug!(
                file = %file.name,
                text_length = text.text_length,
                page_count = text.page_count,
                needs_ocr,
                "Text density checked"
            );
            AnalysisResult::decided(&file.name, needs_ocr).with_quality_score(verdict.score)
        }
        Err(e) => {
            tracing::warn!(file = %file.name, error = %e, "Text extraction failed, using OCR");
            AnalysisResult::failed(&file.name, e.to_string()).with_quality_score(verdict.score)
        }
    }
}
