//! Import session API handlers
//!
//! One orchestrator per session, held in `AppState::sessions`. A session is
//! removed when it finishes (job emitted) or is abandoned.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        AnalysisResult, FileCategory, FileEntry, FinalizedJob, ProcessingMode,
        ResolutionDecision, WizardDataPatch, WizardState,
    },
    services::{ImportOrchestrator, IntakeSummary, TriggerSignature},
    AppState,
};

/// POST /import/sessions request
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub target_location: String,
}

/// Wizard snapshot plus navigation hints
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub target_location: String,
    pub state: WizardState,
    pub next_step: Option<usize>,
    pub previous_step: Option<usize>,
    pub requires_adaptive_options: bool,
}

impl SessionView {
    fn of(session: &ImportOrchestrator) -> Self {
        let wizard = session.wizard();
        Self {
            session_id: session.session_id(),
            target_location: session.target_location().to_string(),
            state: wizard.snapshot(),
            next_step: wizard.next_step(),
            previous_step: wizard.previous_step(),
            requires_adaptive_options: wizard.requires_adaptive_options(),
        }
    }
}

/// Step index body for /step and /navigate
#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: FileCategory,
}

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ResolutionRequest {
    pub decisions: Vec<ResolutionDecision>,
}

#[derive(Debug, Serialize)]
pub struct ResolutionResponse {
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessingModeRequest {
    pub mode: ProcessingMode,
}

#[derive(Debug, Serialize)]
pub struct ProcessingModeResponse {
    pub signature: TriggerSignature,
    pub eligible_files: usize,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub results: BTreeMap<String, AnalysisResult>,
    pub ocr_files: Vec<String>,
    /// Results reflect the current files and mode
    pub current: bool,
}

#[derive(Debug, Deserialize)]
pub struct FinishRequest {
    #[serde(default)]
    pub quick: bool,
}

#[derive(Debug, Serialize)]
pub struct AbandonResponse {
    pub session_id: Uuid,
    pub abandoned: bool,
}

async fn find_session(state: &AppState, id: Uuid) -> ApiResult<Arc<Mutex<ImportOrchestrator>>> {
    state
        .session(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Import session not found: {}", id)))
}

fn check_index(session: &ImportOrchestrator, index: usize) -> ApiResult<()> {
    let count = session.wizard().step_count();
    if index >= count {
        return Err(ApiError::BadRequest(format!(
            "Step index {} out of range (0..{})",
            index, count
        )));
    }
    Ok(())
}

/// POST /import/sessions
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    if request.target_location.trim().is_empty() {
        return Err(ApiError::BadRequest("target_location is required".to_string()));
    }

    let session = ImportOrchestrator::start(&state.services, request.target_location);
    let view = SessionView::of(&session);
    state
        .sessions
        .write()
        .await
        .insert(view.session_id, Arc::new(Mutex::new(session)));

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /import/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    let session = find_session(&state, id).await?;
    let session = session.lock().await;
    Ok(Json(SessionView::of(&session)))
}

/// DELETE /import/sessions/:id
pub async fn abandon_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AbandonResponse>> {
    let session = state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Import session not found: {}", id)))?;

    // waits for any in-flight request on the session
    session.lock().await.abandon().await;

    Ok(Json(AbandonResponse {
        session_id: id,
        abandoned: true,
    }))
}

/// POST /import/sessions/:id/step
pub async fn set_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StepRequest>,
) -> ApiResult<Json<SessionView>> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    check_index(&session, request.index)?;
    session.wizard_mut().set_step(request.index);
    Ok(Json(SessionView::of(&session)))
}

/// POST /import/sessions/:id/navigate
pub async fn navigate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StepRequest>,
) -> ApiResult<Json<SessionView>> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    check_index(&session, request.index)?;
    session.wizard_mut().navigate_to(request.index);
    Ok(Json(SessionView::of(&session)))
}

/// POST /import/sessions/:id/return
pub async fn return_to_original(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    session.wizard_mut().return_to_original();
    Ok(Json(SessionView::of(&session)))
}

/// POST /import/sessions/:id/advance
pub async fn advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    if session.wizard_mut().advance().is_none() {
        return Err(ApiError::BadRequest("Already on the last step".to_string()));
    }
    Ok(Json(SessionView::of(&session)))
}

/// POST /import/sessions/:id/data
///
/// File lists and resolution tags only change through intake/resolutions.
pub async fn merge_data(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<WizardDataPatch>,
) -> ApiResult<Json<SessionView>> {
    if patch.files.is_some() || patch.replace_tags.is_some() || patch.import_anyway_tags.is_some()
    {
        return Err(ApiError::BadRequest(
            "Files are set through /files and /resolutions".to_string(),
        ));
    }
    if patch.category.is_some() || patch.processing_mode.is_some() {
        return Err(ApiError::BadRequest(
            "Category and processing mode have dedicated routes".to_string(),
        ));
    }

    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    session.wizard_mut().merge_data(patch);
    Ok(Json(SessionView::of(&session)))
}

/// POST /import/sessions/:id/category
pub async fn select_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CategoryRequest>,
) -> ApiResult<Json<SessionView>> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    session.select_category(request.category).await;
    Ok(Json(SessionView::of(&session)))
}

/// POST /import/sessions/:id/files
pub async fn intake(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<IntakeRequest>,
) -> ApiResult<Json<IntakeSummary>> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    let summary = session.intake(request.files).await?;
    Ok(Json(summary))
}

/// POST /import/sessions/:id/resolutions
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolutionRequest>,
) -> ApiResult<Json<ResolutionResponse>> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    let files = session.resolve(&request.decisions).await?;
    Ok(Json(ResolutionResponse { files }))
}

/// POST /import/sessions/:id/processing-mode
pub async fn set_processing_mode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ProcessingModeRequest>,
) -> ApiResult<Json<ProcessingModeResponse>> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    if !session.wizard().requires_adaptive_options() {
        return Err(ApiError::BadRequest(
            "Selected category has no adaptive processing".to_string(),
        ));
    }

    let signature = session.set_processing_mode(request.mode).await;
    Ok(Json(ProcessingModeResponse {
        eligible_files: signature.file_names.len(),
        signature,
    }))
}

/// GET /import/sessions/:id/analysis
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnalysisResponse>> {
    let session = find_session(&state, id).await?;
    let session = session.lock().await;
    Ok(Json(AnalysisResponse {
        results: session.analysis().await,
        ocr_files: session.ocr_files().await,
        current: session.analysis_is_current().await,
    }))
}

/// POST /import/sessions/:id/finish
///
/// A finished session is closed; its job went out on the event bus.
pub async fn finish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<FinishRequest>,
) -> ApiResult<Json<FinalizedJob>> {
    let session = find_session(&state, id).await?;
    let job = {
        let mut session = session.lock().await;
        if request.quick {
            session.quick_finish().await?
        } else {
            session.full_finish().await?
        }
    };

    state.sessions.write().await.remove(&id);
    Ok(Json(job))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/import/sessions", post(create_session))
        .route(
            "/import/sessions/:id",
            get(get_session).delete(abandon_session),
        )
        .route("/import/sessions/:id/step", post(set_step))
        .route("/import/sessions/:id/navigate", post(navigate))
        .route("/import/sessions/:id/return", post(return_to_original))
        .route("/import/sessions/:id/advance", post(advance))
        .route("/import/sessions/:id/data", post(merge_data))
        .route("/import/sessions/:id/category", post(select_category))
        .route("/import/sessions/:id/files", post(intake))
        .route("/import/sessions/:id/resolutions", post(resolve))
        .route("/import/sessions/:id/processing-mode", post(set_processing_mode))
        .route("/import/sessions/:id/analysis", get(get_analysis))
        .route("/import/sessions/:id/finish", post(finish))
}
