//! docimp-ie library interface
//!
//! Document import engine: wizard state machine, intake validation,
//! duplicate detection and resolution, adaptive content analysis and job
//! submission, served over HTTP + SSE.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod wizard;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use docimp_common::events::EventBus;

use crate::services::{ImportOrchestrator, SessionServices};

/// Live import sessions by id
pub type SessionMap = Arc<RwLock<HashMap<Uuid, Arc<Mutex<ImportOrchestrator>>>>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (document index)
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting and job hand-off
    pub event_bus: EventBus,
    /// Collaborators every new session is wired to
    pub services: SessionServices,
    /// Open import sessions
    pub sessions: SessionMap,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, services: SessionServices) -> Self {
        Self {
            db,
            event_bus: services.event_bus.clone(),
            services,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
        }
    }

    /// Session handle, if the session is open
    pub async fn session(&self, id: Uuid) -> Option<Arc<Mutex<ImportOrchestrator>>> {
        self.sessions.read().await.get(&id).cloned()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::session_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
