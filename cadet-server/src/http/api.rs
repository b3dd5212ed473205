//! REST API handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use cadet_core::{Annotation, AnnotationTask, ContactInfo, SessionId, SessionInfo};
use serde::{Deserialize, Serialize};

use crate::{AppState, ServerError};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Number of registered sessions
    pub active_sessions: usize,
}

/// Health check endpoint
///
/// Returns server status, version, uptime, and active session count.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let active_sessions = state.learner.session_count().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        active_sessions,
    })
}

/// Response for listing sessions
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionInfo>,
}

/// GET /api/sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    let sessions = state.learner.list_sessions().await;
    Json(SessionListResponse { sessions })
}

/// Body of a start request
#[derive(Debug, Serialize, Deserialize)]
pub struct StartRequest {
    pub task: AnnotationTask,
    /// Broker that receives this session's rankings
    pub contact: ContactInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub started: bool,
}

/// POST /api/sessions/:id/start
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, ServerError> {
    state
        .learner
        .start(SessionId::new(id), request.task, request.contact)
        .await?;
    Ok(Json(StartResponse { started: true }))
}

/// Body of an annotations request
#[derive(Debug, Serialize, Deserialize)]
pub struct AnnotationsRequest {
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnnotationsResponse {
    /// False if the session is not live
    pub accepted: bool,
}

/// POST /api/sessions/:id/annotations
pub async fn add_annotations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AnnotationsRequest>,
) -> Json<AnnotationsResponse> {
    let accepted = state
        .learner
        .add_annotations(&SessionId::new(id), request.annotations)
        .await;
    Json(AnnotationsResponse { accepted })
}

/// POST /api/sessions/:id/stop
///
/// Returns once the session's worker has exited. Unknown IDs are a no-op.
pub async fn stop_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.learner.stop(&SessionId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
