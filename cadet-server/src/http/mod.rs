//! HTTP server module

mod api;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub use api::{
    AnnotationsRequest, AnnotationsResponse, HealthResponse, SessionListResponse, StartRequest,
    StartResponse,
};

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/sessions", get(api::list_sessions))
        .route("/api/sessions/:id/start", post(api::start_session))
        .route("/api/sessions/:id/annotations", post(api::add_annotations))
        .route("/api/sessions/:id/stop", post(api::stop_session))
        .with_state(state)
}
