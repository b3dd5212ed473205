//! Server error types

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cadet_core::SessionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the cadet server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A session operation failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::Session(SessionError::AlreadyExists(_)) => {
                (StatusCode::CONFLICT, "ALREADY_EXISTS")
            }
            ServerError::Session(SessionError::Fetch { .. })
            | ServerError::Session(SessionError::IncompleteFetch { .. }) => {
                (StatusCode::BAD_GATEWAY, "FETCH_FAILED")
            }
            ServerError::Session(SessionError::Policy(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "POLICY_ERROR")
            }
            ServerError::Session(_) | ServerError::Bind { .. } | ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
