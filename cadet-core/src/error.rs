//! Error types for cadet-core

use thiserror::Error;

use crate::types::SessionId;

/// Errors related to session management
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session already exists: {0}")]
    AlreadyExists(SessionId),

    #[error("Failed to fetch communications for session {session_id}: {source}")]
    Fetch {
        session_id: SessionId,
        #[source]
        source: ClientError,
    },

    #[error("Fetch service returned no content for {missing:?} in session {session_id}")]
    IncompleteFetch {
        session_id: SessionId,
        missing: Vec<String>,
    },

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Worker for session {0} exited before it was ready")]
    WorkerExited(SessionId),

    #[error("Worker for session {0} panicked")]
    WorkerPanicked(SessionId),
}

/// Errors raised by ranking policies
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Failed to create policy: {0}")]
    Init(String),

    #[error("Training failed: {0}")]
    Train(String),

    #[error("Ranking failed: {0}")]
    Rank(String),

    #[error("Failed to ingest annotations: {0}")]
    Ingest(String),
}

/// Errors from the fetch service and broker clients
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid ranking: {0}")]
    InvalidRanking(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_already_exists_displays_correctly() {
        let error = SessionError::AlreadyExists(SessionId::new("dup"));
        assert!(error.to_string().contains("already exists"));
    }

    #[test]
    fn fetch_error_keeps_source() {
        let error = SessionError::Fetch {
            session_id: SessionId::new("s1"),
            source: ClientError::Unavailable("connection refused".to_string()),
        };
        assert!(error.to_string().contains("s1"));
        assert!(error.to_string().contains("connection refused"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn incomplete_fetch_lists_missing_ids() {
        let error = SessionError::IncompleteFetch {
            session_id: SessionId::new("s1"),
            missing: vec!["doc-9".to_string()],
        };
        assert!(error.to_string().contains("doc-9"));
    }

    #[test]
    fn session_error_converts_from_policy_error() {
        let error: SessionError = PolicyError::Init("no model".to_string()).into();
        assert!(matches!(error, SessionError::Policy(PolicyError::Init(_))));
    }

    #[test]
    fn client_error_status_displays_url_and_code() {
        let error = ClientError::Status {
            url: "http://fetch/fetch".to_string(),
            status: 503,
        };
        assert!(error.to_string().contains("503"));
        assert!(error.to_string().contains("http://fetch/fetch"));
    }
}
