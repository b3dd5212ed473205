//! Shared application state for the cadet server

use std::sync::Arc;

use cadet_core::LearnerService;
use chrono::{DateTime, Utc};

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Learner service owning every live session
    pub learner: Arc<LearnerService>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(learner: Arc<LearnerService>) -> Self {
        Self {
            learner,
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
