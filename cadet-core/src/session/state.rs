//! Worker state machine and session snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Lifecycle state of a session worker
///
/// ```text
/// Created ──► Running ──► Stopping ──► Terminated
///    └────────────────────────────────────▲
///              (initialization failed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Spawned, fetching content and building the policy
    Created,
    /// Accepting annotations and retraining
    Running,
    /// Cancellation observed, leaving the loop
    Stopping,
    /// Exited; never changes again
    Terminated,
}

impl WorkerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Terminated)
    }

    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Created, Running) | (Created, Terminated) | (Running, Stopping) | (Stopping, Terminated)
        )
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Created => "created",
            WorkerState::Running => "running",
            WorkerState::Stopping => "stopping",
            WorkerState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of one registered session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub state: WorkerState,
    pub units: usize,
    pub pending_annotations: usize,
    pub retrain_threshold: usize,
    pub started_at: DateTime<Utc>,
    /// Why the worker terminated on its own, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(WorkerState::Created.can_transition_to(WorkerState::Running));
        assert!(WorkerState::Running.can_transition_to(WorkerState::Stopping));
        assert!(WorkerState::Stopping.can_transition_to(WorkerState::Terminated));
    }

    #[test]
    fn failed_initialization_may_terminate_directly() {
        assert!(WorkerState::Created.can_transition_to(WorkerState::Terminated));
    }

    #[test]
    fn skipping_or_reversing_is_rejected() {
        assert!(!WorkerState::Running.can_transition_to(WorkerState::Terminated));
        assert!(!WorkerState::Running.can_transition_to(WorkerState::Created));
        assert!(!WorkerState::Stopping.can_transition_to(WorkerState::Running));
        assert!(!WorkerState::Created.can_transition_to(WorkerState::Stopping));
    }

    #[test]
    fn terminated_is_final() {
        for next in [
            WorkerState::Created,
            WorkerState::Running,
            WorkerState::Stopping,
            WorkerState::Terminated,
        ] {
            assert!(!WorkerState::Terminated.can_transition_to(next));
        }
        assert!(WorkerState::Terminated.is_terminal());
        assert!(!WorkerState::Stopping.is_terminal());
    }

    #[test]
    fn state_serializes_snake_case() {
        let json = serde_json::to_string(&WorkerState::Running).unwrap();
        assert_eq!(json, "\"running\"");
        assert_eq!(WorkerState::Stopping.to_string(), "stopping");
    }
}
