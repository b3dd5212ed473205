//! SessionRegistry for managing live learning sessions
//!
//! The registry maps session IDs to worker handles. `start` inserts the handle
//! before the worker finishes initializing so a racing `stop` always finds it;
//! `stop` joins the worker before removing the entry, so once it returns the
//! session can be started again and its old worker will deliver nothing more.
//! Joining and removal run on a spawned task, so a caller that stops waiting
//! still leaves the map consistent with the worker.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::state::SessionInfo;
use super::worker::{self, WorkerHandle, WorkerSettings};
use crate::clients::{ResultSink, SourceFetcher};
use crate::error::SessionError;
use crate::policy::PolicyFactory;
use crate::types::{Annotation, SessionId, SessionSpec};

type SessionMap = Arc<RwLock<HashMap<SessionId, Arc<WorkerHandle>>>>;

/// Owns every live session of one learner process
pub struct SessionRegistry {
    /// Live sessions indexed by ID
    sessions: SessionMap,
    /// Content source handed to every worker
    fetcher: Arc<dyn SourceFetcher>,
    settings: WorkerSettings,
}

impl SessionRegistry {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, settings: WorkerSettings) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            fetcher,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Start a session and wait until its worker is running
    ///
    /// Fails with `AlreadyExists` if the ID is live. If the worker cannot
    /// fetch its content or build its policy, the entry is removed again and
    /// the initialization error is returned.
    pub async fn start(
        &self,
        spec: SessionSpec,
        sink: Arc<dyn ResultSink>,
        policies: Arc<dyn PolicyFactory>,
    ) -> Result<(), SessionError> {
        let session_id = spec.id.clone();

        let (handle, ready) = {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&session_id) {
                warn!(session_id = %session_id, "Session already running; start ignored");
                return Err(SessionError::AlreadyExists(session_id));
            }
            let (handle, ready) =
                worker::spawn(spec, self.fetcher.clone(), sink, policies, self.settings.clone());
            sessions.insert(session_id.clone(), handle.clone());
            (handle, ready)
        };

        // Reaping a failed worker must finish even if this future is dropped
        let sessions = self.sessions.clone();
        let id = session_id.clone();
        let init = tokio::spawn(async move {
            let outcome = ready
                .await
                .unwrap_or_else(|_| Err(SessionError::WorkerExited(id.clone())));
            if let Err(e) = outcome {
                let reaped = reap(&sessions, &handle).await;
                return Err(reaped.err().unwrap_or(e));
            }
            Ok(())
        });
        join_detached(init, &session_id).await?;

        info!(session_id = %session_id, "Session started");
        Ok(())
    }

    /// Queue annotations for a session
    ///
    /// Returns `false` if no session with this ID is registered or its worker
    /// has already terminated.
    pub async fn add_annotations(
        &self,
        session_id: &SessionId,
        annotations: Vec<Annotation>,
    ) -> bool {
        let Some(handle) = self.get(session_id).await else {
            warn!(session_id = %session_id, "Annotations for unknown session dropped");
            return false;
        };
        if handle.state().is_terminal() {
            warn!(session_id = %session_id, "Annotations for terminated session dropped");
            return false;
        }

        for annotation in &annotations {
            debug!(
                session_id = %session_id,
                communication_id = %annotation.communication.id,
                "Annotation received"
            );
        }
        let pending = handle.add_annotations(annotations).await;
        debug!(session_id = %session_id, pending, "Annotations buffered");
        true
    }

    /// Stop a session and wait for its worker to exit
    ///
    /// Unknown IDs are a no-op. Concurrent calls for the same ID all return
    /// after the worker has exited.
    pub async fn stop(&self, session_id: &SessionId) -> Result<(), SessionError> {
        let Some(handle) = self.get(session_id).await else {
            warn!(session_id = %session_id, "Stop requested for unknown session");
            return Ok(());
        };

        info!(session_id = %session_id, "Stopping session");
        let sessions = self.sessions.clone();
        let stopping = tokio::spawn(async move { reap(&sessions, &handle).await });
        join_detached(stopping, session_id).await?;

        info!(session_id = %session_id, "Session stopped");
        Ok(())
    }

    /// Stop every live session
    ///
    /// All workers are cancelled first and then reaped concurrently. Returns
    /// the first panic observed, after every session has been removed.
    pub async fn shutdown_all(&self) -> Result<(), SessionError> {
        let handles: Vec<_> = self.sessions.read().await.values().cloned().collect();
        if handles.is_empty() {
            return Ok(());
        }

        info!(sessions = handles.len(), "Stopping all sessions");
        for handle in &handles {
            handle.request_stop();
        }

        let reapers: Vec<_> = handles
            .into_iter()
            .map(|handle| {
                let sessions = self.sessions.clone();
                let id = handle.session_id().clone();
                (id, tokio::spawn(async move { reap(&sessions, &handle).await }))
            })
            .collect();

        let mut first_error = None;
        for (id, reaper) in reapers {
            if let Err(e) = join_detached(reaper, &id).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn get(&self, session_id: &SessionId) -> Option<Arc<WorkerHandle>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Get the number of registered sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Snapshot every registered session, oldest first
    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let handles: Vec<_> = self.sessions.read().await.values().cloned().collect();

        let mut infos = Vec::with_capacity(handles.len());
        for handle in handles {
            infos.push(handle.info().await);
        }
        infos.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        infos
    }
}

/// Join a worker, then drop its entry if the map still points at it
async fn reap(sessions: &SessionMap, handle: &Arc<WorkerHandle>) -> Result<(), SessionError> {
    let joined = handle.stop_and_join().await;

    let session_id = handle.session_id();
    let mut sessions = sessions.write().await;
    let is_current = sessions
        .get(session_id)
        .is_some_and(|current| Arc::ptr_eq(current, handle));
    if is_current {
        sessions.remove(session_id);
    }
    joined
}

async fn join_detached(
    task: JoinHandle<Result<(), SessionError>>,
    session_id: &SessionId,
) -> Result<(), SessionError> {
    task.await.unwrap_or_else(|e| {
        error!(session_id = %session_id, error = %e, "Session reaper failed");
        Err(SessionError::WorkerPanicked(session_id.clone()))
    })
}
