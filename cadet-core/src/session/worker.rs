//! Per-session worker task
//!
//! A worker owns one session's policy. It fetches the session's content,
//! builds the policy, publishes an initial ranking, then retrains whenever the
//! feedback buffer reaches its threshold. The registry talks to it only
//! through a [`WorkerHandle`].

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::buffer::FeedbackBuffer;
use super::state::{SessionInfo, WorkerState};
use crate::clients::{ResultSink, SourceFetcher};
use crate::error::{PolicyError, SessionError};
use crate::policy::{PolicyContext, PolicyFactory, RankingPolicy};
use crate::types::{Annotation, Ranking, SessionId, SessionSpec};

/// How an idle worker notices new feedback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WakeStrategy {
    /// Re-check the buffer every poll interval
    #[default]
    Poll,
    /// Also wake as soon as an append reaches the threshold
    Notify,
}

/// Settings shared by every worker a registry spawns
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub poll_interval: Duration,
    pub wake: WakeStrategy,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            wake: WakeStrategy::Poll,
        }
    }
}

/// Registry-side handle to a running worker
pub struct WorkerHandle {
    session_id: SessionId,
    buffer: Arc<FeedbackBuffer>,
    cancel: CancellationToken,
    state_rx: watch::Receiver<WorkerState>,
    join: Mutex<Option<JoinHandle<()>>>,
    failure: Arc<OnceLock<String>>,
    unit_count: usize,
    started_at: DateTime<Utc>,
}

impl WorkerHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn state(&self) -> WorkerState {
        *self.state_rx.borrow()
    }

    /// Buffer annotations for the next retrain, returning the pending count
    pub async fn add_annotations(&self, annotations: Vec<Annotation>) -> usize {
        self.buffer.append(annotations).await
    }

    pub async fn pending(&self) -> usize {
        self.buffer.len().await
    }

    /// Reason the worker terminated on its own, if it did
    pub fn failure(&self) -> Option<String> {
        self.failure.get().cloned()
    }

    pub async fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.session_id.clone(),
            state: self.state(),
            units: self.unit_count,
            pending_annotations: self.pending().await,
            retrain_threshold: self.buffer.threshold(),
            started_at: self.started_at,
            failure: self.failure(),
        }
    }

    /// Ask the worker to stop without waiting for it
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    /// Wait until the worker reaches `state` or exits
    pub async fn wait_for_state(&self, state: WorkerState) -> WorkerState {
        let mut rx = self.state_rx.clone();
        let result = rx
            .wait_for(|current| *current == state || current.is_terminal())
            .await
            .map(|current| *current);
        result.unwrap_or_else(|_| self.state())
    }

    /// Cancel the worker and wait until its task has exited
    ///
    /// The first caller joins the task; concurrent callers wait for the
    /// state channel to report `Terminated` or close.
    pub async fn stop_and_join(&self) -> Result<(), SessionError> {
        self.cancel.cancel();

        let join = self.join.lock().await.take();
        match join {
            Some(task) => match task.await {
                Ok(()) => Ok(()),
                Err(e) if e.is_panic() => {
                    error!(session_id = %self.session_id, "Session worker panicked");
                    Err(SessionError::WorkerPanicked(self.session_id.clone()))
                }
                Err(e) => {
                    warn!(session_id = %self.session_id, error = %e, "Session worker was aborted");
                    Ok(())
                }
            },
            None => {
                self.wait_for_state(WorkerState::Terminated).await;
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .field("unit_count", &self.unit_count)
            .finish_non_exhaustive()
    }
}

/// Outcome of initialization, reported back to the caller of `start`
pub(crate) type ReadyReceiver = oneshot::Receiver<Result<(), SessionError>>;

/// Spawn a worker for `spec` and return its handle
///
/// The receiver resolves once the worker is `Running` or has failed to
/// initialize. Must be called from within a tokio runtime.
pub(crate) fn spawn(
    spec: SessionSpec,
    fetcher: Arc<dyn SourceFetcher>,
    sink: Arc<dyn ResultSink>,
    policies: Arc<dyn PolicyFactory>,
    settings: WorkerSettings,
) -> (Arc<WorkerHandle>, ReadyReceiver) {
    let buffer = Arc::new(FeedbackBuffer::new(spec.retrain_threshold));
    let cancel = CancellationToken::new();
    let (state_tx, state_rx) = watch::channel(WorkerState::Created);
    let failure = Arc::new(OnceLock::new());
    let (ready_tx, ready_rx) = oneshot::channel();

    let session_id = spec.id.clone();
    let unit_count = spec.task.units.len();

    let worker = SessionWorker {
        spec,
        fetcher,
        sink,
        policies,
        settings,
        buffer: buffer.clone(),
        cancel: cancel.clone(),
        state_tx,
        failure: failure.clone(),
    };
    let task = tokio::spawn(worker.run(ready_tx));

    let handle = WorkerHandle {
        session_id,
        buffer,
        cancel,
        state_rx,
        join: Mutex::new(Some(task)),
        failure,
        unit_count,
        started_at: Utc::now(),
    };
    (Arc::new(handle), ready_rx)
}

struct SessionWorker {
    spec: SessionSpec,
    fetcher: Arc<dyn SourceFetcher>,
    sink: Arc<dyn ResultSink>,
    policies: Arc<dyn PolicyFactory>,
    settings: WorkerSettings,
    buffer: Arc<FeedbackBuffer>,
    cancel: CancellationToken,
    state_tx: watch::Sender<WorkerState>,
    failure: Arc<OnceLock<String>>,
}

impl SessionWorker {
    async fn run(self, ready: oneshot::Sender<Result<(), SessionError>>) {
        let session_id = self.spec.id.clone();

        let mut policy = match self.initialize().await {
            Ok(policy) => policy,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Session failed to initialize");
                let _ = self.failure.set(e.to_string());
                self.transition(WorkerState::Terminated);
                let _ = ready.send(Err(e));
                return;
            }
        };

        self.transition(WorkerState::Running);
        let _ = ready.send(Ok(()));
        info!(
            session_id = %session_id,
            units = self.spec.task.units.len(),
            retrain_threshold = self.buffer.threshold(),
            "Session worker running"
        );

        let outcome = self.run_loop(policy.as_mut()).await;
        if let Err(e) = outcome {
            error!(session_id = %session_id, error = %e, "Ranking policy failed; session worker exiting");
            let _ = self.failure.set(e.to_string());
        }

        self.transition(WorkerState::Stopping);
        drop(policy);
        self.transition(WorkerState::Terminated);
        info!(session_id = %session_id, "Session worker stopped");
    }

    async fn initialize(&self) -> Result<Box<dyn RankingPolicy>, SessionError> {
        let session_id = &self.spec.id;
        let ids = self.spec.task.communication_ids();
        debug!(session_id = %session_id, communications = ids.len(), "Fetching communications");

        let communications =
            self.fetcher
                .fetch(&ids)
                .await
                .map_err(|source| SessionError::Fetch {
                    session_id: session_id.clone(),
                    source,
                })?;

        let fetched: HashSet<&str> = communications.iter().map(|c| c.id.as_str()).collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !fetched.contains(id.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(SessionError::IncompleteFetch {
                session_id: session_id.clone(),
                missing,
            });
        }

        let context = PolicyContext {
            session_id: session_id.clone(),
            units: self.spec.task.units.clone(),
            language: self.spec.task.language.clone(),
            communications,
            fetcher: self.fetcher.clone(),
        };
        Ok(self.policies.create(context)?)
    }

    async fn run_loop(&self, policy: &mut dyn RankingPolicy) -> Result<(), PolicyError> {
        let ranking = policy.rank().await?;
        self.publish(ranking).await;

        while !self.cancel.is_cancelled() {
            if let Some(batch) = self.buffer.take_if_ready().await {
                debug!(session_id = %self.spec.id, annotations = batch.len(), "Retraining");
                policy.add_annotations(batch).await?;
                policy.train().await?;
                let ranking = policy.rank().await?;
                self.publish(ranking).await;
                continue;
            }
            self.wait().await;
        }

        debug!(session_id = %self.spec.id, "Cancellation observed");
        Ok(())
    }

    /// Sleep until the next buffer check or cancellation
    async fn wait(&self) {
        let tick = tokio::time::sleep(self.settings.poll_interval);
        match self.settings.wake {
            WakeStrategy::Poll => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tick => {}
                }
            }
            WakeStrategy::Notify => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = self.buffer.threshold_reached() => {}
                    _ = tick => {}
                }
            }
        }
    }

    async fn publish(&self, ranking: Option<Ranking>) {
        let session_id = &self.spec.id;
        let ranking = match ranking {
            Some(ranking) if !ranking.is_empty() => ranking,
            _ => {
                debug!(session_id = %session_id, "Policy produced no ranking; nothing to deliver");
                return;
            }
        };

        if self.cancel.is_cancelled() {
            debug!(session_id = %session_id, "Session stopping; ranking dropped");
            return;
        }

        let expected = self.spec.task.units.len();
        if ranking.len() != expected {
            warn!(
                session_id = %session_id,
                ranked = ranking.len(),
                expected,
                "Ranking does not cover every unit"
            );
        }

        match self.sink.deliver(session_id, &ranking).await {
            Ok(()) => debug!(session_id = %session_id, units = ranking.len(), "Ranking delivered"),
            Err(e) => error!(session_id = %session_id, error = %e, "Failed to deliver ranking"),
        }
    }

    fn transition(&self, next: WorkerState) {
        let session_id = &self.spec.id;
        self.state_tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                debug!(session_id = %session_id, from = %state, to = %next, "Worker state changed");
                *state = next;
                true
            } else {
                warn!(session_id = %session_id, from = %state, to = %next, "Ignoring invalid state transition");
                false
            }
        });
    }
}
