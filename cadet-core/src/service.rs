//! LearnerService: the request-facing facade over the session registry
//!
//! Binds a registry to the content fetcher, the sink factory that reaches each
//! session's broker, and the policy factory, so callers only pass what a
//! start/annotate/stop request carries.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::clients::{SinkFactory, SourceFetcher};
use crate::error::SessionError;
use crate::policy::PolicyFactory;
use crate::session::{SessionInfo, SessionRegistry, WakeStrategy, WorkerSettings};
use crate::types::{Annotation, AnnotationTask, ContactInfo, SessionId, SessionSpec};

/// Learner tuning shared by every session
#[derive(Debug, Clone, PartialEq)]
pub struct LearnerConfig {
    /// Buffered annotations that trigger a retrain
    pub retrain_threshold: usize,
    /// How often an idle worker re-checks its buffer
    pub poll_interval: Duration,
    pub wake: WakeStrategy,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            retrain_threshold: 10,
            poll_interval: Duration::from_millis(100),
            wake: WakeStrategy::Poll,
        }
    }
}

pub struct LearnerService {
    config: LearnerConfig,
    registry: SessionRegistry,
    sinks: Arc<dyn SinkFactory>,
    policies: Arc<dyn PolicyFactory>,
}

impl LearnerService {
    pub fn new(
        config: LearnerConfig,
        fetcher: Arc<dyn SourceFetcher>,
        sinks: Arc<dyn SinkFactory>,
        policies: Arc<dyn PolicyFactory>,
    ) -> Self {
        let settings = WorkerSettings {
            poll_interval: config.poll_interval,
            wake: config.wake,
        };
        Self {
            registry: SessionRegistry::new(fetcher, settings),
            config,
            sinks,
            policies,
        }
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Start learning for a session whose rankings go to `contact`
    pub async fn start(
        &self,
        session_id: SessionId,
        task: AnnotationTask,
        contact: ContactInfo,
    ) -> Result<(), SessionError> {
        info!(
            session_id = %session_id,
            units = task.units.len(),
            host = %contact.host,
            port = contact.port,
            "Start requested"
        );

        let sink = self.sinks.create(&contact);
        let spec = SessionSpec::new(session_id, task, contact, self.config.retrain_threshold);
        self.registry.start(spec, sink, self.policies.clone()).await
    }

    /// Returns `false` if the session is not live
    pub async fn add_annotations(
        &self,
        session_id: &SessionId,
        annotations: Vec<Annotation>,
    ) -> bool {
        self.registry.add_annotations(session_id, annotations).await
    }

    pub async fn stop(&self, session_id: &SessionId) -> Result<(), SessionError> {
        self.registry.stop(session_id).await
    }

    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        self.registry.list_sessions().await
    }

    pub async fn session_count(&self) -> usize {
        self.registry.session_count().await
    }

    pub async fn shutdown_all(&self) -> Result<(), SessionError> {
        self.registry.shutdown_all().await
    }
}
