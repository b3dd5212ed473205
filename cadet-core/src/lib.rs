//! cadet-core: Core library for the cadet-learn active learning server
//!
//! This crate provides the session lifecycle machinery behind the server:
//!
//! - **Session registry** - [`SessionRegistry`] maps session IDs to running workers
//! - **Session workers** - one tokio task per session that buffers annotations,
//!   retrains the ranking policy and publishes new orderings
//! - **Ranking policies** - the [`RankingPolicy`] trait integrators implement, plus
//!   [`RandomPolicy`] and scripted mocks
//! - **Downstream clients** - [`SourceFetcher`] and [`ResultSink`] with HTTP
//!   implementations for the fetch service and the broker
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use cadet_core::{
//!     AnnotationTask, AnnotationUnitIdentifier, BrokerClientFactory, ContactInfo, FetchClient,
//!     LearnerConfig, LearnerService, RandomPolicyFactory, SessionId,
//! };
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = LearnerService::new(
//!         LearnerConfig::default(),
//!         Arc::new(FetchClient::new("http://localhost:9090")),
//!         Arc::new(BrokerClientFactory::new()),
//!         Arc::new(RandomPolicyFactory::new()),
//!     );
//!
//!     let task = AnnotationTask::new(vec![AnnotationUnitIdentifier::new("doc-1")]);
//!     let contact = ContactInfo::new("localhost", 9091);
//!     let id = SessionId::new_v4();
//!
//!     service.start(id.clone(), task, contact).await?;
//!     service.stop(&id).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    SessionRegistry                        │
//! │   id ──► WorkerHandle (buffer, cancel token, state)       │
//! └──────────────┬───────────────────────────────────────────┘
//!                │ spawn / stop + join
//!                ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                SessionWorker (tokio task)                 │
//! │  SourceFetcher ──► RankingPolicy ──► ResultSink           │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod clients;
pub mod error;
pub mod policy;
pub mod service;
pub mod session;
pub mod types;

// Re-export key types for convenience
pub use clients::{
    BrokerClient, BrokerClientFactory, Delivery, FetchClient, MockFetcher, MockSinkFactory,
    RecordingSink, ResultSink, SinkFactory, SourceFetcher,
};
pub use error::{ClientError, PolicyError, SessionError};
pub use policy::{
    MockPolicy, MockPolicyFactory, PolicyCall, PolicyCallLog, PolicyContext, PolicyFactory,
    RandomPolicy, RandomPolicyFactory, RankingPolicy, SlowMockPolicyFactory,
};
pub use service::{LearnerConfig, LearnerService};
pub use session::{
    FeedbackBuffer, SessionInfo, SessionRegistry, WakeStrategy, WorkerHandle, WorkerSettings,
    WorkerState,
};
pub use types::{
    Annotation, AnnotationTask, AnnotationUnitIdentifier, Communication, ContactInfo, Ranking,
    SessionId, SessionSpec,
};
