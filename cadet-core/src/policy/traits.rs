//! RankingPolicy trait and related types
//!
//! A policy orders the annotation units of one session and learns from the
//! annotations users submit. The session worker owns its policy exclusively,
//! so no two calls on the same policy ever overlap.

use std::sync::Arc;

use async_trait::async_trait;

use crate::clients::SourceFetcher;
use crate::error::PolicyError;
use crate::types::{Annotation, AnnotationUnitIdentifier, Communication, Ranking, SessionId};

/// Everything a policy is bound to when it is created
pub struct PolicyContext {
    pub session_id: SessionId,
    /// Units to rank, in the order the broker sent them
    pub units: Vec<AnnotationUnitIdentifier>,
    pub language: Option<String>,
    /// Content of every communication referenced by `units`
    pub communications: Vec<Communication>,
    /// Handle for fetching content again on demand
    pub fetcher: Arc<dyn SourceFetcher>,
}

/// Trait for pluggable active learning policies
///
/// `rank` is called once when the session starts, before any training,
/// and once after every `train`. Returning `None` (or an empty ranking)
/// keeps the current order and nothing is sent to the broker.
#[async_trait]
pub trait RankingPolicy: Send {
    /// Absorb a batch of annotations provided by users
    async fn add_annotations(&mut self, annotations: Vec<Annotation>) -> Result<(), PolicyError>;

    /// Retrain on the annotations added since the last call
    async fn train(&mut self) -> Result<(), PolicyError>;

    /// Produce an ordering of every unit of the session
    async fn rank(&mut self) -> Result<Option<Ranking>, PolicyError>;
}

/// Factory for creating ranking policies
///
/// Enables dependency injection of policy implementations.
pub trait PolicyFactory: Send + Sync {
    /// Create a policy bound to one session
    fn create(&self, context: PolicyContext) -> Result<Box<dyn RankingPolicy>, PolicyError>;
}
