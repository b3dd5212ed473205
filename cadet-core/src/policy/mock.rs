//! Mock policy for testing
//!
//! MockPolicy replays scripted rankings and records every call it receives
//! into a shared [`PolicyCallLog`], enabling fast, deterministic tests of the
//! session worker.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::traits::{PolicyContext, PolicyFactory, RankingPolicy};
use crate::error::PolicyError;
use crate::types::{Annotation, AnnotationUnitIdentifier, Ranking, SessionId};

/// One call observed by a mock policy
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyCall {
    Created {
        session_id: SessionId,
        units: usize,
        communications: usize,
        language: Option<String>,
    },
    AddAnnotations(Vec<Annotation>),
    Train,
    Rank,
}

/// Shared, ordered record of policy calls
#[derive(Debug, Clone, Default)]
pub struct PolicyCallLog {
    calls: Arc<Mutex<Vec<PolicyCall>>>,
}

impl PolicyCallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: PolicyCall) {
        self.lock().push(call);
    }

    pub fn calls(&self) -> Vec<PolicyCall> {
        self.lock().clone()
    }

    /// Annotation batches in the order they were ingested
    pub fn ingested(&self) -> Vec<Vec<Annotation>> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                PolicyCall::AddAnnotations(batch) => Some(batch.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn train_count(&self) -> usize {
        self.count(|call| matches!(call, PolicyCall::Train))
    }

    pub fn rank_count(&self) -> usize {
        self.count(|call| matches!(call, PolicyCall::Rank))
    }

    pub fn created_count(&self) -> usize {
        self.count(|call| matches!(call, PolicyCall::Created { .. }))
    }

    fn count(&self, predicate: impl Fn(&PolicyCall) -> bool) -> usize {
        self.lock().iter().filter(|c| predicate(c)).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PolicyCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scripted implementation of RankingPolicy
///
/// Each `rank()` pops the next queued result. Once the queue is empty it
/// returns the units in reverse of their current order, so consecutive
/// rankings are distinguishable.
pub struct MockPolicy {
    units: Vec<AnnotationUnitIdentifier>,
    rankings: VecDeque<Option<Ranking>>,
    log: PolicyCallLog,
    fail_train: bool,
}

impl MockPolicy {
    pub fn new(units: Vec<AnnotationUnitIdentifier>, log: PolicyCallLog) -> Self {
        Self {
            units,
            rankings: VecDeque::new(),
            log,
            fail_train: false,
        }
    }

    /// Queue a result for the next `rank()` call
    pub fn queue_ranking(&mut self, ranking: Option<Ranking>) {
        self.rankings.push_back(ranking);
    }

    /// Make every `train()` call fail
    pub fn fail_train(&mut self) {
        self.fail_train = true;
    }

    pub fn queued_ranking_count(&self) -> usize {
        self.rankings.len()
    }
}

#[async_trait]
impl RankingPolicy for MockPolicy {
    async fn add_annotations(&mut self, annotations: Vec<Annotation>) -> Result<(), PolicyError> {
        self.log.record(PolicyCall::AddAnnotations(annotations));
        Ok(())
    }

    async fn train(&mut self) -> Result<(), PolicyError> {
        self.log.record(PolicyCall::Train);
        if self.fail_train {
            return Err(PolicyError::Train("scripted failure".to_string()));
        }
        Ok(())
    }

    async fn rank(&mut self) -> Result<Option<Ranking>, PolicyError> {
        self.log.record(PolicyCall::Rank);
        if let Some(ranking) = self.rankings.pop_front() {
            return Ok(ranking);
        }
        self.units.reverse();
        Ok(Some(self.units.clone()))
    }
}

/// Factory for creating MockPolicy instances
///
/// All policies it creates share one call log and start from the same script.
#[derive(Debug, Clone, Default)]
pub struct MockPolicyFactory {
    log: PolicyCallLog,
    rankings: Vec<Option<Ranking>>,
    fail_train: bool,
    fail_create: Option<String>,
}

impl MockPolicyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> PolicyCallLog {
        self.log.clone()
    }

    /// Queue a result for every created policy's next `rank()`
    #[must_use]
    pub fn with_ranking(mut self, ranking: Option<Ranking>) -> Self {
        self.rankings.push(ranking);
        self
    }

    #[must_use]
    pub fn failing_train(mut self) -> Self {
        self.fail_train = true;
        self
    }

    #[must_use]
    pub fn failing_create(mut self, message: impl Into<String>) -> Self {
        self.fail_create = Some(message.into());
        self
    }

    pub(crate) fn build(&self, context: PolicyContext) -> Result<MockPolicy, PolicyError> {
        if let Some(message) = &self.fail_create {
            return Err(PolicyError::Init(message.clone()));
        }

        let created = PolicyCall::Created {
            session_id: context.session_id,
            units: context.units.len(),
            communications: context.communications.len(),
            language: context.language,
        };
        self.log.record(created);

        let mut policy = MockPolicy::new(context.units, self.log.clone());
        for ranking in &self.rankings {
            policy.queue_ranking(ranking.clone());
        }
        if self.fail_train {
            policy.fail_train();
        }
        Ok(policy)
    }
}

impl PolicyFactory for MockPolicyFactory {
    fn create(&self, context: PolicyContext) -> Result<Box<dyn RankingPolicy>, PolicyError> {
        Ok(Box::new(self.build(context)?))
    }
}
