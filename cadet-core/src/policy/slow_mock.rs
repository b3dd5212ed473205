//! Slow mock policy for concurrency testing
//!
//! SlowMockPolicy wraps MockPolicy and sleeps before each `train` and
//! `rank`. This makes a retrain cycle long enough to stop a session in the
//! middle of it.

use std::time::Duration;

use async_trait::async_trait;

use super::mock::{MockPolicy, MockPolicyFactory, PolicyCallLog};
use super::traits::{PolicyContext, PolicyFactory, RankingPolicy};
use crate::error::PolicyError;
use crate::types::{Annotation, Ranking};

/// MockPolicy wrapper that adds configurable delay
pub struct SlowMockPolicy {
    inner: MockPolicy,
    delay: Duration,
}

impl SlowMockPolicy {
    pub fn new(inner: MockPolicy, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl RankingPolicy for SlowMockPolicy {
    async fn add_annotations(&mut self, annotations: Vec<Annotation>) -> Result<(), PolicyError> {
        self.inner.add_annotations(annotations).await
    }

    async fn train(&mut self) -> Result<(), PolicyError> {
        tokio::time::sleep(self.delay).await;
        self.inner.train().await
    }

    async fn rank(&mut self) -> Result<Option<Ranking>, PolicyError> {
        tokio::time::sleep(self.delay).await;
        self.inner.rank().await
    }
}

/// Factory for SlowMockPolicy
#[derive(Debug, Clone)]
pub struct SlowMockPolicyFactory {
    inner: MockPolicyFactory,
    delay: Duration,
}

impl SlowMockPolicyFactory {
    pub fn new(inner: MockPolicyFactory, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn log(&self) -> PolicyCallLog {
        self.inner.log()
    }
}

impl PolicyFactory for SlowMockPolicyFactory {
    fn create(&self, context: PolicyContext) -> Result<Box<dyn RankingPolicy>, PolicyError> {
        let inner = self.inner.build(context)?;
        Ok(Box::new(SlowMockPolicy::new(inner, self.delay)))
    }
}
