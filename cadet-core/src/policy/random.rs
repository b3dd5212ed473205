//! Policy that shuffles the units on every rank
//!
//! Ignores annotations entirely. Useful as a baseline and for exercising a
//! deployment end to end without a trained model.

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use super::traits::{PolicyContext, PolicyFactory, RankingPolicy};
use crate::error::PolicyError;
use crate::types::{Annotation, AnnotationUnitIdentifier, Ranking, SessionId};

pub struct RandomPolicy {
    session_id: SessionId,
    units: Vec<AnnotationUnitIdentifier>,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(session_id: SessionId, units: Vec<AnnotationUnitIdentifier>) -> Self {
        Self {
            session_id,
            units,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create with a fixed seed for reproducible orderings
    pub fn with_seed(
        session_id: SessionId,
        units: Vec<AnnotationUnitIdentifier>,
        seed: u64,
    ) -> Self {
        Self {
            session_id,
            units,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait]
impl RankingPolicy for RandomPolicy {
    async fn add_annotations(&mut self, annotations: Vec<Annotation>) -> Result<(), PolicyError> {
        debug!(
            session_id = %self.session_id,
            count = annotations.len(),
            "RandomPolicy ignoring annotations"
        );
        Ok(())
    }

    async fn train(&mut self) -> Result<(), PolicyError> {
        debug!(session_id = %self.session_id, "RandomPolicy has nothing to train");
        Ok(())
    }

    async fn rank(&mut self) -> Result<Option<Ranking>, PolicyError> {
        self.units.shuffle(&mut self.rng);
        Ok(Some(self.units.clone()))
    }
}

/// Factory for [`RandomPolicy`]
#[derive(Debug, Clone, Default)]
pub struct RandomPolicyFactory {
    seed: Option<u64>,
}

impl RandomPolicyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every created policy starts from the same seed
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl PolicyFactory for RandomPolicyFactory {
    fn create(&self, context: PolicyContext) -> Result<Box<dyn RankingPolicy>, PolicyError> {
        let policy = match self.seed {
            Some(seed) => RandomPolicy::with_seed(context.session_id, context.units, seed),
            None => RandomPolicy::new(context.session_id, context.units),
        };
        Ok(Box::new(policy))
    }
}
