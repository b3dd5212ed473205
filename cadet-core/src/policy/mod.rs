//! Ranking policy abstraction

pub mod mock;
pub mod random;
pub mod slow_mock;
pub mod traits;

// Re-export key types for convenience
pub use mock::{MockPolicy, MockPolicyFactory, PolicyCall, PolicyCallLog};
pub use random::{RandomPolicy, RandomPolicyFactory};
pub use slow_mock::{SlowMockPolicy, SlowMockPolicyFactory};
pub use traits::{PolicyContext, PolicyFactory, RankingPolicy};
