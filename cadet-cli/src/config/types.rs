use cadet_core::{LearnerConfig, WakeStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default host for the cadet server
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default port for the cadet server
pub const DEFAULT_PORT: u16 = 9095;
/// Default address of the communication fetch service
pub const DEFAULT_FETCH_URL: &str = "http://localhost:9090";
/// Annotations that trigger a retrain unless configured otherwise
pub const DEFAULT_RETRAIN_INTERVAL: usize = 10;
/// Default worker poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCadetConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub fetch: RawFetchConfig,

    #[serde(default)]
    pub learner: RawLearnerConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawFetchConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLearnerConfig {
    pub retrain_interval: Option<usize>,
    pub poll_interval_ms: Option<u64>,
    pub wake: Option<WakeStrategy>,
    pub policy: Option<PolicyKind>,
    pub seed: Option<u64>,
}

/// Ranking policies the binary can serve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Shuffle the units on every rank
    #[default]
    Random,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CadetConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub learner: LearnerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host the HTTP API binds to
    pub host: String,

    /// Port the HTTP API listens on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Base URL of the communication fetch service
    pub url: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FETCH_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearnerSection {
    /// Number of annotations that trigger model retraining
    pub retrain_interval: usize,

    /// How often idle workers check for new annotations
    pub poll_interval_ms: u64,

    pub wake: WakeStrategy,

    pub policy: PolicyKind,

    /// Fixed seed for reproducible rankings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for LearnerSection {
    fn default() -> Self {
        Self {
            retrain_interval: DEFAULT_RETRAIN_INTERVAL,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            wake: WakeStrategy::default(),
            policy: PolicyKind::default(),
            seed: None,
        }
    }
}

impl LearnerSection {
    pub fn to_learner_config(&self) -> LearnerConfig {
        LearnerConfig {
            retrain_threshold: self.retrain_interval,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            wake: self.wake,
        }
    }
}
