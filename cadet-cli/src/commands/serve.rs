//! `cadet-learn serve` - run the learner server in the foreground
//!
//! Settings come from the layered config files; any flag given here
//! overrides the merged value.

use std::sync::Arc;

use anyhow::Result;
use cadet_core::{
    BrokerClientFactory, FetchClient, LearnerService, PolicyFactory, RandomPolicyFactory,
    WakeStrategy,
};
use cadet_server::{AppState, CadetServer, ServerConfig};
use clap::Args;
use tracing::info;

use crate::config::{CadetConfig, ConfigLoader, PolicyKind};

/// Arguments for the serve command
#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Base URL of the communication fetch service
    #[arg(long)]
    pub fetch_url: Option<String>,

    /// Number of annotations that trigger model retraining
    #[arg(long)]
    pub retrain_interval: Option<usize>,

    /// How often idle workers check for new annotations, in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Wake workers as soon as enough annotations arrive instead of polling
    #[arg(long)]
    pub notify: bool,

    /// Seed the random policy for reproducible rankings
    #[arg(long)]
    pub seed: Option<u64>,
}

impl ServeArgs {
    /// Overlay the flags that were given on top of `config`
    fn apply(&self, mut config: CadetConfig) -> CadetConfig {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.fetch_url {
            config.fetch.url = url.clone();
        }
        if let Some(interval) = self.retrain_interval {
            config.learner.retrain_interval = interval.max(1);
        }
        if let Some(poll) = self.poll_interval_ms {
            config.learner.poll_interval_ms = poll.max(1);
        }
        if self.notify {
            config.learner.wake = WakeStrategy::Notify;
        }
        if self.seed.is_some() {
            config.learner.seed = self.seed;
        }
        config
    }
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = args.apply(ConfigLoader::load()?);

    let learner = LearnerService::new(
        config.learner.to_learner_config(),
        Arc::new(FetchClient::new(config.fetch.url.clone())),
        Arc::new(BrokerClientFactory::new()),
        policy_factory(&config),
    );
    let state = Arc::new(AppState::new(Arc::new(learner)));
    let server_config = ServerConfig::new(config.server.host.clone(), config.server.port);

    info!(
        fetch_url = %config.fetch.url,
        retrain_interval = config.learner.retrain_interval,
        poll_interval_ms = config.learner.poll_interval_ms,
        wake = ?config.learner.wake,
        "Starting cadet-learn on {}",
        server_config.addr()
    );

    CadetServer::new(server_config, state).run().await?;
    Ok(())
}

fn policy_factory(config: &CadetConfig) -> Arc<dyn PolicyFactory> {
    match config.learner.policy {
        PolicyKind::Random => match config.learner.seed {
            Some(seed) => Arc::new(RandomPolicyFactory::with_seed(seed)),
            None => Arc::new(RandomPolicyFactory::new()),
        },
    }
}
