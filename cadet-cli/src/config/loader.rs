use super::types::{
    CadetConfig, DEFAULT_FETCH_URL, DEFAULT_HOST, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_RETRAIN_INTERVAL, DEFAULT_PORT, FetchConfig, LearnerSection, RawCadetConfig,
    RawFetchConfig, RawLearnerConfig, RawServerConfig, ServerConfig,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<CadetConfig> {
        Self::load_from_paths(
            Self::user_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Load and merge the given config files; missing files are skipped
    pub fn load_from_paths(user: Option<&Path>, project: &Path) -> Result<CadetConfig> {
        let mut raw = RawCadetConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user
            && let Some(user_config) = Self::read_raw(user_path)?
        {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_raw(project)? {
            raw = Self::merge_raw(raw, project_config);
        }

        // Convert to final config with defaults applied
        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "cadet-learn").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with CADET_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("CADET_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".cadet/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<Option<RawCadetConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(Some(config))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawCadetConfig, overlay: RawCadetConfig) -> RawCadetConfig {
        RawCadetConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            fetch: RawFetchConfig {
                url: overlay.fetch.url.or(base.fetch.url),
            },
            learner: RawLearnerConfig {
                retrain_interval: overlay
                    .learner
                    .retrain_interval
                    .or(base.learner.retrain_interval),
                poll_interval_ms: overlay
                    .learner
                    .poll_interval_ms
                    .or(base.learner.poll_interval_ms),
                wake: overlay.learner.wake.or(base.learner.wake),
                policy: overlay.learner.policy.or(base.learner.policy),
                seed: overlay.learner.seed.or(base.learner.seed),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawCadetConfig) -> CadetConfig {
        CadetConfig {
            server: ServerConfig {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
            },
            fetch: FetchConfig {
                url: raw.fetch.url.unwrap_or_else(|| DEFAULT_FETCH_URL.to_string()),
            },
            learner: LearnerSection {
                retrain_interval: raw
                    .learner
                    .retrain_interval
                    .unwrap_or(DEFAULT_RETRAIN_INTERVAL)
                    .max(1),
                poll_interval_ms: raw
                    .learner
                    .poll_interval_ms
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
                    .max(1),
                wake: raw.learner.wake.unwrap_or_default(),
                policy: raw.learner.policy.unwrap_or_default(),
                seed: raw.learner.seed,
            },
        }
    }
}
