use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Explicit configuration passed into manager and pool construction.
///
/// There is deliberately no process-wide ambient configuration: embedders
/// build one of these (from a file, from the environment, or in code) and
/// hand it to the components that need it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Directory for the file-backed store. `None` selects in-memory only.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    /// Bounded timeout applied to every specialist invocation.
    #[serde(default = "default_invoke_timeout_ms")]
    pub invoke_timeout_ms: u64,
    /// Upper bound on delegation steps dispatched concurrently.
    #[serde(default = "default_max_parallel")]
    pub max_parallel_delegations: usize,
    /// Total tries per step (first attempt included) before it fails.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential retry backoff.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_invoke_timeout_ms() -> u64 {
    60_000
}

fn default_max_parallel() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    250
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            invoke_timeout_ms: default_invoke_timeout_ms(),
            max_parallel_delegations: default_max_parallel(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from `REDCREW_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("REDCREW_STORAGE_PATH") {
            config.storage_path = Some(PathBuf::from(path));
        }
        if let Some(ms) = env_parse("REDCREW_INVOKE_TIMEOUT_MS")? {
            config.invoke_timeout_ms = ms;
        }
        if let Some(n) = env_parse("REDCREW_MAX_PARALLEL_DELEGATIONS")? {
            config.max_parallel_delegations = n;
        }
        if let Some(n) = env_parse("REDCREW_MAX_ATTEMPTS")? {
            config.max_attempts = n;
        }
        if let Some(ms) = env_parse("REDCREW_BACKOFF_BASE_MS")? {
            config.backoff_base_ms = ms;
        }
        Ok(config)
    }

    /// The per-invocation timeout as a [`Duration`].
    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_millis(self.invoke_timeout_ms)
    }

    /// Exponential backoff delay before retrying after `attempt` tries.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(6);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1 << shift))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("cannot parse {raw:?}"),
            }),
        Err(_) => Ok(None),
    }
}
