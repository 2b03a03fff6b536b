//! Configuration for the simulation.

use std::env;
use std::sync::OnceLock;

/// Container identifier used when `CUMULUS_CONTAINER_ID` is unset.
pub const DEFAULT_CONTAINER_IDENTIFIER: &str = "iCloud.cumulus.simulated";
pub const DEFAULT_WORKER_THREAD_NAME: &str = "cumulus-worker";
pub const DEFAULT_LOG_FILTER: &str = "cumulus_sim=info";

/// Simulation configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Identifier used by `SimContainer::from_config`
    pub container_identifier: String,
    /// Name of the background worker thread
    pub worker_thread_name: String,
    /// Log filter used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            container_identifier: DEFAULT_CONTAINER_IDENTIFIER.to_string(),
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl SimConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load a `.env` file if present, then read the environment.
    ///
    /// This mutates the process environment, so call it once from the host's `main` before
    /// the simulation is first used. [`current`] never loads `.env` on its own.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Build configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str, default: &str| match lookup(key) {
            None => Ok(default.to_string()),
            Some(value) if value.trim().is_empty() => Err(ConfigError::Empty(key)),
            Some(value) => Ok(value),
        };

        let container_identifier = read("CUMULUS_CONTAINER_ID", DEFAULT_CONTAINER_IDENTIFIER)?;
        let worker_thread_name = read("CUMULUS_WORKER_NAME", DEFAULT_WORKER_THREAD_NAME)?;
        if worker_thread_name.contains('\0') {
            return Err(ConfigError::InvalidWorkerName);
        }
        let log_filter = read("CUMULUS_LOG", DEFAULT_LOG_FILTER)?;

        Ok(Self {
            container_identifier,
            worker_thread_name,
            log_filter,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable must not be empty")]
    Empty(&'static str),

    #[error("CUMULUS_WORKER_NAME must not contain NUL bytes")]
    InvalidWorkerName,
}

/// The process-wide configuration, read from the environment on first access.
///
/// Falls back to defaults, with a warning, if the environment is invalid.
pub fn current() -> &'static SimConfig {
    static CONFIG: OnceLock<SimConfig> = OnceLock::new();
    CONFIG.get_or_init(|| or_default(SimConfig::from_env()))
}

fn or_default(loaded: Result<SimConfig, ConfigError>) -> SimConfig {
    loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Invalid simulation configuration, using defaults");
        SimConfig::default()
    })
}
