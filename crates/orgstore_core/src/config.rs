//! Store configuration loading.
//!
//! # Responsibility
//! - Describe where the store lives and how connections are tuned.
//! - Layer defaults, an optional TOML file and `ORGSTORE_` env overrides.
//!
//! # Invariants
//! - Environment variables override file values, which override defaults.
//! - A loaded config is validated before it is returned.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_PREFIX: &str = "ORGSTORE_";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Load(Box::new(value))
    }
}

/// Runtime configuration for the organization store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file path, or `:memory:` for a private in-memory database.
    pub database_path: String,
    /// Milliseconds a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Log level passed to `init_logging`.
    pub log_level: String,
    /// Absolute directory for rotating log files. `None` disables file logs.
    pub log_dir: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "orgstore.db".to_string(),
            busy_timeout_ms: 5_000,
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Loads defaults merged with `ORGSTORE_*` environment variables.
    pub fn load() -> ConfigResult<Self> {
        let config: Self = Self::base().merge(Env::prefixed(ENV_PREFIX)).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads defaults, then `path` when it exists, then `ORGSTORE_*` env.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let config: Self = Self::base()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database_path cannot be empty".to_string(),
            ));
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn base() -> Figment {
        Figment::new().merge(Serialized::defaults(Self::default()))
    }
}
