//! # Service Configuration
//!
//! YAML file (path from `--config` or `CONFIG_PATH`) with every section
//! optional, then environment overrides:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `DATABASE_URL` | `storage.dsn` |
//! | `PORT` | `server.port` |
//!
//! ```yaml
//! env: prod
//! server:
//!   host: 0.0.0.0
//!   port: 8080
//! storage:
//!   dsn: postgres://zones:secret@db:5432/zones
//!   max_connections: 60
//! batch:
//!   max_workers: 50
//!   reserved_connections: 2
//!   timeout_ms: 30000
//! metrics:
//!   listen: 0.0.0.0:9000
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use zones_batch::{CoordinatorConfig, DEFAULT_RESERVED_CONNECTIONS, MAX_WORKERS};
use zones_store::PoolSettings;

/// Configuration loading failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid PORT value: {0}")]
    InvalidPort(String),

    #[error("storage.dsn is required")]
    MissingDsn,

    #[error("batch.timeout_ms must be greater than zero")]
    ZeroBatchTimeout,
}

/// Deployment environment. Selects the default log level and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Dev,
    Prod,
    Test,
}

impl Environment {
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Self::Local | Self::Test => "debug",
            Self::Dev | Self::Prod => "info",
        }
    }

    pub fn json_logs(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dsn: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            max_connections: 60,
            min_connections: 2,
            acquire_timeout_secs: 5,
            run_migrations: true,
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("dsn", &self.dsn.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub max_workers: usize,
    /// Pool connections batch workers never take.
    pub reserved_connections: usize,
    pub timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: MAX_WORKERS,
            reserved_connections: DEFAULT_RESERVED_CONNECTIONS,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Address of the Prometheus scrape listener. Disabled when absent.
    pub listen: Option<SocketAddr>,
}

/// Full service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub env: Environment,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub batch: BatchConfig,
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Load from an optional YAML file, then apply process environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml(&text)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse and validate a YAML document. An empty document yields the
    /// defaults.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// A zero batch timeout would cancel every batch before it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.timeout_ms == 0 {
            return Err(ConfigError::ZeroBatchTimeout);
        }
        Ok(())
    }

    /// Apply `DATABASE_URL` and `PORT` from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dsn) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.storage.dsn = Some(dsn);
        }
        if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        Ok(())
    }

    /// Pool settings for the store. Fails when no DSN is configured.
    pub fn pool_settings(&self) -> Result<PoolSettings, ConfigError> {
        let dsn = self
            .storage
            .dsn
            .clone()
            .filter(|dsn| !dsn.is_empty())
            .ok_or(ConfigError::MissingDsn)?;
        Ok(PoolSettings {
            dsn,
            max_connections: self.storage.max_connections.max(1),
            min_connections: self.storage.min_connections,
            acquire_timeout: Duration::from_secs(self.storage.acquire_timeout_secs),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch.timeout_ms)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::new(self.batch.max_workers)
            .with_reserved_connections(self.batch.reserved_connections)
    }
}
