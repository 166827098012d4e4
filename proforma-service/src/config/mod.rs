//! Configuration module for proforma-service.

use service_core::config as core_config;
use service_core::error::AppError;
use service_core::retry::RetryConfig;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "STORE_BACKEND must be `postgres` or `memory`, got `{}`",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProformaConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub backend: StoreBackend,
    pub database: DatabaseConfig,
    pub store: StoreCallConfig,
    pub drafts: DraftSessionConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct StoreCallConfig {
    pub timeout_ms: u64,
    pub read_retries: u32,
}

impl StoreCallConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn read_retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.read_retries,
            ..RetryConfig::quick()
        }
    }
}

impl Default for StoreCallConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            read_retries: 2,
        }
    }
}

/// How long an untouched draft session lives, and how often that is checked.
#[derive(Debug, Clone)]
pub struct DraftSessionConfig {
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl DraftSessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for DraftSessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 4 * 60 * 60,
            sweep_interval_secs: 60,
        }
    }
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl ProformaConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let backend = match env::var("STORE_BACKEND") {
            Ok(value) => StoreBackend::parse(&value)?,
            Err(_) => StoreBackend::Postgres,
        };

        let database_url = match (backend, env::var("DATABASE_URL")) {
            (_, Ok(url)) => url,
            (StoreBackend::Memory, Err(_)) => String::new(),
            (StoreBackend::Postgres, Err(_)) => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "DATABASE_URL is required"
                )))
            }
        };

        let defaults = StoreCallConfig::default();
        let draft_defaults = DraftSessionConfig::default();

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "proforma-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            backend,
            database: DatabaseConfig {
                url: database_url,
                max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: parsed_or("DATABASE_MIN_CONNECTIONS", 2),
            },
            store: StoreCallConfig {
                timeout_ms: parsed_or("STORE_TIMEOUT_MS", defaults.timeout_ms),
                read_retries: parsed_or("STORE_READ_RETRIES", defaults.read_retries),
            },
            drafts: DraftSessionConfig {
                idle_ttl_secs: parsed_or("DRAFT_IDLE_TTL_SECS", draft_defaults.idle_ttl_secs),
                sweep_interval_secs: parsed_or(
                    "DRAFT_SWEEP_INTERVAL_SECS",
                    draft_defaults.sweep_interval_secs,
                ),
            },
        })
    }

    /// In-memory configuration for local runs and tests.
    pub fn in_memory() -> Self {
        Self {
            common: core_config::Config::default(),
            service_name: "proforma-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            backend: StoreBackend::Memory,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
                min_connections: 2,
            },
            store: StoreCallConfig::default(),
            drafts: DraftSessionConfig::default(),
        }
    }
}
