//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `STORE_BACKEND` names no known backend.
    #[error("Unknown STORE_BACKEND '{0}' (expected memory, json or postgres)")]
    UnknownBackend(String),

    /// The postgres backend was selected without `DATABASE_URL`.
    #[error("DATABASE_URL is required when STORE_BACKEND=postgres")]
    MissingDatabaseUrl,
}

/// Which record store backend the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    Memory,
    /// One JSON file per collection under `DATA_DIR`.
    #[default]
    Json,
    Postgres,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Json => "json",
            StoreBackend::Postgres => "postgres",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "json" | "file" => Ok(StoreBackend::Json),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `STORE_BACKEND`: `memory`, `json` or `postgres` (default `json`)
/// - `DATA_DIR`: JSON collection directory (default `data`)
/// - `LOG_DIR`: daily operation log directory (default `logs`)
/// - `DATABASE_URL`: PostgreSQL connection string
/// - `SEED_CATALOG`: load the default catalog into an empty store (default `true`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub database_url: Option<String>,
    pub seed_catalog: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let backend = match lookup("STORE_BACKEND") {
            Some(value) => value.parse()?,
            None => defaults.backend,
        };
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            backend,
            data_dir: lookup("DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            log_dir: lookup("LOG_DIR").map_or(defaults.log_dir, PathBuf::from),
            database_url,
            seed_catalog: lookup("SEED_CATALOG")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(defaults.seed_catalog),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            backend: StoreBackend::Json,
            data_dir: PathBuf::from("data"),
            log_dir: PathBuf::from("logs"),
            database_url: None,
            seed_catalog: true,
        }
    }
}
