//! Gateway configuration
//!
//! Store location and row ceiling, with defaults, environment overrides
//! (`.env` is honoured) and validation.

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "SQL_GATEWAY_DB";
pub const ENV_MAX_ROWS: &str = "SQL_GATEWAY_MAX_ROWS";
pub const ENV_BUSY_TIMEOUT_MS: &str = "SQL_GATEWAY_BUSY_TIMEOUT_MS";

pub const DEFAULT_DB_PATH: &str = "app.db";
pub const DEFAULT_MAX_ROWS: u64 = 100;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Path of the SQLite store file
    pub db_path: PathBuf,

    /// Hard ceiling on rows returned by any query
    pub max_rows: u64,

    /// How long a connection waits on a locked store before giving up
    #[serde(with = "duration_ms")]
    pub busy_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            max_rows: DEFAULT_MAX_ROWS,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

impl GatewayConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn with_max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Build from the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            config.db_path = PathBuf::from(path.trim());
        }
        if let Some(raw) = lookup(ENV_MAX_ROWS) {
            config.max_rows = parse_u64(ENV_MAX_ROWS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout = Duration::from_millis(parse_u64(ENV_BUSY_TIMEOUT_MS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rows == 0 {
            return Err(GatewayError::Config("max_rows must be at least 1".to_string()));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(GatewayError::Config("db_path must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| GatewayError::Config(format!("{}={:?} is not a valid integer: {}", key, raw, e)))
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
