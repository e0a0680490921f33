//! Configuration management for the server.

use markersync_engine::AbsentIdPolicy;
use std::env;
use std::time::Duration;

/// Default remote feed.
pub const DEFAULT_FEED_URL: &str = "https://mymapmarkers.herokuapp.com/markers";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// SQLite connection URL
    pub database_url: String,
    /// Remote marker feed
    pub feed_url: String,
    /// Time between scheduled sync cycles
    pub sync_interval: Duration,
    /// Feed connect timeout
    pub connect_timeout: Duration,
    /// Feed read timeout
    pub read_timeout: Duration,
    /// Handling of feed entries without an id
    pub absent_id_policy: AbsentIdPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "sqlite://markers.db".to_string(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            sync_interval: Duration::from_secs(3600),
            connect_timeout: Duration::from_millis(15_000),
            read_timeout: Duration::from_millis(10_000),
            absent_id_policy: AbsentIdPolicy::Insert,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidPort)?,
            None => defaults.port,
        };

        let database_url = lookup("DATABASE_URL").unwrap_or(defaults.database_url);
        let feed_url = lookup("FEED_URL").unwrap_or(defaults.feed_url);

        let sync_interval = match lookup("SYNC_INTERVAL_SECS") {
            Some(v) => Duration::from_secs(positive("SYNC_INTERVAL_SECS", &v)?),
            None => defaults.sync_interval,
        };

        let connect_timeout = match lookup("CONNECT_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(positive("CONNECT_TIMEOUT_MS", &v)?),
            None => defaults.connect_timeout,
        };

        let read_timeout = match lookup("READ_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(positive("READ_TIMEOUT_MS", &v)?),
            None => defaults.read_timeout,
        };

        let absent_id_policy = match lookup("ABSENT_ID_POLICY") {
            Some(v) => v.parse().map_err(ConfigError::InvalidPolicy)?,
            None => defaults.absent_id_policy,
        };

        Ok(Self {
            host,
            port,
            database_url,
            feed_url,
            sync_interval,
            connect_timeout,
            read_timeout,
            absent_id_policy,
        })
    }
}

fn positive(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("Invalid ABSENT_ID_POLICY: {0}")]
    InvalidPolicy(String),
}
