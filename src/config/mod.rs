//! Typed configuration from environment variables.
//!
//! Loads once at startup and fails fast on malformed values. The Redis
//! password is wrapped in `secrecy::SecretString` to keep it out of logs.

pub mod secrets;

use crate::error::{Error, Result};
use secrecy::SecretString;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub redis_password: Option<SecretString>,
    pub redis_db: i64,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    /// How long a worker's claim on an item lives.
    pub lease_duration: Duration,
    /// How long a worker blocks waiting for an item before reporting idle.
    pub wait_timeout: Duration,
    /// Simulated work per item for the demo handler.
    pub work_duration: Duration,
    /// Producer run length; items `1..publish_count` are published.
    pub publish_count: usize,
    pub publish_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_password: None,
            redis_db: 0,
            otel_endpoint: None,
            log_level: "info".to_string(),
            lease_duration: Duration::from_secs(5),
            wait_timeout: Duration::from_secs(2),
            work_duration: Duration::from_secs(2),
            publish_count: 20,
            publish_interval: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            redis_password: std::env::var("REDIS_PASSWORD").ok().map(SecretString::from),
            redis_db: parsed_var("REDIS_DB")?.unwrap_or(defaults.redis_db),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            lease_duration: secs_var("LEASEQ_LEASE_SECS")?.unwrap_or(defaults.lease_duration),
            wait_timeout: secs_var("LEASEQ_WAIT_SECS")?.unwrap_or(defaults.wait_timeout),
            work_duration: secs_var("LEASEQ_WORK_SECS")?.unwrap_or(defaults.work_duration),
            publish_count: parsed_var("LEASEQ_PUBLISH_COUNT")?.unwrap_or(defaults.publish_count),
            publish_interval: secs_var("LEASEQ_PUBLISH_INTERVAL_SECS")?
                .unwrap_or(defaults.publish_interval),
        })
    }
}

fn parsed_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{name}={raw:?} is not valid: {e}"))),
        Err(_) => Ok(None),
    }
}

fn secs_var(name: &str) -> Result<Option<Duration>> {
    Ok(parsed_var::<u64>(name)?.map(Duration::from_secs))
}
