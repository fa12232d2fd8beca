//! Error types for leaseq.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid lease duration {0:?}: must be between one millisecond and {max:?}", max = crate::queue::MAX_LEASE_DURATION)]
    InvalidLeaseDuration(Duration),

    #[error("malformed lease record at {key}: {value:?}")]
    MalformedLeaseRecord { key: String, value: String },

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
