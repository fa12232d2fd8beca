//! The ordered-list key-value store the queue coordinates through.
//!
//! [`Store`] is the minimal command surface the lease protocol needs. Every
//! method is a single store command; nothing here composes commands
//! atomically. The one primitive the protocol relies on for exclusivity is
//! [`Store::move_item`]: a given occurrence of a value is delivered to exactly
//! one concurrent caller.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::error::Result;
use crate::model::Wait;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Store: Send + Sync {
    /// Append `value` at the tail of `list`. Returns the new length.
    async fn push(&self, list: &str, value: &[u8]) -> Result<usize>;

    /// Atomically pop the tail of `src` and push it onto the head of `dst`.
    ///
    /// Returns `None` when `src` stayed empty for the whole wait.
    async fn move_item(&self, src: &str, dst: &str, wait: Wait) -> Result<Option<Vec<u8>>>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Create or overwrite `key`, expiring it after `ttl`.
    async fn set_ex(&self, key: &str, ttl: Duration, value: &str) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remaining time to live, `None` if the key is absent or never expires.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    async fn length(&self, list: &str) -> Result<usize>;

    /// Every element of `list`, head to tail.
    async fn range(&self, list: &str) -> Result<Vec<Vec<u8>>>;

    /// Remove every exact-match occurrence of `value`. Returns how many were removed.
    async fn remove_all(&self, list: &str, value: &[u8]) -> Result<usize>;

    /// Delete `key`. Returns whether it existed; absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<bool>;
}
