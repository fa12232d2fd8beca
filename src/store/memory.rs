//! In-process store with the same list-end and expiry semantics as Redis.
//!
//! Expiry uses the tokio clock, so tests running with a paused clock can
//! step through lease lifetimes deterministically. Clones share state, which
//! makes one `MemoryStore` usable as the "server" for many queue instances.

use crate::error::{Error, Result};
use crate::model::Wait;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    /// Woken on every push so blocked movers can retry.
    pushed: Notify,
}

#[derive(Default)]
struct State {
    lists: HashMap<String, VecDeque<Vec<u8>>>,
    keys: HashMap<String, Entry>,
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

impl State {
    /// Drop `key` if it has expired, then return it if still present.
    fn live_entry(&mut self, key: &str) -> Option<&Entry> {
        let now = Instant::now();
        if self.keys.get(key).is_some_and(|e| !e.is_live(now)) {
            self.keys.remove(key);
        }
        self.keys.get(key)
    }

    fn try_move(&mut self, src: &str, dst: &str) -> Option<Vec<u8>> {
        let item = self.lists.get_mut(src)?.pop_back()?;
        if self.lists.get(src).is_some_and(VecDeque::is_empty) {
            self.lists.remove(src);
        }
        self.lists
            .entry(dst.to_string())
            .or_default()
            .push_front(item.clone());
        Some(item)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl crate::store::Store for MemoryStore {
    async fn push(&self, list: &str, value: &[u8]) -> Result<usize> {
        let len = {
            let mut state = self.inner.state.lock().await;
            let list = state.lists.entry(list.to_string()).or_default();
            list.push_back(value.to_vec());
            list.len()
        };
        self.inner.pushed.notify_waiters();
        Ok(len)
    }

    async fn move_item(&self, src: &str, dst: &str, wait: Wait) -> Result<Option<Vec<u8>>> {
        // A deadline past the end of the clock is no deadline at all.
        let deadline = wait.timeout().and_then(|d| Instant::now().checked_add(d));
        loop {
            // Register interest before looking, so a push between the check
            // and the await still wakes us.
            let pushed = self.inner.pushed.notified();
            tokio::pin!(pushed);
            pushed.as_mut().enable();

            if let Some(item) = self.inner.state.lock().await.try_move(src, dst) {
                return Ok(Some(item));
            }

            match (wait, deadline) {
                (Wait::NonBlocking, _) => return Ok(None),
                (_, Some(deadline)) => {
                    if tokio::time::timeout_at(deadline, pushed).await.is_err() {
                        return Ok(None);
                    }
                }
                (_, None) => pushed.await,
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.inner.state.lock().await.live_entry(key).is_some())
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: &str) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(Error::InvalidLeaseDuration(ttl))?;
        let mut state = self.inner.state.lock().await;
        state.keys.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.inner.state.lock().await;
        Ok(state.live_entry(key).map(|e| e.value.clone()))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut state = self.inner.state.lock().await;
        let now = Instant::now();
        Ok(state
            .live_entry(key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn length(&self, list: &str) -> Result<usize> {
        let state = self.inner.state.lock().await;
        Ok(state.lists.get(list).map_or(0, VecDeque::len))
    }

    async fn range(&self, list: &str) -> Result<Vec<Vec<u8>>> {
        let state = self.inner.state.lock().await;
        Ok(state
            .lists
            .get(list)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_all(&self, list: &str, value: &[u8]) -> Result<usize> {
        let mut state = self.inner.state.lock().await;
        let Some(entries) = state.lists.get_mut(list) else {
            return Ok(0);
        };
        let before = entries.len();
        entries.retain(|v| v.as_slice() != value);
        let removed = before - entries.len();
        if entries.is_empty() {
            state.lists.remove(list);
        }
        Ok(removed)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut state = self.inner.state.lock().await;
        let existed = state.live_entry(key).is_some();
        state.keys.remove(key);
        Ok(existed)
    }
}
