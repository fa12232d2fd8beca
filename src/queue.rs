//! The lease queue: claim, lease and complete protocol over a shared store.
//!
//! Three store-side structures per queue name:
//!
//! - `<name>`: the main list of unclaimed items, appended at the tail.
//! - `<name>:processing`: items claimed but not yet completed.
//! - `<name>:leased_by_session:<key>`: one expiring lease record per in-flight
//!   item, holding the owning session id. `<key>` is [`item_key`] of the item.
//!
//! Claiming pops from the tail of the main list, so a single uncontended
//! worker drains items newest-first.
//!
//! Known gaps, kept deliberately narrow:
//!
//! - The move onto the processing list and the lease record write are two
//!   commands. A crash between them leaves the item orphaned from the start.
//! - Nothing re-queues items whose lease expired. [`LeaseQueue::reconcile`]
//!   hands them to a caller-provided [`Reconcile`] instead.
//! - Completion is keyed by content and does not check the owning session.

use crate::error::{Error, Result};
use crate::hash::item_key;
use crate::model::{LeaseInfo, LeaseState, SessionId, Wait, WorkItem};
use crate::store::Store;
use crate::telemetry::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const PROCESSING_SUFFIX: &str = ":processing";
const LEASE_KEY_INFIX: &str = ":leased_by_session:";

/// Longest lease [`LeaseQueue::lease`] accepts (about 136 years).
pub const MAX_LEASE_DURATION: Duration = Duration::from_secs(u32::MAX as u64);

/// Store-side names derived from a queue name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueNames {
    pub main: String,
    pub processing: String,
    pub lease_prefix: String,
}

impl QueueNames {
    pub fn new(name: &str) -> Self {
        Self {
            main: name.to_string(),
            processing: format!("{name}{PROCESSING_SUFFIX}"),
            lease_prefix: format!("{name}{LEASE_KEY_INFIX}"),
        }
    }

    /// Key of the lease record for `item`.
    pub fn lease_key(&self, item: &[u8]) -> String {
        format!("{}{}", self.lease_prefix, item_key(item))
    }
}

/// One participant in a queue, with its own session identity.
///
/// The store is injected; each worker process builds its own instance.
pub struct LeaseQueue<S> {
    store: S,
    names: QueueNames,
    session: SessionId,
}

impl<S: Store> LeaseQueue<S> {
    /// Create a queue handle for `name` with a fresh session id.
    pub fn new(name: &str, store: S) -> Self {
        Self {
            store,
            names: QueueNames::new(name),
            session: SessionId::new(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn names(&self) -> &QueueNames {
        &self.names
    }

    pub fn name(&self) -> &str {
        &self.names.main
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn lease_key(&self, item: &WorkItem) -> String {
        self.names.lease_key(item.as_bytes())
    }

    /// Append `item` to the main list. Returns the main list length afterwards.
    pub async fn publish(&self, item: &WorkItem) -> Result<usize> {
        let len = self.store.push(&self.names.main, item.as_bytes()).await?;
        self.count("publish");
        debug!(queue = %self.names.main, %item, len, "published item");
        Ok(len)
    }

    /// Number of unclaimed items.
    pub async fn pending(&self) -> Result<usize> {
        self.store.length(&self.names.main).await
    }

    /// Number of claimed, not yet completed items (including orphans).
    pub async fn in_flight(&self) -> Result<usize> {
        self.store.length(&self.names.processing).await
    }

    /// True iff both the main and the processing list are empty.
    ///
    /// A snapshot only: a producer may append right after the check, and a
    /// worker may hold an item it has not yet claimed or already completed.
    pub async fn empty(&self) -> Result<bool> {
        Ok(self.pending().await? == 0 && self.in_flight().await? == 0)
    }

    /// Claim one item and lease it to this session for `lease_duration`.
    ///
    /// Returns `Ok(None)` when no item arrived within `wait`. Lease durations
    /// under one millisecond or above [`MAX_LEASE_DURATION`] are rejected
    /// before touching the store.
    pub async fn lease(&self, lease_duration: Duration, wait: Wait) -> Result<Option<WorkItem>> {
        if lease_duration.as_millis() == 0 || lease_duration > MAX_LEASE_DURATION {
            return Err(Error::InvalidLeaseDuration(lease_duration));
        }

        let started = Instant::now();
        let moved = self
            .store
            .move_item(&self.names.main, &self.names.processing, wait)
            .await?;
        let waited_ms = started.elapsed().as_secs_f64() * 1000.0;

        let Some(raw) = moved else {
            self.record_wait(waited_ms, "empty");
            self.count("lease_empty");
            return Ok(None);
        };
        let item = WorkItem::from(raw);

        // Not atomic with the move above.
        let key = self.lease_key(&item);
        self.store
            .set_ex(&key, lease_duration, &self.session.to_string())
            .await?;

        self.record_wait(waited_ms, "item");
        self.count("lease");
        debug!(
            queue = %self.names.main,
            session = %self.session,
            %item,
            %key,
            ?lease_duration,
            "leased item"
        );
        Ok(Some(item))
    }

    /// Mark `item` done: drop every occurrence from the processing list and
    /// delete its lease record.
    ///
    /// Idempotent, and not ownership-checked: any session naming the item
    /// clears it.
    pub async fn complete(&self, item: &WorkItem) -> Result<()> {
        let removed = self
            .store
            .remove_all(&self.names.processing, item.as_bytes())
            .await?;
        let key = self.lease_key(item);
        let had_lease = self.store.delete(&key).await?;

        self.count("complete");
        debug!(
            queue = %self.names.main,
            session = %self.session,
            %item,
            removed,
            had_lease,
            "completed item"
        );
        Ok(())
    }

    /// Whether a live lease record exists for `item`.
    pub async fn is_leased(&self, item: &WorkItem) -> Result<bool> {
        self.store.exists(&self.lease_key(item)).await
    }

    /// Holder and remaining lifetime of `item`'s lease, if one is live.
    pub async fn lease_info(&self, item: &WorkItem) -> Result<Option<LeaseInfo>> {
        let key = self.lease_key(item);
        let Some(value) = self.store.get(&key).await? else {
            return Ok(None);
        };
        // The record may expire between the two reads.
        let Some(remaining) = self.store.ttl(&key).await? else {
            return Ok(None);
        };
        let holder = value
            .parse::<SessionId>()
            .map_err(|_| Error::MalformedLeaseRecord {
                key: key.clone(),
                value: value.clone(),
            })?;
        let expires_at = chrono::Duration::from_std(remaining)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Ok(Some(LeaseInfo {
            holder,
            remaining,
            expires_at,
        }))
    }

    /// Best-effort classification of where `item` currently sits.
    ///
    /// An item found nowhere is reported as [`LeaseState::Completed`]; the
    /// store keeps no record of items that were never published.
    pub async fn inspect(&self, item: &WorkItem) -> Result<LeaseState> {
        if self.is_leased(item).await? {
            return Ok(LeaseState::Leased);
        }
        if self.contains(&self.names.processing, item).await? {
            return Ok(LeaseState::Expired);
        }
        if self.contains(&self.names.main, item).await? {
            return Ok(LeaseState::Unclaimed);
        }
        Ok(LeaseState::Completed)
    }

    /// Distinct processing-list items with no live lease record, head first.
    ///
    /// An item claimed by a concurrent worker that has not written its lease
    /// record yet shows up here too.
    pub async fn orphans(&self) -> Result<Vec<WorkItem>> {
        let mut seen = HashSet::new();
        let mut orphans = Vec::new();
        for raw in self.store.range(&self.names.processing).await? {
            if !seen.insert(raw.clone()) {
                continue;
            }
            let item = WorkItem::from(raw);
            if !self.is_leased(&item).await? {
                orphans.push(item);
            }
        }
        Ok(orphans)
    }

    /// Hand every orphaned item to `reconciler`. Returns how many were found.
    ///
    /// The queue itself never moves orphans; what happens to them is up to
    /// the [`Reconcile`] implementation.
    pub async fn reconcile<R>(&self, reconciler: &R) -> Result<usize>
    where
        R: Reconcile<S> + ?Sized,
    {
        let orphans = self.orphans().await?;
        for item in &orphans {
            reconciler.orphaned(self, item).await?;
        }
        self.count("reconcile");
        if !orphans.is_empty() {
            metrics::items_orphaned().add(
                orphans.len() as u64,
                &[KeyValue::new("queue", self.names.main.clone())],
            );
        }
        Ok(orphans.len())
    }

    async fn contains(&self, list: &str, item: &WorkItem) -> Result<bool> {
        Ok(self
            .store
            .range(list)
            .await?
            .iter()
            .any(|v| v.as_slice() == item.as_bytes()))
    }

    fn count(&self, operation: &'static str) {
        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("queue", self.names.main.clone()),
                KeyValue::new("operation", operation),
            ],
        );
    }

    fn record_wait(&self, waited_ms: f64, outcome: &'static str) {
        metrics::lease_wait_ms().record(
            waited_ms,
            &[
                KeyValue::new("queue", self.names.main.clone()),
                KeyValue::new("outcome", outcome),
            ],
        );
    }
}

/// Extension point for items stranded in the processing list.
#[async_trait]
pub trait Reconcile<S: Store>: Send + Sync {
    async fn orphaned(&self, queue: &LeaseQueue<S>, item: &WorkItem) -> Result<()>;
}

/// Logs each orphan and leaves it where it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOrphans;

#[async_trait]
impl<S: Store> Reconcile<S> for ReportOrphans {
    async fn orphaned(&self, queue: &LeaseQueue<S>, item: &WorkItem) -> Result<()> {
        warn!(
            queue = %queue.name(),
            %item,
            key = %queue.lease_key(item),
            "orphaned item: lease expired or never written"
        );
        Ok(())
    }
}
