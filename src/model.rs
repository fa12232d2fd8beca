//! Core data model.
//!
//! A work item is an opaque byte payload. Its identity for lease purposes is
//! derived from its content (see [`crate::hash::item_key`]), never assigned.

use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// A unit of work moving through the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem(Vec<u8>);

impl WorkItem {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for WorkItem {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for WorkItem {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<String> for WorkItem {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for WorkItem {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for WorkItem {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Process-lifetime identity of one lease queue instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Full form: this is the value written into lease records.
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Wait
// ---------------------------------------------------------------------------

/// How long a claim may wait for the main list to become non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Attempt once; return nothing immediately if the list is empty.
    NonBlocking,
    /// Block up to the given timeout. `None` or a zero timeout waits indefinitely.
    Blocking(Option<Duration>),
}

impl Wait {
    /// Block for at most `timeout`.
    pub fn up_to(timeout: Duration) -> Self {
        Wait::Blocking(Some(timeout))
    }

    /// Block until an item arrives.
    pub fn forever() -> Self {
        Wait::Blocking(None)
    }

    /// The effective deadline length, `None` meaning no deadline.
    pub(crate) fn timeout(self) -> Option<Duration> {
        match self {
            Wait::Blocking(Some(d)) if !d.is_zero() => Some(d),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Lease State
// ---------------------------------------------------------------------------

/// Lifecycle state of an item with respect to leasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaseState {
    /// In the main list, waiting for a worker.
    Unclaimed,
    /// In the processing list with a live lease record.
    Leased,
    /// Removed from the processing list and its lease record deleted. Terminal.
    Completed,
    /// Still in the processing list but the lease record is gone. Terminal:
    /// nothing re-queues it.
    Expired,
}

impl LeaseState {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: LeaseState) -> bool {
        use LeaseState::*;
        matches!(
            (self, to),
            (Unclaimed, Leased) | (Leased, Completed) | (Leased, Expired)
        )
    }

    /// Is this a terminal state?
    pub fn is_terminal(self) -> bool {
        matches!(self, LeaseState::Completed | LeaseState::Expired)
    }
}

impl std::fmt::Display for LeaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LeaseState::Unclaimed => "unclaimed",
            LeaseState::Leased => "leased",
            LeaseState::Completed => "completed",
            LeaseState::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Lease Info
// ---------------------------------------------------------------------------

/// Snapshot of a live lease record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseInfo {
    /// Session that wrote the record.
    pub holder: SessionId,
    /// Time left before the store expires the record.
    pub remaining: Duration,
    /// Wall-clock estimate of the expiry, computed from `remaining`.
    pub expires_at: DateTime<Utc>,
}
