//! # leaseq
//!
//! Lease-based work distribution over a shared ordered-list store.
//!
//! Producers append opaque items to a main list. Competing workers claim
//! items by atomically moving them onto a processing list and writing a
//! time-limited lease record, then report completion. Coordination lives
//! entirely in the store (Redis in production, [`store::MemoryStore`] in
//! tests); workers share no in-process state.

pub mod config;
pub mod error;
pub mod hash;
pub mod model;
pub mod publisher;
pub mod queue;
pub mod store;
pub mod telemetry;
pub mod worker;

pub use error::{Error, Result};
pub use model::{LeaseInfo, LeaseState, SessionId, Wait, WorkItem};
pub use queue::{LeaseQueue, QueueNames, Reconcile, ReportOrphans};
pub use store::Store;
