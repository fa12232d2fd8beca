//! Worker loop: lease items, hand them to a handler, complete them.

use crate::error::Result;
use crate::hash::item_key;
use crate::model::{LeaseState, Wait, WorkItem};
use crate::queue::LeaseQueue;
use crate::store::Store;
use crate::telemetry::lease::{record_state_transition, start_item_span};
use crate::telemetry::metrics;
use async_trait::async_trait;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{Instrument, Span, error, info};

/// Domain work performed on each leased item.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, item: &WorkItem) -> Result<()>;
}

/// Stand-in handler that sleeps for a fixed time per item.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedWork {
    duration: Duration,
}

impl SimulatedWork {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl Handler for SimulatedWork {
    async fn handle(&self, item: &WorkItem) -> Result<()> {
        info!(%item, "working on item");
        tokio::time::sleep(self.duration).await;
        Ok(())
    }
}

/// Configuration for the worker loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Lease lifetime requested for each claimed item.
    pub lease_duration: Duration,
    /// How long each claim attempt blocks before reporting idle.
    pub wait_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            lease_duration: Duration::from_secs(5),
            wait_timeout: Duration::from_secs(2),
        }
    }
}

/// Why [`Worker::run`] returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// Both lists were observed empty.
    #[default]
    Drained,
    /// [`Worker::shutdown`] was called.
    Shutdown,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Drained => write!(f, "queue empty"),
            StopReason::Shutdown => write!(f, "shutdown requested"),
        }
    }
}

/// Tally of one [`Worker::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Items handled and completed.
    pub completed: usize,
    /// Items whose handler failed; left leased until the lease expires.
    pub failed: usize,
    /// Claim attempts that timed out empty-handed.
    pub idle_polls: usize,
    pub stopped: StopReason,
}

/// Drains a queue until it is observed empty or shutdown is requested.
pub struct Worker<S> {
    queue: Arc<LeaseQueue<S>>,
    config: WorkerConfig,
    shutdown: Arc<AtomicBool>,
}

/// Clones share the queue (and so its session and store handle) and the
/// shutdown flag. With a [`crate::store::RedisStore`] each blocking claim
/// gets its own connection, so clones can run side by side.
impl<S> Clone for Worker<S> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            config: self.config.clone(),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

impl<S: Store> Worker<S> {
    pub fn new(queue: Arc<LeaseQueue<S>>, config: WorkerConfig) -> Self {
        Self {
            queue,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn queue(&self) -> &LeaseQueue<S> {
        &self.queue
    }

    /// Ask the loop to stop. Takes effect at the top of the next iteration;
    /// a claim wait already in progress runs to its timeout.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Run until the queue is observed empty at the top of an iteration.
    ///
    /// Termination is best-effort: an orphaned item keeps the processing
    /// list non-empty, so the loop keeps polling until [`Worker::shutdown`].
    pub async fn run<H>(&self, handler: &H) -> Result<WorkerReport>
    where
        H: Handler + ?Sized,
    {
        let mut report = WorkerReport::default();
        let session = self.queue.session_id().to_string();
        info!(queue = %self.queue.name(), %session, "worker started");

        loop {
            if self.stopping() {
                report.stopped = StopReason::Shutdown;
                break;
            }
            if self.queue.empty().await? {
                report.stopped = StopReason::Drained;
                break;
            }

            let leased = self
                .queue
                .lease(self.config.lease_duration, Wait::up_to(self.config.wait_timeout))
                .await?;

            let Some(item) = leased else {
                report.idle_polls += 1;
                info!("waiting for work");
                continue;
            };

            let span = start_item_span(self.queue.name(), &session, &item_key(item.as_bytes()));
            let handled = self
                .process(handler, &item, &span)
                .instrument(span.clone())
                .await?;

            if handled {
                report.completed += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            completed = report.completed,
            failed = report.failed,
            idle_polls = report.idle_polls,
            reason = %report.stopped,
            "worker finished"
        );
        Ok(report)
    }

    /// Handle one leased item. Returns whether it was completed.
    async fn process<H>(&self, handler: &H, item: &WorkItem, span: &Span) -> Result<bool>
    where
        H: Handler + ?Sized,
    {
        record_state_transition(span, LeaseState::Unclaimed, LeaseState::Leased);

        let started = Instant::now();
        let result = handler.handle(item).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        if let Err(e) = result {
            metrics::handler_duration_ms().record(elapsed_ms, &[KeyValue::new("result", "error")]);
            // Not completed: the lease runs out and the item stays in the
            // processing list.
            error!(%item, error = %e, "handler failed, leaving item leased");
            return Ok(false);
        }

        metrics::handler_duration_ms().record(elapsed_ms, &[KeyValue::new("result", "ok")]);
        self.queue.complete(item).await?;
        record_state_transition(span, LeaseState::Leased, LeaseState::Completed);
        info!(%item, elapsed_ms, "item completed");
        Ok(true)
    }
}
