//! Metric instrument factories for leaseq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("leaseq")
}

/// Counter: queue-level operations.
/// Labels: `queue`, `operation` ("publish" | "lease" | "lease_empty" | "complete" | "reconcile").
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("leaseq.queue.operations")
        .with_description("Number of lease queue operations")
        .build()
}

/// Histogram: time spent waiting in `lease` for the atomic move, in milliseconds.
/// Labels: `queue`, `outcome` ("item" | "empty").
pub fn lease_wait_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("leaseq.lease.wait_ms")
        .with_description("Time spent waiting for an item to lease")
        .with_unit("ms")
        .build()
}

/// Counter: processing-list items found without a live lease record.
/// Labels: `queue`.
pub fn items_orphaned() -> Counter<u64> {
    meter()
        .u64_counter("leaseq.items.orphaned")
        .with_description("Items left in the processing list without a lease")
        .build()
}

/// Histogram: handler duration per item in milliseconds.
/// Labels: `result` ("ok" | "error").
pub fn handler_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("leaseq.worker.handler_ms")
        .with_description("Time spent handling one leased item")
        .with_unit("ms")
        .build()
}
