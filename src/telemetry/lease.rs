//! Item lifecycle span helpers.

use crate::model::LeaseState;
use tracing::Span;

/// Start a span covering one leased item, from claim to completion.
pub fn start_item_span(queue: &str, session: &str, item_key: &str) -> Span {
    tracing::info_span!(
        "lease.item",
        "lease.queue" = queue,
        "lease.session" = session,
        "lease.item_key" = item_key,
        "lease.state" = tracing::field::Empty,
    )
}

/// Record a lease state transition on `span` and update its `lease.state` field.
pub fn record_state_transition(span: &Span, from: LeaseState, to: LeaseState) {
    span.record("lease.state", tracing::field::display(to));
    span.in_scope(|| {
        tracing::info!(%from, %to, "state_transition");
    });
}
