//! Integration tests for telemetry initialization and span helpers.

use leaseq::model::LeaseState;
use std::sync::{Arc, Mutex};

#[test]
fn telemetry_initializes_without_endpoint() {
    let config = leaseq::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "leaseq-test".to_string(),
        log_level: "debug".to_string(),
    };
    // A global subscriber may already be set by another test in this
    // process; that is acceptable.
    if let Ok(guard) = leaseq::telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

/// Shared in-memory sink for a scoped fmt subscriber.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn item_span_records_state_transitions() {
    let captured = Captured::default();
    let sink = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let span = leaseq::telemetry::lease::start_item_span("jobs", "session-1", "abc123");
        assert!(!span.is_disabled());
        leaseq::telemetry::lease::record_state_transition(
            &span,
            LeaseState::Unclaimed,
            LeaseState::Leased,
        );
        leaseq::telemetry::lease::record_state_transition(
            &span,
            LeaseState::Leased,
            LeaseState::Completed,
        );
    });

    let out = captured.text();
    let lines: Vec<&str> = out.lines().filter(|l| l.contains("state_transition")).collect();
    assert_eq!(lines.len(), 2, "{out}");
    assert!(lines[0].contains("from=unclaimed") && lines[0].contains("to=leased"), "{out}");
    assert!(lines[1].contains("from=leased") && lines[1].contains("to=completed"), "{out}");
    assert!(lines.iter().all(|l| l.contains("lease.item")), "{out}");
    assert!(lines[1].contains("lease.state=completed"), "{out}");
}
