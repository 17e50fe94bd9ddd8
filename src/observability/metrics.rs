//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fanout_batches_total` (counter): inbound batches by outcome
//!   (`executed`, `rejected`, `unreadable`)
//! - `fanout_batch_duration_seconds` (histogram): time to answer a batch
//! - `fanout_calls_total` (counter): outbound calls by outcome
//!   (`ok`, `build`, `transport`, `body`)
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - A 4xx/5xx remote status counts as `ok`; only local failures are errors

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one answered batch.
pub fn record_batch(outcome: &'static str, start: Instant) {
    counter!("fanout_batches_total", "outcome" => outcome).increment(1);
    histogram!("fanout_batch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record one outbound call.
pub fn record_call(outcome: &'static str) {
    counter!("fanout_calls_total", "outcome" => outcome).increment(1);
}
