//! Batch call subsystem.
//!
//! # Data Flow
//! ```text
//! inbound body
//!     → decoder.rs (strict OpRequest, else {"data": ...} envelope)
//!     → executor.rs (one CallResult per CallSpec, in order)
//!         → transport.rs (shared outbound client)
//!     → aggregator.rs (OpResult or {"result": ...} reply)
//! ```
//!
//! # Design Decisions
//! - Each inbound request is a pure transformation; no state is shared
//!   between requests except the transport's connection pool
//! - Non-POST requests are answered `"ok"` without reading the body
//! - Pipeline errors (unreadable body, decode failure) use the result
//!   envelope; per-call errors stay inside the batch

pub mod aggregator;
pub mod decoder;
pub mod executor;
pub mod transport;
pub mod types;

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use axum::http::Method;

use crate::observability::metrics;

pub use aggregator::{Reply, ResultEnvelope};
pub use decoder::{decode_request, DecodeError};
pub use executor::Executor;
pub use transport::{CallError, OutboundRequest, ReqwestTransport, Transport};
pub use types::{CallErrorKind, CallResult, CallSpec, OpRequest, OpResult, SENTINEL_STATUS};

/// Runs the decode → execute → aggregate pipeline for one inbound request.
#[derive(Clone)]
pub struct BatchHandler {
    executor: Executor,
}

impl BatchHandler {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Handle one inbound request.
    ///
    /// `read_body` is only awaited for POST requests.
    pub async fn handle<F, B, E>(&self, method: &Method, read_body: F) -> Reply
    where
        F: Future<Output = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        if *method != Method::POST {
            return Reply::ok();
        }

        let start = Instant::now();
        let payload = match read_body.await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read request body");
                metrics::record_batch("unreadable", start);
                return Reply::error(e.to_string());
            }
        };

        let reply = self.handle_payload(payload.as_ref()).await;
        let outcome = match reply {
            Reply::Batch(_) => "executed",
            Reply::Result(_) => "rejected",
        };
        metrics::record_batch(outcome, start);
        reply
    }

    /// Decode `payload` and execute every call it contains.
    pub async fn handle_payload(&self, payload: &[u8]) -> Reply {
        let request = match decode_request(payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, bytes = payload.len(), "Rejected batch request");
                return Reply::error(e.to_string());
            }
        };

        tracing::info!(calls = request.calls.len(), "Executing batch");
        let results = self.executor.execute_all(&request.calls).await;

        let failed = results.iter().filter(|r| r.is_failure()).count();
        tracing::info!(calls = results.len(), failed, "Batch complete");

        Reply::from_results(results)
    }
}
