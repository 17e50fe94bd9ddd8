//! Call execution.
//!
//! # Responsibilities
//! - Turn one [`CallSpec`] into an outbound request
//! - Send it through the injected [`Transport`]
//! - Fold every failure into a [`CallResult`] with the sentinel status
//!
//! # Design Decisions
//! - Nothing escapes `execute`: a failed call never aborts its batch
//! - A 4xx/5xx response is a success; only local failures use `-1`
//! - Batches run in order; with `max_concurrency > 1` calls overlap but
//!   results are still collected positionally
//! - Response header names are reported in canonical form (`Set-Cookie`)

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use futures_util::stream::{self, StreamExt};
use reqwest::Url;

use crate::batch::transport::{CallError, OutboundRequest, Transport};
use crate::batch::types::{CallResult, CallSpec};
use crate::observability::metrics;

/// Executes call specs against a shared transport.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    max_concurrency: usize,
}

impl Executor {
    /// Create a sequential executor.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            max_concurrency: 1,
        }
    }

    /// Allow up to `limit` calls of one batch in flight at once.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Execute a whole batch, returning one result per spec in input order.
    pub async fn execute_all(&self, calls: &[CallSpec]) -> Vec<CallResult> {
        if self.max_concurrency <= 1 {
            let mut results = Vec::with_capacity(calls.len());
            for (index, spec) in calls.iter().enumerate() {
                results.push(self.execute_at(index, spec).await);
            }
            return results;
        }

        // Built eagerly so the stream holds futures, not a borrowing closure;
        // the handler future must stay `Send`.
        let pending: Vec<_> = calls
            .iter()
            .enumerate()
            .map(|(index, spec)| self.execute_at(index, spec))
            .collect();

        stream::iter(pending)
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    /// Execute a single call. Never fails; errors are returned as data.
    pub async fn execute(&self, spec: &CallSpec) -> CallResult {
        match self.try_execute(spec).await {
            Ok(result) => result,
            Err(e) => CallResult::failure(e.kind(), e.to_string()),
        }
    }

    async fn execute_at(&self, index: usize, spec: &CallSpec) -> CallResult {
        let result = self.execute(spec).await;
        match result.error {
            Some(kind) => {
                tracing::debug!(
                    index,
                    method = %spec.method,
                    url = %spec.url,
                    error_kind = kind.as_str(),
                    "Call failed"
                );
                metrics::record_call(kind.as_str());
            }
            None => {
                tracing::debug!(
                    index,
                    method = %spec.method,
                    url = %spec.url,
                    status = result.status,
                    "Call completed"
                );
                metrics::record_call("ok");
            }
        }
        result
    }

    async fn try_execute(&self, spec: &CallSpec) -> Result<CallResult, CallError> {
        let request = build_request(spec)?;
        let response = self.transport.send(request).await?;

        let status = response.status().as_u16();
        let headers = flatten_headers(response.headers());
        Ok(CallResult::success(status, headers, response.into_body()))
    }
}

/// Build the outbound request for `spec`.
///
/// Headers are inserted, not appended, so names differing only in case
/// collapse to the last value.
pub fn build_request(spec: &CallSpec) -> Result<OutboundRequest, CallError> {
    let method = Method::from_bytes(spec.method.as_bytes())
        .map_err(|e| CallError::Build(format!("invalid method {:?}: {}", spec.method, e)))?;
    let url = Url::parse(&spec.url)
        .map_err(|e| CallError::Build(format!("invalid url {:?}: {}", spec.url, e)))?;

    let mut headers = HeaderMap::with_capacity(spec.headers.len());
    for (name, value) in &spec.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| CallError::Build(format!("invalid header name {:?}: {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| CallError::Build(format!("invalid value for header {:?}: {}", name, e)))?;
        headers.insert(header_name, header_value);
    }

    Ok(OutboundRequest {
        method,
        url,
        headers,
        body: spec.body_bytes(),
    })
}

/// Flatten response headers to one string per name, joining repeats with `", "`.
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (canonical_header_name(name.as_str()), joined)
        })
        .collect()
}

/// `content-type` → `Content-Type`: upper-case the first letter and each
/// letter after a hyphen, lower-case the rest.
pub fn canonical_header_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}
