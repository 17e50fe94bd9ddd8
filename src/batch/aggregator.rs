//! Result aggregation and reply encoding.
//!
//! Two disjoint reply channels:
//! - the batch channel: `200` with the serialized [`OpResult`]
//! - the result envelope `{"result": "..."}`: `200` for `"ok"`, `500` otherwise
//!
//! A reply is always one or the other, never a mix.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::batch::types::{CallResult, OpResult};

/// Value of the result envelope for a benign reply.
pub const RESULT_OK: &str = "ok";

/// The simple `{"result": "..."}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub result: String,
}

impl ResultEnvelope {
    pub fn ok() -> Self {
        Self {
            result: RESULT_OK.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: message.into(),
        }
    }

    /// `200` for `"ok"`, `500` for anything else.
    pub fn status(&self) -> StatusCode {
        if self.result == RESULT_OK {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Final reply of one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A fully executed batch.
    Batch(OpResult),
    /// Health check answer or pipeline failure.
    Result(ResultEnvelope),
}

impl Reply {
    /// Collect ordered call results into a batch reply.
    pub fn from_results(results: Vec<CallResult>) -> Self {
        Reply::Batch(OpResult { calls: results })
    }

    pub fn ok() -> Self {
        Reply::Result(ResultEnvelope::ok())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Reply::Result(ResultEnvelope::error(message))
    }

    /// Encode into status code and JSON body.
    ///
    /// A batch that cannot be serialized degrades to an error envelope.
    pub fn encode(&self) -> (StatusCode, Vec<u8>) {
        match self {
            Reply::Batch(batch) => match serde_json::to_vec(batch) {
                Ok(body) => (StatusCode::OK, body),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize batch result");
                    encode_envelope(&ResultEnvelope::error(e.to_string()))
                }
            },
            Reply::Result(envelope) => encode_envelope(envelope),
        }
    }
}

fn encode_envelope(envelope: &ResultEnvelope) -> (StatusCode, Vec<u8>) {
    match serde_json::to_vec(envelope) {
        Ok(body) => (envelope.status(), body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize result envelope");
            (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let (status, body) = self.encode();
        (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response()
    }
}
