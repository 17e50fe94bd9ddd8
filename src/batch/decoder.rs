//! Request decoding.
//!
//! # Responsibilities
//! - Decode the inbound body as a bare [`OpRequest`], rejecting unknown fields
//! - Fall back to the cloud-event envelope, tolerating unknown fields; an
//!   object the strict decode rejects and that has no `data` is an empty batch
//!
//! # Design Decisions
//! - Strictness is expressed as private mirror types carrying
//!   `deny_unknown_fields`; the public types stay lenient
//! - Both attempts' messages are kept so a failed decode explains itself

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::batch::types::{base64_bytes, null_as_default, CallSpec, CloudEventRequest, OpRequest};

/// Both decode attempts failed.
#[derive(Debug, Error)]
#[error("invalid batch request: {strict}; envelope: {envelope}")]
pub struct DecodeError {
    /// Why the bare request was rejected.
    pub strict: String,
    /// Why the cloud-event envelope was rejected.
    pub envelope: String,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct StrictOpRequest {
    #[serde(alias = "Calls", deserialize_with = "null_as_default")]
    calls: Vec<StrictCallSpec>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
struct StrictCallSpec {
    #[serde(alias = "URL", alias = "Url", deserialize_with = "null_as_default")]
    url: String,
    #[serde(alias = "Method", deserialize_with = "null_as_default")]
    method: String,
    #[serde(alias = "Headers", deserialize_with = "null_as_default")]
    headers: BTreeMap<String, String>,
    #[serde(alias = "BodyString", deserialize_with = "null_as_default")]
    body_string: String,
    #[serde(alias = "Body", with = "base64_bytes")]
    body: Vec<u8>,
}

impl From<StrictCallSpec> for CallSpec {
    fn from(spec: StrictCallSpec) -> Self {
        CallSpec {
            url: spec.url,
            method: spec.method,
            headers: spec.headers,
            body_string: spec.body_string,
            body: spec.body,
        }
    }
}

impl From<StrictOpRequest> for OpRequest {
    fn from(req: StrictOpRequest) -> Self {
        OpRequest {
            calls: req.calls.into_iter().map(CallSpec::from).collect(),
        }
    }
}

/// Decode a raw payload into an [`OpRequest`].
///
/// Tries the strict bare schema first, then the lenient `{"data": ...}`
/// envelope. Only a payload that is not a JSON object (empty, garbage, an
/// array of the wrong shape) or a `data` of the wrong shape fails both.
pub fn decode_request(payload: &[u8]) -> Result<OpRequest, DecodeError> {
    let strict = match serde_json::from_slice::<StrictOpRequest>(payload) {
        Ok(req) => return Ok(req.into()),
        Err(e) => e,
    };

    tracing::debug!(error = %strict, "Strict decode failed, trying envelope");

    match serde_json::from_slice::<CloudEventRequest>(payload) {
        Ok(envelope) => Ok(envelope.data),
        Err(envelope) => Err(DecodeError {
            strict: strict.to_string(),
            envelope: envelope.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_bare_request() {
        let payload = br#"{"calls": [
            {"url": "http://a/1", "method": "GET"},
            {"url": "http://a/2", "method": "POST", "bodyString": "x"}
        ]}"#;
        let req = decode_request(payload).unwrap();
        assert_eq!(req.calls.len(), 2);
        assert_eq!(req.calls[0].url, "http://a/1");
        assert_eq!(req.calls[1].method, "POST");
        assert_eq!(req.calls[1].body_string, "x");
    }

    #[test]
    fn decodes_envelope() {
        let payload = br#"{
            "specversion": "1.0",
            "type": "com.example.batch",
            "data": {"calls": [{"url": "http://a/1", "method": "GET", "extra": true}]}
        }"#;
        let req = decode_request(payload).unwrap();
        assert_eq!(req.calls.len(), 1);
        assert_eq!(req.calls[0].url, "http://a/1");
    }

    #[test]
    fn unknown_top_level_field_falls_through_to_empty_envelope() {
        // Rejected strictly; the envelope has no `data`, so nothing runs.
        let req = decode_request(br#"{"calls": [{"url": "http://a"}], "unexpected": 1}"#).unwrap();
        assert!(req.calls.is_empty());
    }

    #[test]
    fn cloud_event_without_data_is_an_empty_batch() {
        let req = decode_request(br#"{"specversion": "1.0", "id": "x"}"#).unwrap();
        assert!(req.calls.is_empty());
    }

    #[test]
    fn malformed_data_fails_both_attempts() {
        let err = decode_request(br#"{"data": {"calls": "not a list"}}"#).unwrap_err();
        assert!(err.strict.contains("data"), "{}", err.strict);
        assert!(err.envelope.contains("invalid type"), "{}", err.envelope);
    }

    #[test]
    fn exported_field_names_decode_strictly() {
        let payload = br#"{"Calls": [{"URL": "http://a/1", "Method": "GET", "BodyString": "x"}]}"#;
        let req = decode_request(payload).unwrap();
        assert_eq!(req.calls.len(), 1);
        assert_eq!(req.calls[0].url, "http://a/1");
        assert_eq!(req.calls[0].method, "GET");
        assert_eq!(req.calls[0].body_string, "x");

        let wrapped = decode_request(br#"{"Data": {"Calls": [{"Url": "http://a/2"}]}}"#).unwrap();
        assert_eq!(wrapped.calls[0].url, "http://a/2");
    }

    #[test]
    fn unknown_top_level_field_with_data_uses_envelope() {
        let payload = br#"{"calls": [{"url": "http://ignored"}], "data": {"calls": [{"url": "http://used"}]}}"#;
        let req = decode_request(payload).unwrap();
        assert_eq!(req.calls.len(), 1);
        assert_eq!(req.calls[0].url, "http://used");
    }

    #[test]
    fn unknown_nested_field_is_rejected_strictly() {
        // The envelope attempt ignores `calls`, so the batch is empty.
        let payload = br#"{"calls": [{"url": "http://a", "verb": "GET"}]}"#;
        assert!(serde_json::from_slice::<StrictOpRequest>(payload).is_err());
        assert!(decode_request(payload).unwrap().calls.is_empty());
    }

    #[test]
    fn empty_and_garbage_payloads_fail() {
        assert!(decode_request(b"").is_err());
        assert!(decode_request(b"not json").is_err());
        assert!(decode_request(b"[1, 2]").is_err());
    }

    #[test]
    fn empty_object_is_an_empty_batch() {
        let req = decode_request(b"{}").unwrap();
        assert!(req.calls.is_empty());
    }

    #[test]
    fn error_message_names_both_attempts() {
        let err = decode_request(b"nope").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("invalid batch request:"));
        assert!(msg.contains("envelope:"));
    }
}
