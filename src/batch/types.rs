//! Batch data model.
//!
//! Wire names follow the public JSON schema (`bodyString`, `response`, ...).
//! Request fields also accept their exported-name spelling (`Calls`, `URL`,
//! `BodyString`, ...) as emitted by clients that serialize without tags.
//! Byte fields travel as standard padded base64 strings; `null` and missing
//! values decode to empty bytes so loosely-built clients are accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Status reported for a call that never received a remote status code.
pub const SENTINEL_STATUS: i32 = -1;

/// One outbound call to make.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallSpec {
    /// Request target.
    #[serde(alias = "URL", alias = "Url", deserialize_with = "null_as_default")]
    pub url: String,

    /// HTTP verb, passed through verbatim.
    #[serde(alias = "Method", deserialize_with = "null_as_default")]
    pub method: String,

    /// Request headers, one value per name.
    #[serde(alias = "Headers", deserialize_with = "null_as_default")]
    pub headers: BTreeMap<String, String>,

    /// Body as text; wins over `body` when non-empty.
    #[serde(alias = "BodyString", deserialize_with = "null_as_default")]
    pub body_string: String,

    /// Body as raw bytes.
    #[serde(alias = "Body", with = "base64_bytes")]
    pub body: Vec<u8>,
}

impl CallSpec {
    /// Bytes to send as the outbound request body.
    ///
    /// `bodyString` takes precedence when non-empty, then `body`. Both empty
    /// means no body at all.
    pub fn body_bytes(&self) -> Vec<u8> {
        if !self.body_string.is_empty() {
            self.body_string.as_bytes().to_vec()
        } else {
            self.body.clone()
        }
    }
}

/// A decoded batch request. Order of `calls` is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OpRequest {
    #[serde(alias = "Calls", deserialize_with = "null_as_default")]
    pub calls: Vec<CallSpec>,
}

/// Cloud-event style envelope carrying an [`OpRequest`] in `data`.
///
/// Unknown envelope fields are ignored. A missing or `null` `data` is an
/// empty batch, so any JSON object decodes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudEventRequest {
    #[serde(default, alias = "Data", deserialize_with = "null_as_default")]
    pub data: OpRequest,
}

/// Which stage of a call failed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallErrorKind {
    /// The outbound request could not be constructed.
    Build,
    /// The transport failed before a response arrived.
    Transport,
    /// A response arrived but its body could not be read.
    Body,
}

impl CallErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallErrorKind::Build => "build",
            CallErrorKind::Transport => "transport",
            CallErrorKind::Body => "body",
        }
    }
}

/// Outcome of one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CallResult {
    /// Remote status code, or [`SENTINEL_STATUS`] on local failure.
    pub status: i32,

    /// Response headers, multi-valued headers joined with `", "`.
    #[serde(deserialize_with = "null_as_default")]
    pub headers: BTreeMap<String, String>,

    /// Response body on success, error text on failure.
    #[serde(with = "base64_bytes")]
    pub response: Vec<u8>,

    /// Failure stage, only present alongside the sentinel status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CallErrorKind>,
}

impl CallResult {
    /// A successful call: remote status, flattened headers and body.
    pub fn success(status: u16, headers: BTreeMap<String, String>, response: Vec<u8>) -> Self {
        Self {
            status: i32::from(status),
            headers,
            response,
            error: None,
        }
    }

    /// A local failure carrying the error text as the response body.
    pub fn failure(kind: CallErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: SENTINEL_STATUS,
            headers: BTreeMap::new(),
            response: message.into().into_bytes(),
            error: Some(kind),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == SENTINEL_STATUS
    }
}

/// Ordered results, position-aligned with [`OpRequest::calls`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OpResult {
    #[serde(deserialize_with = "null_as_default")]
    pub calls: Vec<CallResult>,
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Serde adapter for byte fields encoded as base64 strings.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
