//! Outbound transport.
//!
//! # Responsibilities
//! - Send one fully-built request and read the complete response body
//! - Classify failures as build / transport / body errors
//!
//! # Design Decisions
//! - Targets travel as parsed [`Url`]s, so whatever the client accepts
//!   (IDN hosts, unescaped paths) reaches it unchanged
//! - One client is built at startup and shared by every call of every batch
//! - No timeouts, retries, or TLS overrides; the client's defaults apply
//! - Connections go back to the pool once the body has been drained

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, Response};
use reqwest::Url;
use thiserror::Error;

use crate::batch::types::CallErrorKind;
use crate::config::ClientConfig;

/// Failure of a single outbound call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallError {
    /// Method, URL or headers could not form a request.
    #[error("{0}")]
    Build(String),

    /// The request could not be delivered or no response arrived.
    #[error("{0}")]
    Transport(String),

    /// A response arrived but reading its body failed.
    #[error("{0}")]
    Body(String),
}

impl CallError {
    pub fn kind(&self) -> CallErrorKind {
        match self {
            CallError::Build(_) => CallErrorKind::Build,
            CallError::Transport(_) => CallErrorKind::Transport,
            CallError::Body(_) => CallErrorKind::Body,
        }
    }
}

/// One outbound call, ready to send.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Empty means no body.
    pub body: Vec<u8>,
}

/// Sends outbound requests on behalf of the executor.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response with its complete body.
    async fn send(&self, request: OutboundRequest) -> Result<Response<Vec<u8>>, CallError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the shared client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let mut builder =
            reqwest::Client::builder().pool_max_idle_per_host(config.pool_max_idle_per_host);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        if config.no_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<Response<Vec<u8>>, CallError> {
        let OutboundRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }
        let outbound = builder
            .build()
            .map_err(|e| CallError::Build(error_chain(&e)))?;

        let response = self
            .client
            .execute(outbound)
            .await
            .map_err(|e| {
                // Unsupported schemes surface here as builder errors.
                if e.is_builder() {
                    CallError::Build(error_chain(&e))
                } else {
                    CallError::Transport(error_chain(&e))
                }
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let version = response.version();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CallError::Body(error_chain(&e)))?;

        let mut out = Response::new(bytes.to_vec());
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        *out.version_mut() = version;
        Ok(out)
    }
}

/// Render an error with its whole source chain, outermost first.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
