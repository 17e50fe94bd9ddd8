//! Batch HTTP call fan-out service.
//!
//! Accepts one request describing a batch of outbound HTTP calls, performs
//! each call, and answers with the ordered results.

pub mod batch;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use batch::{BatchHandler, CallResult, CallSpec, OpRequest, OpResult};
pub use config::FanoutConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
