//! Client SDK for the call fan-out service.
//!
//! DTOs are defined independently from the service crate; the service's
//! integration tests catch schema drift.

pub mod client;
pub mod types;

pub use client::{FanoutClient, SdkError};
pub use types::{CallResult, CallSpec, OpRequest, OpResult, SENTINEL_STATUS};
