//! Shared resilience library for gateway-platform Rust services.
//!
//! This crate provides centralized implementations for:
//! - Upstream error types with retryability classification
//! - HTTP client configuration and building
//! - A retrying HTTP client with exponential backoff
//! - Tracing subscriber initialization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod retry;
pub mod telemetry;

pub use error::UpstreamError;
pub use http::HttpConfig;
pub use retry::{RetryConfig, RetryPolicy};
pub use telemetry::{init_tracing, TelemetryConfig};
