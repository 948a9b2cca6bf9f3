//! API Gateway core - request gatekeeping, upstream resilience, lifecycle rules.
//!
//! This crate implements the gatekeeping pipeline that sits in front of every
//! route: bearer-token verification, role-based authorization, declarative
//! request validation, and tiered rate limiting. It also carries the typed
//! client for the remote identity/data store and the status lifecycle rules
//! for project records. Route tables and the host HTTP framework live
//! elsewhere and consume this crate through [`pipeline::Gatekeeper`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pipeline;
pub mod projects;
pub mod rate_limit;
pub mod request;
pub mod store;
pub mod validation;

pub use auth::{Claims, Role, TokenIssuer, TokenVerifier};
pub use config::{Environment, GatewayConfig};
pub use error::{ApiResponse, ErrorCode, GatewayError};
pub use pipeline::{Gatekeeper, LimitStage, RoutePolicy};
pub use request::{InboundRequest, RequestContext};
