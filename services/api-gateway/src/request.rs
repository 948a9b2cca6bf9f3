//! Inbound request boundary types.
//!
//! The pipeline never touches the host framework's request type directly;
//! routes translate into [`InboundRequest`] and receive a [`RequestContext`]
//! back once the gatekeeping chain has admitted the request.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde_json::{Map, Value};

use crate::auth::Claims;
use crate::rate_limit::RateLimitStatus;

/// The slice of an inbound HTTP request the gatekeeping pipeline consumes.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// HTTP method
    pub method: String,
    /// Request path, used for audit records and rate-limit bucket logging
    pub path: String,
    /// Client network address
    pub remote_addr: IpAddr,
    /// Raw `Authorization` header value, if present
    pub authorization: Option<String>,
    /// `User-Agent` header value, if present
    pub user_agent: Option<String>,
    /// Parsed JSON body, if any
    pub body: Option<Value>,
    /// Path parameters extracted by the router
    pub params: BTreeMap<String, String>,
    /// Query string parameters
    pub query: BTreeMap<String, String>,
}

impl InboundRequest {
    /// Create a request with the mandatory fields set.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>, remote_addr: IpAddr) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            remote_addr,
            authorization: None,
            user_agent: None,
            body: None,
            params: BTreeMap::new(),
            query: BTreeMap::new(),
        }
    }

    /// Attach an `Authorization` header value.
    #[must_use]
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    /// Attach a `User-Agent` header value.
    #[must_use]
    pub fn with_user_agent(mut self, value: impl Into<String>) -> Self {
        self.user_agent = Some(value.into());
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a path parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }
}

/// The request-scoped state produced by a successful trip through the
/// gatekeeping pipeline.
///
/// Facet maps hold the normalized, coerced values produced by validation, so
/// downstream handlers never re-parse raw input. A facet without a schema
/// passes through empty.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Verified claims, present when the route required authentication
    pub claims: Option<Claims>,
    /// Rate-limit header state for the tier that admitted this request
    pub rate_limit: Option<RateLimitStatus>,
    /// Normalized body fields
    pub body: Map<String, Value>,
    /// Normalized path parameters
    pub params: Map<String, Value>,
    /// Normalized query parameters
    pub query: Map<String, Value>,
}

impl RequestContext {
    /// Subject id of the authenticated caller, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claims.as_ref().map(|c| c.sub.as_str())
    }
}
