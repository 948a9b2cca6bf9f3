//! Gateway error taxonomy and the response envelope.
//!
//! Each pipeline stage owns detection of its own error class; the envelope
//! renders any of them as `{status, message, data}` with a stable machine
//! code in `data.code`. Debug detail appears only outside production;
//! unexpected internal failures are logged with full context but expose only
//! the generic code.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use gateway_common::UpstreamError;

use crate::auth::Role;
use crate::lifecycle::ProjectStatus;
use crate::rate_limit::RateLimitStatus;
use crate::validation::FieldError;

/// Substrings that must never leak from request-derived material into
/// response messages.
const SENSITIVE_PATTERNS: &[&str] = &[
    "password",
    "secret",
    "token",
    "key",
    "credential",
    "bearer",
    "authorization",
];

/// Every failure a request can produce on its way through the gateway.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    /// No bearer credential was presented
    #[error("Authentication token missing")]
    MissingToken,

    /// Signature invalid, structure undecodable, or algorithm not allowed
    #[error("Malformed token: {reason}")]
    MalformedToken {
        /// Description of the malformation, sanitized before rendering
        reason: String,
    },

    /// Token expiry is in the past
    #[error("Token has expired")]
    ExpiredToken,

    /// Signature verified but required claim fields are missing
    #[error("Token payload missing required fields: {fields:?}")]
    InvalidTokenPayload {
        /// Names of the missing or invalid fields
        fields: Vec<String>,
    },

    /// Role not in the route's required set
    #[error("Insufficient permissions: role {actual} not in required set {required:?}")]
    InsufficientPermissions {
        /// Roles the route accepts
        required: Vec<Role>,
        /// Role the caller actually holds
        actual: Role,
    },

    /// One or more request fields violated the route's schema
    #[error("Request validation failed")]
    Validation {
        /// Every violated field, in facet order
        errors: Vec<FieldError>,
    },

    /// Tier budget exceeded
    #[error("Rate limit exceeded: {} requests per {window_secs}s", .status.limit)]
    RateLimited {
        /// Header state for the rejected request; `remaining` is zero
        status: RateLimitStatus,
        /// Window length in seconds
        window_secs: u64,
        /// Suggested wait before retrying, in seconds
        retry_after_secs: u64,
    },

    /// Requested lifecycle change is not an edge of the transition graph
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: ProjectStatus,
        /// Requested state
        to: ProjectStatus,
    },

    /// The remote store has no such resource
    #[error("{resource} not found")]
    NotFound {
        /// Domain name of the missing resource
        resource: String,
    },

    /// The remote store failed for a reason other than a missing resource
    #[error("Upstream request failed: {0}")]
    Upstream(UpstreamError),

    /// The outbound call failed after all retry attempts
    #[error("Upstream request failed after {attempts} attempts: {source}")]
    RetryExhausted {
        /// Total attempts made
        attempts: u32,
        /// Last error observed
        source: UpstreamError,
    },

    /// Programming error or unexpected failure; details never reach callers
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    /// Translate an upstream failure at the business-logic boundary.
    ///
    /// `resource` names the domain object so a storage-layer 404 surfaces as
    /// "project not found" rather than an opaque upstream error.
    #[must_use]
    pub fn from_upstream(error: UpstreamError, resource: &str) -> Self {
        match error {
            UpstreamError::NotFound(_) => Self::NotFound {
                resource: resource.to_string(),
            },
            UpstreamError::RetryExhausted { attempts, source } => Self::RetryExhausted {
                attempts,
                source: *source,
            },
            other => Self::Upstream(other),
        }
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingToken => ErrorCode::MissingToken,
            Self::MalformedToken { .. } => ErrorCode::MalformedToken,
            Self::ExpiredToken => ErrorCode::ExpiredToken,
            Self::InvalidTokenPayload { .. } => ErrorCode::InvalidTokenPayload,
            Self::InsufficientPermissions { .. } => ErrorCode::InsufficientPermissions,
            Self::Validation { .. } => ErrorCode::ValidationError,
            Self::RateLimited { .. } => ErrorCode::RateLimitExceeded,
            Self::InvalidTransition { .. } => ErrorCode::InvalidStatusTransition,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Upstream(_) => ErrorCode::UpstreamUnavailable,
            Self::RetryExhausted { .. } => ErrorCode::RetryExhausted,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// HTTP status this error maps to.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.code().http_status()
    }
}

/// Machine-readable error codes carried in `data.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// `MISSING_TOKEN`
    MissingToken,
    /// `MALFORMED_TOKEN`
    MalformedToken,
    /// `EXPIRED_TOKEN`
    ExpiredToken,
    /// `INVALID_TOKEN_PAYLOAD`
    InvalidTokenPayload,
    /// `INSUFFICIENT_PERMISSIONS`
    InsufficientPermissions,
    /// `VALIDATION_ERROR`
    ValidationError,
    /// `RATE_LIMIT_EXCEEDED`
    RateLimitExceeded,
    /// `INVALID_STATUS_TRANSITION`
    InvalidStatusTransition,
    /// `NOT_FOUND`
    NotFound,
    /// `UPSTREAM_UNAVAILABLE`
    UpstreamUnavailable,
    /// `RETRY_EXHAUSTED`
    RetryExhausted,
    /// `INTERNAL_ERROR`
    InternalError,
}

impl ErrorCode {
    /// Wire representation of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::MalformedToken => "MALFORMED_TOKEN",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::InvalidTokenPayload => "INVALID_TOKEN_PAYLOAD",
            Self::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
            Self::NotFound => "NOT_FOUND",
            Self::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            Self::RetryExhausted => "RETRY_EXHAUSTED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status this code maps to.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::MissingToken
            | Self::MalformedToken
            | Self::ExpiredToken
            | Self::InvalidTokenPayload => 401,
            Self::InsufficientPermissions => 403,
            Self::ValidationError | Self::InvalidStatusTransition => 400,
            Self::RateLimitExceeded => 429,
            Self::NotFound => 404,
            Self::UpstreamUnavailable => 502,
            Self::RetryExhausted => 504,
            Self::InternalError => 500,
        }
    }
}

/// Status discriminant of the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The request succeeded
    Success,
    /// The request failed
    Error,
}

/// The wire envelope every response uses, success or error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// `"success"` or `"error"`
    pub status: ResponseStatus,
    /// Human-readable summary
    pub message: String,
    /// Payload; for errors this carries `code`, `correlation_id` and any
    /// error-specific fields
    pub data: Value,
}

impl ApiResponse {
    /// Build a success envelope.
    #[must_use]
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data,
        }
    }

    /// Build an error envelope.
    ///
    /// `include_detail` controls whether the underlying error chain is
    /// attached; production configuration must pass `false`. Internal errors
    /// are logged here with full context and never expose their message.
    #[must_use]
    pub fn from_error(err: &GatewayError, include_detail: bool) -> Self {
        let correlation_id = Uuid::new_v4();
        let code = err.code();
        let mut data = json!({
            "code": code.as_str(),
            "correlation_id": correlation_id,
        });

        let message = match err {
            GatewayError::MalformedToken { reason } => {
                format!("Malformed token: {}", sanitize_message(reason))
            }
            GatewayError::Validation { errors } => {
                if let Some(map) = data.as_object_mut() {
                    let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
                    map.insert("errors".to_string(), json!(rendered));
                }
                "Request validation failed".to_string()
            }
            GatewayError::RateLimited {
                status,
                window_secs,
                retry_after_secs,
            } => {
                if let Some(map) = data.as_object_mut() {
                    map.insert("limit".to_string(), json!(status.limit));
                    map.insert("remaining".to_string(), json!(status.remaining));
                    map.insert("reset_secs".to_string(), json!(status.reset_secs));
                    map.insert("window_secs".to_string(), json!(window_secs));
                    map.insert("retry_after_secs".to_string(), json!(retry_after_secs));
                }
                err.to_string()
            }
            GatewayError::InsufficientPermissions { required, actual } => {
                if let Some(map) = data.as_object_mut() {
                    let required: Vec<&str> = required.iter().map(|r| r.as_str()).collect();
                    map.insert("required".to_string(), json!(required));
                    map.insert("actual".to_string(), json!(actual.as_str()));
                }
                "Insufficient permissions".to_string()
            }
            GatewayError::InvalidTransition { from, to } => {
                if let Some(map) = data.as_object_mut() {
                    map.insert("from".to_string(), json!(from.as_str()));
                    map.insert("to".to_string(), json!(to.as_str()));
                }
                err.to_string()
            }
            GatewayError::Internal(inner) => {
                error!(
                    %correlation_id,
                    error = %inner,
                    "internal error while handling request"
                );
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        if include_detail && !matches!(err, GatewayError::Internal(_)) {
            if let Some(map) = data.as_object_mut() {
                map.insert("detail".to_string(), json!(format!("{err:?}")));
            }
        }

        Self {
            status: ResponseStatus::Error,
            message,
            data,
        }
    }
}

/// Replace a message wholesale when it contains request-derived sensitive
/// material.
fn sanitize_message(message: &str) -> String {
    let lower = message.to_lowercase();
    for pattern in SENSITIVE_PATTERNS {
        if lower.contains(pattern) {
            return "invalid token format".to_string();
        }
    }
    message.to_string()
}
