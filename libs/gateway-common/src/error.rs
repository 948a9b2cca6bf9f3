//! Upstream error types with retryability classification.
//!
//! Every failure of an outbound call is classified as either retryable or
//! non-retryable, which is what the retry policy uses to decide whether a
//! failed attempt should be repeated.

use thiserror::Error;

/// Error produced by calls to a remote service.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The remote service answered 404 for the requested resource.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote service answered with a non-success status.
    #[error("Upstream returned status {status}: {detail}")]
    Status {
        /// HTTP status code of the response
        status: u16,
        /// Response body or reason, truncated
        detail: String,
    },

    /// No response was received (connection refused, DNS failure, reset).
    #[error("Network failure: {0}")]
    Network(String),

    /// The attempt exceeded the per-attempt timeout.
    #[error("Upstream request timed out")]
    Timeout,

    /// The response body could not be decoded into the expected shape.
    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    /// All retry attempts were consumed without success.
    ///
    /// Carries the last observed error so callers can still inspect the
    /// underlying failure.
    #[error("Upstream call failed after {attempts} attempts: {source}")]
    RetryExhausted {
        /// Total number of attempts made, including the first
        attempts: u32,
        /// The error observed on the final attempt
        source: Box<UpstreamError>,
    },
}

impl UpstreamError {
    /// Check whether a retry of the failed call could plausibly succeed.
    ///
    /// Retryable failures are: no response received (network-level failure
    /// or timeout), any 5xx status, and the specific statuses 408 (request
    /// timeout) and 429 (rate limited). Everything else fails immediately.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            Self::NotFound(_) | Self::Decode(_) | Self::RetryExhausted { .. } => false,
        }
    }

    /// Classify a non-success HTTP status into an error variant.
    ///
    /// 404 becomes [`UpstreamError::NotFound`] so callers can distinguish a
    /// missing resource from other failures without inspecting status codes.
    #[must_use]
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if status == 404 {
            Self::NotFound(detail)
        } else {
            Self::Status { status, detail }
        }
    }

    /// HTTP status carried by this error, when the remote actually answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(404),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
