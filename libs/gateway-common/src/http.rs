//! Outbound HTTP client construction.
//!
//! Every upstream call leaves through one pooled reqwest client built here.
//! The request timeout applies per attempt: a timed-out attempt surfaces as a
//! retryable failure, and the retry policy decides whether another attempt is
//! made.

use reqwest::Client;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("gateway-platform/", env!("CARGO_PKG_VERSION"));

/// The two timeouts the gateway tunes on its outbound client.
///
/// Everything else (pooling, TLS, user agent) is fixed; services override
/// only the per-attempt timeout via configuration.
#[derive(Debug, Clone, Copy)]
pub struct HttpConfig {
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl HttpConfig {
    /// Set the per-attempt request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection establishment timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build the pooled client with rustls TLS.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying client cannot be constructed,
    /// for example when TLS initialization fails.
    pub fn build_client(&self) -> Result<Client, reqwest::Error> {
        Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(USER_AGENT)
            .use_rustls_tls()
            .build()
    }
}
