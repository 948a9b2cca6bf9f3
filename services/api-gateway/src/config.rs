//! Gateway configuration loaded from environment variables.
//!
//! Every recognized option has a development default; `validate()` runs
//! after load and rejects values that would make the gatekeeping chain
//! meaningless (zero windows, zero budgets, a default secret in
//! production).

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use thiserror::Error;
use url::Url;

use gateway_common::{HttpConfig, RetryConfig};

use crate::rate_limit::{KeyStrategy, Tier, TierPolicy};

const DEV_SECRET: &str = "dev-secret-change-me";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl {
        /// Environment variable name
        field: String,
        /// Parse failure description
        reason: String,
    },

    /// A window, budget, attempt count or lifetime is zero
    #[error("Invalid value for {0}: must be greater than 0")]
    InvalidZero(&'static str),

    /// A required value is missing or unusable in this environment
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Environment variable name
        name: String,
        /// Parse failure description
        reason: String,
    },
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Live deployment; strict secrets, no debug detail in responses
    Production,
    /// Local development
    Development,
    /// Automated testing; rate limiting is bypassed
    Test,
}

impl Environment {
    /// Whether this is the test environment.
    #[must_use]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Test)
    }

    /// Whether this is the production environment.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Self::Production),
            "development" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Window and budget for one rate-limit tier.
#[derive(Debug, Clone, Copy)]
pub struct TierLimits {
    /// Window length in minutes
    pub window_minutes: u64,
    /// Maximum requests per window
    pub max_requests: u32,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Token signing secret
    pub jwt_secret: String,
    /// Allowed signing algorithms; the first is used for issuing
    pub jwt_algorithms: Vec<Algorithm>,
    /// Default token lifetime in seconds
    pub token_ttl_secs: u64,
    /// Limits for the auth tier
    pub auth_limits: TierLimits,
    /// Limits for the general tier
    pub general_limits: TierLimits,
    /// Limits for the health tier
    pub health_limits: TierLimits,
    /// Limits for the admin tier
    pub admin_limits: TierLimits,
    /// Base URL of the remote identity/data store
    pub upstream_base_url: Url,
    /// Per-attempt HTTP timeout in seconds
    pub http_timeout_secs: u64,
    /// Total outbound attempt budget
    pub retry_max_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_base_delay_ms: u64,
}

impl GatewayConfig {
    /// Load configuration from environment variables with validation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unparseable variables or values
    /// rejected by validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            environment: parse_env("APP_ENV", Environment::Development)?,
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEV_SECRET.to_string()),
            jwt_algorithms: parse_algorithms("JWT_ALGORITHMS")?,
            token_ttl_secs: parse_env("TOKEN_TTL_SECS", 86_400)?,
            auth_limits: TierLimits {
                window_minutes: parse_env("RATE_LIMIT_AUTH_WINDOW_MINUTES", 15)?,
                max_requests: parse_env("RATE_LIMIT_AUTH_MAX", 10)?,
            },
            general_limits: TierLimits {
                window_minutes: parse_env("RATE_LIMIT_GENERAL_WINDOW_MINUTES", 15)?,
                max_requests: parse_env("RATE_LIMIT_GENERAL_MAX", 100)?,
            },
            health_limits: TierLimits {
                window_minutes: parse_env("RATE_LIMIT_HEALTH_WINDOW_MINUTES", 1)?,
                max_requests: parse_env("RATE_LIMIT_HEALTH_MAX", 60)?,
            },
            admin_limits: TierLimits {
                window_minutes: parse_env("RATE_LIMIT_ADMIN_WINDOW_MINUTES", 15)?,
                max_requests: parse_env("RATE_LIMIT_ADMIN_MAX", 30)?,
            },
            upstream_base_url: parse_url_env("UPSTREAM_BASE_URL", "http://localhost:9000/")?,
            http_timeout_secs: parse_env("HTTP_TIMEOUT_SECS", 30)?,
            retry_max_attempts: parse_env("HTTP_RETRY_MAX_ATTEMPTS", 3)?,
            retry_base_delay_ms: parse_env("HTTP_RETRY_BASE_DELAY_MS", 500)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// See [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty()
            || (self.environment.is_production() && self.jwt_secret == DEV_SECRET)
        {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if self.jwt_algorithms.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_ALGORITHMS".to_string()));
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigError::InvalidZero("TOKEN_TTL_SECS"));
        }
        for (name, limits) in [
            ("RATE_LIMIT_AUTH", self.auth_limits),
            ("RATE_LIMIT_GENERAL", self.general_limits),
            ("RATE_LIMIT_HEALTH", self.health_limits),
            ("RATE_LIMIT_ADMIN", self.admin_limits),
        ] {
            if limits.window_minutes == 0 || limits.max_requests == 0 {
                return Err(ConfigError::InvalidZero(name));
            }
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidZero("HTTP_TIMEOUT_SECS"));
        }
        if self.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidZero("HTTP_RETRY_MAX_ATTEMPTS"));
        }
        Ok(())
    }

    /// Tier policies with their keying strategies.
    ///
    /// Auth and health tiers key on the client address; general and admin
    /// tiers key on the authenticated subject.
    #[must_use]
    pub fn tier_policies(&self) -> HashMap<Tier, TierPolicy> {
        let policy = |limits: TierLimits, key_by| TierPolicy {
            window: Duration::from_secs(limits.window_minutes * 60),
            max_requests: limits.max_requests,
            key_by,
        };
        HashMap::from([
            (Tier::Auth, policy(self.auth_limits, KeyStrategy::ClientAddr)),
            (Tier::Health, policy(self.health_limits, KeyStrategy::ClientAddr)),
            (Tier::General, policy(self.general_limits, KeyStrategy::Subject)),
            (Tier::Admin, policy(self.admin_limits, KeyStrategy::Subject)),
        ])
    }

    /// HTTP client configuration for upstream calls.
    #[must_use]
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::default().with_timeout(Duration::from_secs(self.http_timeout_secs))
    }

    /// Retry configuration for upstream calls.
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
            .with_max_attempts(self.retry_max_attempts)
            .with_base_delay(Duration::from_millis(self.retry_base_delay_ms))
    }

    /// Whether error responses may carry debug detail.
    #[must_use]
    pub const fn include_error_detail(&self) -> bool {
        !self.environment.is_production()
    }
}

/// Parse an environment variable with a default value.
fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a URL environment variable with a default value.
fn parse_url_env(name: &str, default: &str) -> Result<Url, ConfigError> {
    let url_str = env::var(name).unwrap_or_else(|_| default.to_string());
    Url::parse(&url_str).map_err(|e| ConfigError::InvalidUrl {
        field: name.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a comma-separated algorithm allow-list, defaulting to HS256.
fn parse_algorithms(name: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(vec![Algorithm::HS256]);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Algorithm::from_str(s).map_err(|e| ConfigError::ParseError {
                name: name.to_string(),
                reason: format!("{s}: {e}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> GatewayConfig {
        GatewayConfig {
            environment: Environment::Development,
            jwt_secret: "unit-test-secret".to_string(),
            jwt_algorithms: vec![Algorithm::HS256],
            token_ttl_secs: 3600,
            auth_limits: TierLimits {
                window_minutes: 15,
                max_requests: 10,
            },
            general_limits: TierLimits {
                window_minutes: 15,
                max_requests: 100,
            },
            health_limits: TierLimits {
                window_minutes: 1,
                max_requests: 60,
            },
            admin_limits: TierLimits {
                window_minutes: 15,
                max_requests: 30,
            },
            upstream_base_url: Url::parse("http://localhost:9000/").unwrap(),
            http_timeout_secs: 30,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }

    #[test]
    fn base_config_is_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn production_rejects_the_dev_secret() {
        let mut config = base_config();
        config.environment = Environment::Production;
        config.jwt_secret = DEV_SECRET.to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut config = base_config();
        config.general_limits.window_minutes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidZero(_))));
    }

    #[test]
    fn zero_retry_budget_is_rejected() {
        let mut config = base_config();
        config.retry_max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidZero(_))));
    }

    #[test]
    fn tier_policies_use_the_right_key_strategies() {
        let policies = base_config().tier_policies();
        assert_eq!(policies[&Tier::Auth].key_by, KeyStrategy::ClientAddr);
        assert_eq!(policies[&Tier::Health].key_by, KeyStrategy::ClientAddr);
        assert_eq!(policies[&Tier::General].key_by, KeyStrategy::Subject);
        assert_eq!(policies[&Tier::Admin].key_by, KeyStrategy::Subject);
        assert_eq!(policies[&Tier::Auth].window, Duration::from_secs(900));
    }

    #[test]
    fn environment_parsing() {
        assert_eq!("test".parse::<Environment>(), Ok(Environment::Test));
        assert!("staging".parse::<Environment>().is_err());
        assert!(Environment::Test.is_test());
        assert!(!Environment::Development.is_production());
    }
}
