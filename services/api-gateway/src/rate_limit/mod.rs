//! Tiered rate limiting with fixed windows.
//!
//! Each endpoint tier carries its own window and budget, and a keying
//! strategy: anonymous tiers key on the client network address, identity
//! aware tiers key on the authenticated subject id with an address fallback.
//! Buckets are the only state shared across concurrent requests; the
//! check-and-increment per key is indivisible behind the store's write lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::request::InboundRequest;

/// Named rate-limit policy bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Login/registration endpoints, limited before authentication
    Auth,
    /// General authenticated endpoints
    General,
    /// Health-check endpoints
    Health,
    /// Administrative endpoints
    Admin,
}

impl Tier {
    /// Name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::General => "general",
            Self::Health => "health",
            Self::Admin => "admin",
        }
    }
}

/// How a tier derives the bucket key from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Client network address
    ClientAddr,
    /// Authenticated subject id, falling back to the client address
    Subject,
}

/// Per-tier policy: window, budget and keying strategy.
#[derive(Debug, Clone)]
pub struct TierPolicy {
    /// Window over which the count accumulates
    pub window: Duration,
    /// Maximum requests per window
    pub max_requests: u32,
    /// Bucket key derivation
    pub key_by: KeyStrategy,
}

/// Outcome of one atomic bucket hit: the post-increment count and how far
/// into the window the bucket is.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    /// Count after this request was recorded
    pub count: u32,
    /// Time elapsed since the window started
    pub window_elapsed: Duration,
}

/// Keyed counter store with atomic check-and-increment semantics.
///
/// The in-memory implementation suffices for single-process deployments; a
/// distributed backing store can be plugged in behind this trait for
/// multi-process deployments.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record a hit for `(tier, key)`: reset the bucket if its window has
    /// rolled over, then increment. The count is incremented even on the
    /// request that crosses the budget.
    async fn hit(&self, tier: Tier, key: &str, window: Duration) -> Hit;
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    window_start: Instant,
}

/// In-memory bucket store behind a single RwLock.
///
/// Stale buckets are logically dead after rollover; they are reaped
/// opportunistically once the map grows past a threshold.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    buckets: RwLock<HashMap<(Tier, String), Bucket>>,
}

const REAP_THRESHOLD: usize = 4096;

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryStore {
    async fn hit(&self, tier: Tier, key: &str, window: Duration) -> Hit {
        let now = Instant::now();
        let mut buckets = self.buckets.write().await;

        if buckets.len() > REAP_THRESHOLD {
            buckets.retain(|_, bucket| now.duration_since(bucket.window_start) < window);
        }

        let bucket = buckets
            .entry((tier, key.to_string()))
            .or_insert(Bucket {
                count: 0,
                window_start: now,
            });
        if now.duration_since(bucket.window_start) >= window {
            bucket.count = 0;
            bucket.window_start = now;
        }
        bucket.count += 1;
        Hit {
            count: bucket.count,
            window_elapsed: now.duration_since(bucket.window_start),
        }
    }
}

/// Header state for a request admitted through a rate-limited tier.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RateLimitStatus {
    /// Tier budget
    pub limit: u32,
    /// Requests remaining in the current window
    pub remaining: u32,
    /// Seconds until the current window resets
    pub reset_secs: u64,
}

impl RateLimitStatus {
    /// Render the standard limit/remaining/reset header triple.
    #[must_use]
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset_secs.to_string()),
        ]
    }
}

/// Tiered rate limiter.
pub struct RateLimiter {
    policies: HashMap<Tier, TierPolicy>,
    store: Arc<dyn RateLimitStore>,
    enabled: bool,
}

impl RateLimiter {
    /// Build a limiter over the given store.
    ///
    /// `enabled = false` disables all limiting unconditionally; this is the
    /// escape hatch for automated test environments, not a security
    /// boundary.
    #[must_use]
    pub fn new(
        policies: HashMap<Tier, TierPolicy>,
        store: Arc<dyn RateLimitStore>,
        enabled: bool,
    ) -> Self {
        Self {
            policies,
            store,
            enabled,
        }
    }

    /// Build a limiter from gateway configuration with an in-memory store.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.tier_policies(),
            Arc::new(InMemoryStore::new()),
            !config.environment.is_test(),
        )
    }

    /// Record this request against the tier's bucket and decide admission.
    ///
    /// Returns header state when limiting is active, `None` when bypassed.
    ///
    /// # Errors
    ///
    /// [`GatewayError::RateLimited`] when the post-increment count exceeds
    /// the tier budget. The error carries its own [`RateLimitStatus`] with
    /// `remaining` at zero so the header triple is renderable on the
    /// rejection as well. Every rejection logs address, user agent,
    /// endpoint, limit and window.
    pub async fn check(
        &self,
        tier: Tier,
        request: &InboundRequest,
        subject: Option<&str>,
    ) -> Result<Option<RateLimitStatus>, GatewayError> {
        if !self.enabled {
            return Ok(None);
        }
        let policy = self.policies.get(&tier).ok_or_else(|| {
            GatewayError::Internal(anyhow::anyhow!("no rate-limit policy for tier {}", tier.as_str()))
        })?;

        let addr = request.remote_addr.to_string();
        let key = match policy.key_by {
            KeyStrategy::ClientAddr => addr.clone(),
            KeyStrategy::Subject => subject.map_or_else(|| addr.clone(), ToString::to_string),
        };

        let hit = self.store.hit(tier, &key, policy.window).await;
        let window_secs = policy.window.as_secs();
        let status = RateLimitStatus {
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(hit.count),
            reset_secs: policy
                .window
                .saturating_sub(hit.window_elapsed)
                .as_secs(),
        };
        if hit.count > policy.max_requests {
            warn!(
                addr = %addr,
                user_agent = request.user_agent.as_deref().unwrap_or("-"),
                endpoint = %request.path,
                tier = tier.as_str(),
                limit = policy.max_requests,
                window_secs,
                "rate limit exceeded"
            );
            return Err(GatewayError::RateLimited {
                status,
                window_secs,
                retry_after_secs: window_secs,
            });
        }

        Ok(Some(status))
    }
}
