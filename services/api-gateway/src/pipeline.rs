//! The gatekeeping pipeline.
//!
//! Composes rate limiting, token verification, the role gate and schema
//! validation into one ordered chain invoked per inbound request. Stage
//! order is fixed per route category: auth and health routes limit before
//! authentication keyed by client address; general and admin routes
//! authenticate first and limit keyed by subject id. Once a stage fails the
//! chain halts and the failure is returned immediately.

use std::sync::Arc;

use crate::auth::{rbac, Role, TokenVerifier};
use crate::error::GatewayError;
use crate::rate_limit::{RateLimiter, Tier};
use crate::request::{InboundRequest, RequestContext};
use crate::validation::RequestSchema;

/// Where in the chain a route's tier applies its rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStage {
    /// Limit first, keyed by client address; floods never reach verification
    BeforeAuth,
    /// Verify first, then limit keyed by the authenticated subject
    AfterAuth,
}

/// Static gatekeeping policy for one route.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    /// Rate-limit tier
    pub tier: Tier,
    /// Limiter position in the chain
    pub limit_stage: LimitStage,
    /// Roles the route accepts; `None` skips authentication entirely when
    /// the limiter also runs before auth
    pub required_roles: Option<Vec<Role>>,
    /// Request schema, when the route validates input
    pub schema: Option<RequestSchema>,
}

impl RoutePolicy {
    /// Policy for login/registration routes: address-keyed limit, no auth.
    #[must_use]
    pub const fn auth() -> Self {
        Self {
            tier: Tier::Auth,
            limit_stage: LimitStage::BeforeAuth,
            required_roles: None,
            schema: None,
        }
    }

    /// Policy for health-check routes: address-keyed limit only.
    #[must_use]
    pub const fn health() -> Self {
        Self {
            tier: Tier::Health,
            limit_stage: LimitStage::BeforeAuth,
            required_roles: None,
            schema: None,
        }
    }

    /// Policy for general authenticated routes.
    #[must_use]
    pub fn general(roles: &[Role]) -> Self {
        Self {
            tier: Tier::General,
            limit_stage: LimitStage::AfterAuth,
            required_roles: Some(roles.to_vec()),
            schema: None,
        }
    }

    /// Policy for admin-only routes.
    #[must_use]
    pub fn admin() -> Self {
        Self {
            tier: Tier::Admin,
            limit_stage: LimitStage::AfterAuth,
            required_roles: Some(vec![Role::Admin]),
            schema: None,
        }
    }

    /// Attach a request schema.
    #[must_use]
    pub fn with_schema(mut self, schema: RequestSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Whether the chain must produce a verified claim set.
    ///
    /// Identity-keyed limiting also forces authentication: the subject id
    /// used as the bucket key must be a verified one.
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        self.required_roles.is_some() || self.limit_stage == LimitStage::AfterAuth
    }
}

/// The composed gatekeeping chain.
pub struct Gatekeeper {
    verifier: Arc<TokenVerifier>,
    limiter: Arc<RateLimiter>,
}

impl Gatekeeper {
    /// Compose a gatekeeper from its stages.
    #[must_use]
    pub fn new(verifier: Arc<TokenVerifier>, limiter: Arc<RateLimiter>) -> Self {
        Self { verifier, limiter }
    }

    /// Run the gatekeeping chain for one request under the given policy.
    ///
    /// Stages execute strictly in the route category's declared order; the
    /// first failing stage terminates the chain and no later stage runs.
    ///
    /// # Errors
    ///
    /// Whichever error the failing stage produced; see [`GatewayError`].
    pub async fn admit(
        &self,
        policy: &RoutePolicy,
        request: &InboundRequest,
    ) -> Result<RequestContext, GatewayError> {
        let mut rate_limit = None;

        if policy.limit_stage == LimitStage::BeforeAuth {
            rate_limit = self.limiter.check(policy.tier, request, None).await?;
        }

        let claims = if policy.requires_auth() {
            Some(self.verifier.authenticate(request)?)
        } else {
            None
        };

        if policy.limit_stage == LimitStage::AfterAuth {
            let subject = claims.as_ref().map(|c| c.sub.as_str());
            rate_limit = self.limiter.check(policy.tier, request, subject).await?;
        }

        if let Some(required) = &policy.required_roles {
            rbac::authorize(claims.as_ref(), required)?;
        }

        let facets = match &policy.schema {
            Some(schema) => schema.validate(request)?,
            None => crate::validation::NormalizedFacets::default(),
        };

        Ok(RequestContext {
            claims,
            rate_limit,
            body: facets.body,
            params: facets.params,
            query: facets.query,
        })
    }
}
