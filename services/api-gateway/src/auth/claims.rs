//! Verified claim set carried by an authenticated request.

use serde::{Deserialize, Serialize};

use crate::auth::rbac::Role;

/// Decoded, verified identity payload.
///
/// Produced only by successful token verification, immutable for the
/// lifetime of the request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id of the authenticated user
    pub sub: String,
    /// Email recorded on the identity
    pub email: String,
    /// Profile id in the identity store
    pub profile_id: String,
    /// Role attached to the profile
    pub role: Role,
    /// Issued-at timestamp (seconds since epoch), when present in the token
    pub issued_at: Option<i64>,
    /// Expiry timestamp (seconds since epoch)
    pub expires_at: i64,
}

impl Claims {
    /// Whether the expiry timestamp is in the past.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at < chrono::Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_check() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "u1".to_string(),
            email: "u1@example.com".to_string(),
            profile_id: "p1".to_string(),
            role: Role::User,
            issued_at: Some(now),
            expires_at: now + 60,
        };
        assert!(!claims.is_expired());

        let expired = Claims {
            expires_at: now - 60,
            ..claims
        };
        assert!(expired.is_expired());
    }
}
