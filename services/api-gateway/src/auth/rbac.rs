//! Role gate: authorize a verified claim set against a route's required
//! capability set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::auth::Claims;
use crate::error::GatewayError;

/// Closed set of roles a profile can carry.
///
/// Roles are an exact-match capability, not a hierarchy: an admin-only route
/// does not admit users and a user-only route does not admit admins unless
/// the route lists both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Platform administrator
    Admin,
    /// Regular user
    User,
}

impl Role {
    /// Wire representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Check that the claim set's role is a member of the required set.
///
/// A missing claim set here is a programming error in the pipeline wiring
/// (the role gate must never run before token verification) and surfaces as
/// an internal error, distinct from the permission failure.
///
/// # Errors
///
/// [`GatewayError::InsufficientPermissions`] when the role is not in the
/// required set; an internal error when no claim set is present.
pub fn authorize(claims: Option<&Claims>, required: &[Role]) -> Result<(), GatewayError> {
    let claims = claims.ok_or_else(|| {
        GatewayError::Internal(anyhow::anyhow!(
            "role gate invoked without a verified claim set"
        ))
    })?;

    if required.contains(&claims.role) {
        Ok(())
    } else {
        Err(GatewayError::InsufficientPermissions {
            required: required.to_vec(),
            actual: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with_role(role: Role) -> Claims {
        Claims {
            sub: "u1".to_string(),
            email: "u1@example.com".to_string(),
            profile_id: "p1".to_string(),
            role,
            issued_at: None,
            expires_at: i64::MAX,
        }
    }

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn matching_role_passes() {
        let claims = claims_with_role(Role::Admin);
        assert!(authorize(Some(&claims), &[Role::Admin]).is_ok());
        assert!(authorize(Some(&claims), &[Role::User, Role::Admin]).is_ok());
    }

    #[test]
    fn mismatched_role_is_rejected_with_context() {
        let claims = claims_with_role(Role::User);
        match authorize(Some(&claims), &[Role::Admin]) {
            Err(GatewayError::InsufficientPermissions { required, actual }) => {
                assert_eq!(required, vec![Role::Admin]);
                assert_eq!(actual, Role::User);
            }
            other => panic!("expected InsufficientPermissions, got {other:?}"),
        }
    }

    #[test]
    fn missing_claims_is_an_internal_error() {
        assert!(matches!(
            authorize(None, &[Role::Admin]),
            Err(GatewayError::Internal(_))
        ));
    }
}
