//! Bearer-token verification.
//!
//! Tokens arrive as `Authorization: Bearer <token>` headers, are verified
//! against the configured secret and algorithm allow-list, and decode into a
//! [`Claims`] set. Every attempt, success or failure, emits a structured
//! audit event.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::claims::Claims;
use crate::auth::rbac::Role;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::request::InboundRequest;

/// Payload as it appears on the wire, before completeness checks.
///
/// Fields are optional so a structurally valid token with missing claims can
/// be reported precisely instead of failing deserialization.
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: Option<String>,
    email: Option<String>,
    profile_id: Option<String>,
    profile_name: Option<String>,
    iat: Option<i64>,
    exp: Option<i64>,
}

/// Verifies bearer tokens into claim sets.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    algorithms: Vec<Algorithm>,
}

impl TokenVerifier {
    /// Build a verifier for the given secret and algorithm allow-list.
    #[must_use]
    pub fn new(secret: &str, algorithms: Vec<Algorithm>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithms,
        }
    }

    /// Build a verifier from gateway configuration.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_algorithms.clone())
    }

    /// Extract the token from an `Authorization` header value.
    ///
    /// The header must be exactly `Bearer <token>`; absence or a malformed
    /// prefix fails fast without attempting verification.
    ///
    /// # Errors
    ///
    /// [`GatewayError::MissingToken`] when the header is absent or does not
    /// carry a bearer credential.
    pub fn extract_bearer(authorization: Option<&str>) -> Result<&str, GatewayError> {
        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .ok_or(GatewayError::MissingToken)?;
        Ok(token)
    }

    /// Verify a raw token string into a claim set.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ExpiredToken`] when `exp` is in the past
    /// - [`GatewayError::MalformedToken`] when the signature is invalid, the
    ///   structure is undecodable, or the algorithm is outside the allow-list
    /// - [`GatewayError::InvalidTokenPayload`] when the signature verifies
    ///   but required claim fields are missing or carry an unknown role
    pub fn verify(&self, token: &str) -> Result<Claims, GatewayError> {
        let mut validation = Validation::new(
            self.algorithms.first().copied().unwrap_or(Algorithm::HS256),
        );
        validation.algorithms.clone_from(&self.algorithms);
        validation.validate_aud = false;
        // No expiry leeway, so verification agrees with Claims::is_expired.
        validation.leeway = 0;

        let data = decode::<RawClaims>(token, &self.decoding_key, &validation)
            .map_err(map_decode_error)?;
        Self::into_claims(data.claims)
    }

    /// Extract, verify and audit in one step, as the pipeline does.
    ///
    /// # Errors
    ///
    /// See [`TokenVerifier::extract_bearer`] and [`TokenVerifier::verify`];
    /// all failures produce an unauthorized result.
    pub fn authenticate(&self, request: &InboundRequest) -> Result<Claims, GatewayError> {
        let outcome = Self::extract_bearer(request.authorization.as_deref())
            .and_then(|token| self.verify(token));
        match &outcome {
            Ok(claims) => info!(
                outcome = "success",
                subject = %claims.sub,
                addr = %request.remote_addr,
                path = %request.path,
                "token verification"
            ),
            Err(error) => warn!(
                outcome = "failure",
                error_code = error.code().as_str(),
                addr = %request.remote_addr,
                path = %request.path,
                "token verification"
            ),
        }
        outcome
    }

    fn into_claims(raw: RawClaims) -> Result<Claims, GatewayError> {
        let mut missing = Vec::new();
        if raw.sub.is_none() {
            missing.push("sub".to_string());
        }
        if raw.email.is_none() {
            missing.push("email".to_string());
        }
        if raw.profile_id.is_none() {
            missing.push("profile_id".to_string());
        }
        if raw.profile_name.is_none() {
            missing.push("profile_name".to_string());
        }
        if !missing.is_empty() {
            return Err(GatewayError::InvalidTokenPayload { fields: missing });
        }

        let role: Role = raw
            .profile_name
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|_| GatewayError::InvalidTokenPayload {
                fields: vec!["profile_name".to_string()],
            })?;
        let expires_at = raw.exp.ok_or_else(|| GatewayError::InvalidTokenPayload {
            fields: vec!["exp".to_string()],
        })?;

        Ok(Claims {
            sub: raw.sub.unwrap_or_default(),
            email: raw.email.unwrap_or_default(),
            profile_id: raw.profile_id.unwrap_or_default(),
            role,
            issued_at: raw.iat,
            expires_at,
        })
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> GatewayError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => GatewayError::ExpiredToken,
        ErrorKind::MissingRequiredClaim(claim) => GatewayError::InvalidTokenPayload {
            fields: vec![claim.clone()],
        },
        _ => GatewayError::MalformedToken {
            reason: "signature or structure invalid".to_string(),
        },
    }
}

/// Payload written when issuing a token.
#[derive(Debug, Serialize)]
struct IssuedClaims<'a> {
    sub: &'a str,
    email: &'a str,
    profile_id: &'a str,
    profile_name: &'a str,
    iat: i64,
    exp: i64,
}

/// Signs tokens for the login path with the configured default lifetime.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    algorithm: Algorithm,
    ttl_secs: u64,
}

impl TokenIssuer {
    /// Build an issuer for the given secret, algorithm and token lifetime.
    #[must_use]
    pub fn new(secret: &str, algorithm: Algorithm, ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            algorithm,
            ttl_secs,
        }
    }

    /// Build an issuer from gateway configuration.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config
                .jwt_algorithms
                .first()
                .copied()
                .unwrap_or(Algorithm::HS256),
            config.token_ttl_secs,
        )
    }

    /// Sign a token for the given identity.
    ///
    /// # Errors
    ///
    /// Returns an internal error if signing fails.
    pub fn issue(
        &self,
        subject: &str,
        email: &str,
        profile_id: &str,
        role: Role,
    ) -> Result<String, GatewayError> {
        let now = chrono::Utc::now().timestamp();
        let claims = IssuedClaims {
            sub: subject,
            email,
            profile_id,
            profile_name: role.as_str(),
            iat: now,
            exp: now + self.ttl_secs as i64,
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!("token signing failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SECRET, vec![Algorithm::HS256])
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, Algorithm::HS256, 3600)
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(
            TokenVerifier::extract_bearer(Some("Bearer abc.def.ghi")).unwrap(),
            "abc.def.ghi"
        );
        assert!(matches!(
            TokenVerifier::extract_bearer(None),
            Err(GatewayError::MissingToken)
        ));
        assert!(matches!(
            TokenVerifier::extract_bearer(Some("Basic abc")),
            Err(GatewayError::MissingToken)
        ));
        assert!(matches!(
            TokenVerifier::extract_bearer(Some("Bearer ")),
            Err(GatewayError::MissingToken)
        ));
        assert!(matches!(
            TokenVerifier::extract_bearer(Some("bearer abc")),
            Err(GatewayError::MissingToken)
        ));
    }

    #[test]
    fn valid_token_round_trips() {
        let token = issuer().issue("u1", "u1@example.com", "p1", Role::Admin).unwrap();
        let claims = verifier().verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "u1@example.com");
        assert_eq!(claims.profile_id, "p1");
        assert_eq!(claims.role, Role::Admin);
        assert!(!claims.is_expired());
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let claims = IssuedClaims {
            sub: "u1",
            email: "u1@example.com",
            profile_id: "p1",
            profile_name: "user",
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            verifier().verify(&token),
            Err(GatewayError::ExpiredToken)
        ));
    }

    #[test]
    fn just_expired_token_is_rejected_without_leeway() {
        let now = chrono::Utc::now().timestamp();
        let claims = IssuedClaims {
            sub: "u1",
            email: "u1@example.com",
            profile_id: "p1",
            profile_name: "user",
            iat: now - 3600,
            exp: now - 5,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            verifier().verify(&token),
            Err(GatewayError::ExpiredToken)
        ));
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let other = TokenIssuer::new("other-secret", Algorithm::HS256, 3600);
        let token = other.issue("u1", "u1@example.com", "p1", Role::User).unwrap();
        assert!(matches!(
            verifier().verify(&token),
            Err(GatewayError::MalformedToken { .. })
        ));
    }

    #[test]
    fn algorithm_outside_allow_list_is_malformed() {
        // Signed with HS384 and a secret the verifier knows; it must still
        // fail because only HS256 is allowed.
        let hs384 = TokenIssuer::new(SECRET, Algorithm::HS384, 3600);
        let token = hs384.issue("u1", "u1@example.com", "p1", Role::User).unwrap();
        assert!(matches!(
            verifier().verify(&token),
            Err(GatewayError::MalformedToken { .. })
        ));
    }

    #[test]
    fn missing_required_fields_is_invalid_payload() {
        #[derive(Serialize)]
        struct Partial<'a> {
            sub: &'a str,
            exp: i64,
        }
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Partial {
                sub: "u1",
                exp: chrono::Utc::now().timestamp() + 3600,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        match verifier().verify(&token) {
            Err(GatewayError::InvalidTokenPayload { fields }) => {
                assert_eq!(fields, vec!["email", "profile_id", "profile_name"]);
            }
            other => panic!("expected InvalidTokenPayload, got {other:?}"),
        }
    }

    #[test]
    fn unknown_role_is_invalid_payload() {
        let now = chrono::Utc::now().timestamp();
        let claims = IssuedClaims {
            sub: "u1",
            email: "u1@example.com",
            profile_id: "p1",
            profile_name: "superuser",
            iat: now,
            exp: now + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        match verifier().verify(&token) {
            Err(GatewayError::InvalidTokenPayload { fields }) => {
                assert_eq!(fields, vec!["profile_name"]);
            }
            other => panic!("expected InvalidTokenPayload, got {other:?}"),
        }
    }

    #[test]
    fn garbage_token_is_malformed() {
        assert!(matches!(
            verifier().verify("not-a-jwt"),
            Err(GatewayError::MalformedToken { .. })
        ));
    }
}
