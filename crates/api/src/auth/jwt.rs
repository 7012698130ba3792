//! JWT access-token issuance and verification.
//!
//! Access tokens are HS256-signed JWTs containing a [`Claims`] payload. They
//! are verified offline: [`AccessTokenIssuer::verify`] checks signature and
//! expiry only and never looks at the session store. Revoking a session
//! therefore does not invalidate access tokens already handed out for it;
//! those stay valid until their own expiry, which is why the access TTL is
//! kept short. Refresh tokens are opaque and live in `warden_core::tokens`.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::types::{DbId, Timestamp};

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Stable identity claim.
    pub email: String,
    /// Role names at the time of issuance.
    pub roles: Vec<String>,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for audit.
    pub jti: String,
}

/// Secret and lifetimes for access and refresh tokens.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Refresh token (session) lifetime in seconds.
    pub refresh_ttl_secs: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

/// A signed access token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_at: Timestamp,
}

/// Mints and verifies access tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct AccessTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AccessTokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token for `user_id` valid from `issued_at` until `expires_at`.
    pub fn issue(
        &self,
        user_id: DbId,
        email: &str,
        roles: &[String],
        issued_at: Timestamp,
        expires_at: Timestamp,
    ) -> Result<IssuedAccessToken, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            roles: roles.to_vec(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedAccessToken { token, expires_at })
    }

    /// Validate signature and expiry (no leeway) and return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        let token_data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn issuer() -> AccessTokenIssuer {
        AccessTokenIssuer::new("test-secret-that-is-long-enough-for-hmac")
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let now = Utc::now();
        let roles = vec!["PATIENT".to_string()];
        let issued = issuer()
            .issue(42, "p@example.com", &roles, now, now + Duration::minutes(15))
            .expect("token generation should succeed");

        let claims = issuer().verify(&issued.token).expect("token should verify");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "p@example.com");
        assert_eq!(claims.roles, roles);
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn expired_token_fails() {
        let now = Utc::now();
        let issued = issuer()
            .issue(1, "a@b.c", &[], now - Duration::minutes(10), now - Duration::seconds(5))
            .expect("encoding should succeed");

        assert!(issuer().verify(&issued.token).is_err(), "expired token must fail");
    }

    #[test]
    fn different_secret_fails() {
        let now = Utc::now();
        let issued = AccessTokenIssuer::new("secret-alpha")
            .issue(1, "a@b.c", &[], now, now + Duration::minutes(5))
            .expect("encoding should succeed");

        let result = AccessTokenIssuer::new("secret-bravo").verify(&issued.token);
        assert!(result.is_err(), "token signed with a different secret must fail");
    }

    #[test]
    fn tampered_token_fails() {
        let now = Utc::now();
        let issued = issuer()
            .issue(1, "a@b.c", &[], now, now + Duration::minutes(5))
            .expect("encoding should succeed");

        let tampered = format!("{}x", issued.token);
        assert!(issuer().verify(&tampered).is_err());
    }

    #[test]
    fn config_debug_redacts_secret() {
        let config = JwtConfig {
            secret: "super-secret".into(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 86_400,
        };
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
