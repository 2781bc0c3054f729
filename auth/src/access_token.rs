//! Signed access tokens.
//!
//! Access tokens are HS256 JWTs carrying the user, the session family, and
//! an expiry. They are bearer proof for resource servers and are never
//! stored server-side; revocation happens at the refresh boundary, which is
//! why their lifetime is minutes-scale.

use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::state::{FamilyId, UserId};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Owning user id.
    pub sub: String,

    /// Session family id; ties the token to its refresh lineage.
    pub fam: String,

    /// Issuer.
    pub iss: String,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Signs and validates access tokens with a shared HS256 secret.
#[derive(Clone)]
pub struct AccessTokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl AccessTokenSigner {
    /// Create a signer from the application's token secret and policy.
    #[must_use]
    pub fn new(secret: &[u8], config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: config.token_issuer.clone(),
            ttl: config.access_token_ttl,
        }
    }

    /// Sign a token for `user_id` in `family_id`, valid from `now`.
    ///
    /// Returns the encoded token and its expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessToken`] if JWT encoding fails.
    pub fn sign(
        &self,
        user_id: UserId,
        family_id: FamilyId,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>)> {
        let expires_at = now + self.ttl;
        let claims = AccessClaims {
            sub: user_id.0.to_string(),
            fam: family_id.0.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::AccessToken(e.to_string()))?;
        Ok((token, expires_at))
    }

    /// Validate a token's signature, issuer, and expiry against `now`.
    ///
    /// Expiry is checked against the injected clock, not the system clock,
    /// so resource-server validation stays testable.
    #[must_use]
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Option<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation).ok()?;
        if now.timestamp() >= data.claims.exp {
            return None;
        }
        Some(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> AccessTokenSigner {
        AccessTokenSigner::new(b"test-secret-material", &AuthConfig::default())
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let signer = signer();
        let user_id = UserId::new();
        let family_id = FamilyId::new();
        let now = Utc::now();

        let (token, expires_at) = signer.sign(user_id, family_id, now).unwrap();
        assert_eq!(expires_at, now + Duration::minutes(15));

        let claims = signer.verify(&token, now).unwrap();
        assert_eq!(claims.sub, user_id.0.to_string());
        assert_eq!(claims.fam, family_id.0.to_string());
        assert_eq!(claims.iss, "keystone-auth");
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = signer();
        let now = Utc::now();
        let (token, _) = signer.sign(UserId::new(), FamilyId::new(), now).unwrap();

        assert!(signer.verify(&token, now + Duration::minutes(16)).is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let signer = signer();
        let other = AccessTokenSigner::new(b"different-secret", &AuthConfig::default());
        let now = Utc::now();
        let (token, _) = signer.sign(UserId::new(), FamilyId::new(), now).unwrap();

        assert!(other.verify(&token, now).is_none());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let config = AuthConfig::default().with_token_issuer("issuer-a");
        let signer = AccessTokenSigner::new(b"secret", &config);
        let verifier = AccessTokenSigner::new(
            b"secret",
            &AuthConfig::default().with_token_issuer("issuer-b"),
        );
        let now = Utc::now();
        let (token, _) = signer.sign(UserId::new(), FamilyId::new(), now).unwrap();

        assert!(verifier.verify(&token, now).is_none());
    }
}
