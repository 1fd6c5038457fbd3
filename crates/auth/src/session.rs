//! Signed viewer session tokens (HS256 JWT).

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use crate::claims::{SessionClaims, validate_claims};
use crate::error::AuthError;

/// Verifies a presented session token at a given instant.
pub trait SessionValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError>;
}

/// HMAC-SHA256 session issuer and validator sharing one secret.
#[derive(Clone)]
pub struct Hs256Sessions {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl core::fmt::Debug for Hs256Sessions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Sessions").finish_non_exhaustive()
    }
}

impl Hs256Sessions {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a fresh viewer session starting at `now`.
    pub fn issue(&self, now: DateTime<Utc>) -> Result<(String, SessionClaims), AuthError> {
        let claims = SessionClaims::viewer(now);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Issue(e.to_string()))?;
        Ok((token, claims))
    }
}

impl SessionValidator for Hs256Sessions {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        // Time checks run against the injected `now` below, not the wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "rejected session token");
            AuthError::Unauthorized
        })?;
        validate_claims(&data.claims, now).map_err(|e| {
            debug!(error = %e, "rejected session claims");
            AuthError::Unauthorized
        })?;
        Ok(data.claims)
    }
}
