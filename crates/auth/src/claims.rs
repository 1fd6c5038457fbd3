use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// How long a viewer session stays valid.
pub const SESSION_TTL_DAYS: i64 = 30;

/// Viewer session claims (transport-agnostic).
///
/// Times are serialized as the standard `iat`/`exp` unix-second claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject; always the single viewer role.
    pub sub: String,

    /// Unique token id.
    pub jti: Uuid,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    pub const VIEWER: &'static str = "viewer";

    /// A fresh viewer session starting at `now`.
    pub fn viewer(now: DateTime<Utc>) -> Self {
        // Whole seconds, so the claims survive a round trip through the token.
        let now = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        Self {
            sub: Self::VIEWER.to_string(),
            jti: Uuid::now_v7(),
            issued_at: now,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("unexpected subject {0:?}")]
    WrongSubject(String),
}

/// Deterministically validate session claims.
///
/// Note: this validates the *claims* only; signature verification happens in
/// [`crate::session`].
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.sub != SessionClaims::VIEWER {
        return Err(TokenValidationError::WrongSubject(claims.sub.clone()));
    }
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn viewer_session_lasts_thirty_days() {
        let claims = SessionClaims::viewer(t0());
        assert_eq!(claims.expires_at - claims.issued_at, Duration::days(30));
        assert_eq!(validate_claims(&claims, t0()), Ok(()));
        assert_eq!(
            validate_claims(&claims, t0() + Duration::days(29)),
            Ok(())
        );
        assert_eq!(
            validate_claims(&claims, t0() + Duration::days(30)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn rejects_future_and_inverted_windows() {
        let claims = SessionClaims::viewer(t0());
        assert_eq!(
            validate_claims(&claims, t0() - Duration::seconds(1)),
            Err(TokenValidationError::NotYetValid)
        );

        let inverted = SessionClaims {
            expires_at: claims.issued_at,
            ..claims.clone()
        };
        assert_eq!(
            validate_claims(&inverted, t0()),
            Err(TokenValidationError::InvalidTimeWindow)
        );

        let stranger = SessionClaims {
            sub: "admin".to_string(),
            ..claims
        };
        assert!(matches!(
            validate_claims(&stranger, t0()),
            Err(TokenValidationError::WrongSubject(_))
        ));
    }
}
