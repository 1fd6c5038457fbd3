//! Shared-secret checks for ingest and viewer login.

use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::AuthError;

/// Compare two secrets without leaking where they differ.
pub fn constant_time_eq(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Configured secrets. `None` means "not configured".
#[derive(Clone, Default)]
pub struct Credentials {
    ingest_secret: Option<String>,
    viewer_password: Option<String>,
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("ingest_secret", &self.ingest_secret.is_some())
            .field("viewer_password", &self.viewer_password.is_some())
            .finish()
    }
}

impl Credentials {
    pub fn new(ingest_secret: Option<String>, viewer_password: Option<String>) -> Self {
        let credentials = Self {
            ingest_secret: ingest_secret.filter(|s| !s.is_empty()),
            viewer_password: viewer_password.filter(|s| !s.is_empty()),
        };
        if credentials.ingest_secret.is_none() {
            warn!("INGEST_SECRET is not set; every ingest and clear request will be rejected");
        }
        credentials
    }

    /// Check the secret presented by a webhook sender.
    ///
    /// With no secret configured nothing is accepted.
    pub fn check_ingest(&self, presented: Option<&str>) -> Result<(), AuthError> {
        match (&self.ingest_secret, presented) {
            (Some(expected), Some(presented)) if constant_time_eq(presented, expected) => Ok(()),
            _ => Err(AuthError::Unauthorized),
        }
    }

    /// Check a viewer login password.
    pub fn check_password(&self, presented: &str) -> Result<(), AuthError> {
        let expected = self
            .viewer_password
            .as_deref()
            .ok_or(AuthError::NotConfigured("VIEWER_PASSWORD"))?;
        if constant_time_eq(presented, expected) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_secret_must_match_exactly() {
        let creds = Credentials::new(Some("abc123".into()), None);
        assert_eq!(creds.check_ingest(Some("abc123")), Ok(()));
        assert_eq!(creds.check_ingest(Some("abc12")), Err(AuthError::Unauthorized));
        assert_eq!(creds.check_ingest(Some("ABC123")), Err(AuthError::Unauthorized));
        assert_eq!(creds.check_ingest(None), Err(AuthError::Unauthorized));
    }

    #[test]
    fn unset_ingest_secret_rejects_everything() {
        let creds = Credentials::new(None, None);
        assert_eq!(creds.check_ingest(Some("")), Err(AuthError::Unauthorized));
        assert_eq!(creds.check_ingest(Some("anything")), Err(AuthError::Unauthorized));

        let empty = Credentials::new(Some(String::new()), None);
        assert_eq!(empty.check_ingest(Some("")), Err(AuthError::Unauthorized));
    }

    #[test]
    fn password_check_distinguishes_wrong_from_unconfigured() {
        let creds = Credentials::new(None, Some("hunter2".into()));
        assert_eq!(creds.check_password("hunter2"), Ok(()));
        assert_eq!(creds.check_password("hunter3"), Err(AuthError::Unauthorized));

        let unset = Credentials::new(None, None);
        assert_eq!(
            unset.check_password("hunter2"),
            Err(AuthError::NotConfigured("VIEWER_PASSWORD"))
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Credentials::new(Some("abc123".into()), Some("hunter2".into()));
        let out = format!("{creds:?}");
        assert!(!out.contains("abc123") && !out.contains("hunter2"));
    }
}
