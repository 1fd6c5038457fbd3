use hooklog_auth::SessionClaims;

/// Viewer context for a request (a validated session).
///
/// Present on every browse route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    claims: SessionClaims,
}

impl ViewerContext {
    pub fn new(claims: SessionClaims) -> Self {
        Self { claims }
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }
}
