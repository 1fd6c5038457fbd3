use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing, wrong or expired credential.
    #[error("unauthorized")]
    Unauthorized,

    /// The server has no credential configured to compare against.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// A session token could not be produced.
    #[error("failed to issue session: {0}")]
    Issue(String),
}
