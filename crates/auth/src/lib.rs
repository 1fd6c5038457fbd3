//! `hooklog-auth` — credential checks and viewer sessions.
//!
//! This crate is intentionally decoupled from HTTP and storage: callers hand
//! in the presented secret/token and the current time, and get a decision back.

pub mod claims;
pub mod credentials;
pub mod error;
pub mod session;

pub use claims::{SESSION_TTL_DAYS, SessionClaims, TokenValidationError, validate_claims};
pub use credentials::{Credentials, constant_time_eq};
pub use error::AuthError;
pub use session::{Hs256Sessions, SessionValidator};
