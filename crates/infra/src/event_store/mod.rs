//! The event store: capped append, clear-boundary filtering and search on top
//! of any [`crate::backend::Backend`].
//!
//! Control flow:
//!
//! - ingest → [`EventStore::append`] → `Backend::append_capped`
//! - browse → [`EventStore::list`] → `Backend::load_recent` → decode → boundary filter → [`query::filter`]
//! - clear → [`EventStore::clear`] → `Backend::mark_cleared(now)`

pub mod query;
pub mod store;

pub use query::{ListQuery, clamp_limit, filter};
pub use store::{EventStore, StoreError, StoreLimits};
