//! Infrastructure layer: storage backends, the event store, configuration.

pub mod backend;
pub mod config;
pub mod event_store;


pub use backend::{Backend, BackendError, RecordRef};
pub use config::{AuthConfig, BackendConfig, ConfigError, HookConfig, open_backend};
pub use event_store::{EventStore, ListQuery, StoreError, StoreLimits};
