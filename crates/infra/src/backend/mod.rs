//! Durable storage backends.
//!
//! A backend only stores raw record bytes and a clear boundary; it knows
//! nothing about ids, payloads or search. The [`crate::event_store::EventStore`]
//! owns those semantics and the retention cap.
//!
//! Three interchangeable variants implement [`Backend`]:
//!
//! | Variant | Persisted layout | Write ordering |
//! |---------|------------------|----------------|
//! | [`FileBackend`] | one JSON array document, newest first, plus a `<file>.cleared` sidecar | every write goes through a FIFO [`WriteQueue`] |
//! | [`KvBackend`] | one list-typed key, newest at index 0, plus `<key>:cleared` | atomic `LPUSH` + `LTRIM` at the backend |
//! | [`BlobBackend`] | one object per record under a prefix, plus a reserved `_cleared.json` object | none; listing re-sorts by upload time |

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub mod blob;
pub mod file;
pub mod kv;
pub mod object_store;
#[cfg(feature = "redis")]
pub mod redis_kv;
pub mod write_queue;

pub use blob::BlobBackend;
pub use file::FileBackend;
pub use kv::{InMemoryKvClient, KvBackend, KvClient};
pub use object_store::{FsObjectStore, InMemoryObjectStore, ObjectMeta, ObjectStore};
#[cfg(feature = "redis")]
pub use redis_kv::RedisKvClient;
pub use write_queue::WriteQueue;

/// Maximum number of concurrent fetches issued by [`Backend::load_recent`].
const FETCH_CONCURRENCY: usize = 16;

/// Backend-specific locator for one stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRef {
    /// Index into a list-shaped log (0 = newest) at the time it was read.
    Position(usize),
    /// Named object in a keyspace, with its upload timestamp.
    Object {
        name: String,
        uploaded_at: DateTime<Utc>,
    },
}

impl core::fmt::Display for RecordRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordRef::Position(idx) => write!(f, "#{idx}"),
            RecordRef::Object { name, .. } => f.write_str(name),
        }
    }
}

/// Backend operation error.
///
/// These are **infrastructure errors**. The store surfaces them on writes and
/// on boundary reads, and swallows them (dropping the record) for individual
/// fetches during a list.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("backend call timed out: {0}")]
    Timeout(String),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

impl BackendError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            BackendError::NotFound(err.to_string())
        } else {
            BackendError::Unavailable(err.to_string())
        }
    }
}

/// Upper bounds applied to the calls made while reading recent records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBudget {
    /// Bound on listing refs (or on the single bulk read, for list-shaped logs).
    pub list_timeout: Duration,
    /// Bound on each individual fetch. A fetch that exceeds it is dropped.
    pub fetch_timeout: Duration,
}

impl Default for ReadBudget {
    fn default() -> Self {
        Self {
            list_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(2),
        }
    }
}

/// Durable append/list/clear primitives.
///
/// ## Implementation requirements
///
/// - `append_one` must not corrupt previously stored records if it fails
///   part-way, and must report failures (ingest data loss is unacceptable).
/// - `list_recent` returns refs newest first; backends without native order
///   derive it from a per-item timestamp.
/// - `mark_cleared` is idempotent: the last write wins.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs ("file", "kv", "blob").
    fn kind(&self) -> &'static str;

    /// Whether [`Backend::append_capped`] writes and enforces the cap in one
    /// atomic step. When false, callers append and evict separately.
    fn caps_on_write(&self) -> bool {
        false
    }

    /// Durably store one encoded record.
    async fn append_one(&self, record: Vec<u8>) -> Result<RecordRef, BackendError>;

    /// Evict the oldest records so that at most `cap` remain.
    ///
    /// Must never evict `just_written`. Returns how many records were removed.
    async fn evict_beyond(&self, cap: usize, just_written: &RecordRef) -> Result<usize, BackendError>;

    /// Refs of the `max` most recent records, newest first.
    async fn list_recent(&self, max: usize) -> Result<Vec<RecordRef>, BackendError>;

    /// Raw bytes of one record.
    async fn fetch(&self, record: &RecordRef) -> Result<Vec<u8>, BackendError>;

    /// Durably record a clear boundary.
    async fn mark_cleared(&self, at: DateTime<Utc>) -> Result<(), BackendError>;

    /// The current clear boundary, if any clear has happened.
    async fn cleared_boundary(&self) -> Result<Option<DateTime<Utc>>, BackendError>;

    /// Append and enforce the cap.
    ///
    /// Backends that can do both in one atomic step override this.
    async fn append_capped(&self, record: Vec<u8>, cap: usize) -> Result<RecordRef, BackendError> {
        let written = self.append_one(record).await?;
        if let Err(e) = self.evict_beyond(cap, &written).await {
            // The record itself is durable; an over-long log is repaired by the next append.
            warn!(backend = self.kind(), error = %e, "eviction after append failed");
        }
        Ok(written)
    }

    /// Raw bytes of up to `max` most recent records, newest first.
    ///
    /// The default lists refs and fetches them concurrently. A fetch that
    /// fails or exceeds `budget.fetch_timeout` drops that record only.
    async fn load_recent(&self, max: usize, budget: ReadBudget) -> Result<Vec<Vec<u8>>, BackendError> {
        let refs = tokio::time::timeout(budget.list_timeout, self.list_recent(max))
            .await
            .map_err(|_| BackendError::Timeout(format!("{} list_recent", self.kind())))??;

        let fetched: Vec<Option<Vec<u8>>> = stream::iter(refs)
            .map(|record| async move {
                match tokio::time::timeout(budget.fetch_timeout, self.fetch(&record)).await {
                    Ok(Ok(bytes)) => Some(bytes),
                    Ok(Err(e)) => {
                        warn!(backend = self.kind(), record = %record, error = %e, "dropping unreadable record");
                        None
                    }
                    Err(_) => {
                        warn!(backend = self.kind(), record = %record, "fetch timed out; dropping record");
                        None
                    }
                }
            })
            .buffered(FETCH_CONCURRENCY)
            .collect()
            .await;

        Ok(fetched.into_iter().flatten().collect())
    }
}

/// Persisted form of a clear boundary (sidecar file, reserved object, or key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClearMarker {
    pub cleared_at: DateTime<Utc>,
}

impl ClearMarker {
    pub(crate) fn encode(at: DateTime<Utc>) -> Vec<u8> {
        // Serializing a struct of one timestamp cannot fail.
        serde_json::to_vec(&ClearMarker { cleared_at: at }).unwrap_or_default()
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<DateTime<Utc>, BackendError> {
        serde_json::from_slice::<ClearMarker>(bytes)
            .map(|m| m.cleared_at)
            .map_err(|e| BackendError::corrupt(format!("clear marker: {e}")))
    }
}
