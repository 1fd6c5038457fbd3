use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use hooklog_core::{Clock, CoreError, EventId, IdGenerator, SystemClock, UuidV7Ids};
use hooklog_events::{EventRecord, Payload, codec};

use super::query::{self, ListQuery};
use crate::backend::{Backend, BackendError, ReadBudget};

/// Store-level failure, as seen by callers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The ingest body is not a well-formed JSON document.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A backend call failed or exceeded its time bound. Never retried here.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidPayload(msg) => StoreError::InvalidPayload(msg),
            other => StoreError::InvalidPayload(other.to_string()),
        }
    }
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        StoreError::BackendUnavailable(err.to_string())
    }
}

/// Retention and cost bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    /// Maximum retained records; the oldest are evicted beyond it.
    pub cap: usize,
    /// Most candidates read from the backend per list, whatever the caller asks.
    pub list_ceiling: usize,
    /// Largest limit a caller may request.
    pub max_limit: usize,
    /// Limit used when the caller gives none.
    pub default_limit: usize,
    /// Upper bound on each append, clear and boundary read.
    pub op_timeout: Duration,
    /// Upper bound on each single-record fetch during a list.
    pub fetch_timeout: Duration,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            cap: 2000,
            list_ceiling: 2000,
            max_limit: 500,
            default_limit: 300,
            op_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(2),
        }
    }
}

impl StoreLimits {
    fn read_budget(&self) -> ReadBudget {
        ReadBudget {
            list_timeout: self.op_timeout,
            fetch_timeout: self.fetch_timeout,
        }
    }
}

/// Capped, clearable, searchable event log over any [`Backend`].
///
/// ## Clear semantics
///
/// `clear()` records a boundary instant `T`; every later `list()` hides records
/// with `receivedAt <= T`. Whether stored bytes are also purged depends on the
/// backend (file and KV truncate; blob only hides). A `list()` already running
/// when `clear()` commits may return either view.
///
/// Appends made after a `clear()` through the same store (or a clone of it)
/// are always stamped strictly after `T`, even if the clock has not moved.
#[derive(Clone)]
pub struct EventStore {
    backend: Arc<dyn Backend>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    limits: StoreLimits,
    /// Latest boundary set by this process.
    clear_floor: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl core::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventStore")
            .field("backend", &self.backend.kind())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

async fn bounded<T>(
    limit: Duration,
    op: &'static str,
    fut: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => Err(StoreError::BackendUnavailable(format!(
            "{op} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

impl EventStore {
    pub fn new(
        backend: Arc<dyn Backend>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        limits: StoreLimits,
    ) -> Self {
        Self {
            backend,
            clock,
            ids,
            limits,
            clear_floor: Arc::new(Mutex::new(None)),
        }
    }

    /// System clock, UUIDv7 ids, default limits.
    pub fn with_defaults(backend: Arc<dyn Backend>) -> Self {
        Self::new(
            backend,
            Arc::new(SystemClock::new()),
            Arc::new(UuidV7Ids),
            StoreLimits::default(),
        )
    }

    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    fn floor(&self) -> std::sync::MutexGuard<'_, Option<DateTime<Utc>>> {
        self.clear_floor.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// `now`, moved just past the last local clear boundary if it ties or precedes it.
    fn stamp_after_floor(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self.floor() {
            Some(floor) if now <= floor => floor + chrono::Duration::microseconds(1),
            _ => now,
        }
    }

    /// Parse a raw ingest body and append it.
    pub async fn ingest(&self, body: &[u8]) -> Result<EventId, StoreError> {
        let payload = Payload::from_slice(body)?;
        self.append(payload).await
    }

    /// Stamp `payload` with a fresh id and `receivedAt`, store it, and enforce
    /// the cap. A failed or timed-out write is reported; nothing is retried.
    ///
    /// Only the write itself is bounded by `op_timeout`. For backends that evict
    /// in a separate step, eviction gets its own bound and a failure there is
    /// logged: the record is already durable.
    #[instrument(skip(self, payload), fields(backend = self.backend.kind()), err)]
    pub async fn append(&self, payload: Payload) -> Result<EventId, StoreError> {
        let mut record = EventRecord::ingest(payload, self.clock.as_ref(), self.ids.as_ref());
        record.received_at = self.stamp_after_floor(record.received_at);
        let bytes = codec::encode(&record).map_err(|e| StoreError::InvalidPayload(e.to_string()))?;

        let limit = self.limits.op_timeout;
        if self.backend.caps_on_write() {
            bounded(limit, "append", self.backend.append_capped(bytes, self.limits.cap)).await?;
        } else {
            let written = bounded(limit, "append", self.backend.append_one(bytes)).await?;
            let evicted = bounded(limit, "evict", self.backend.evict_beyond(self.limits.cap, &written)).await;
            if let Err(e) = evicted {
                warn!(id = %record.id, error = %e, "eviction after append failed; record is stored");
            }
        }

        debug!(id = %record.id, received_at = %record.received_at, "event stored");
        Ok(record.id)
    }

    /// Newest-first records after the clear boundary that match `query`.
    #[instrument(skip(self, query), fields(backend = self.backend.kind(), search_len = query.search.len()), err)]
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<EventRecord>, StoreError> {
        let limit = query::clamp_limit(query.limit, self.limits.default_limit, self.limits.max_limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let raw = self
            .backend
            .load_recent(self.limits.list_ceiling, self.limits.read_budget())
            .await?;
        let records = codec::decode_lossy(raw);

        // Read after loading: a clear that lands mid-read still hides what it covers.
        let boundary = bounded(
            self.limits.op_timeout,
            "cleared_boundary",
            self.backend.cleared_boundary(),
        )
        .await?;

        let visible: Vec<EventRecord> = records
            .into_iter()
            .filter(|r| !r.is_cleared_by(boundary))
            .collect();

        Ok(query::filter(visible, &query.search, limit))
    }

    /// Hide every record received at or before now. Returns the boundary.
    #[instrument(skip(self), fields(backend = self.backend.kind()), err)]
    pub async fn clear(&self) -> Result<DateTime<Utc>, StoreError> {
        let at = self.clock.now();
        {
            let mut floor = self.floor();
            *floor = Some(floor.map_or(at, |f| f.max(at)));
        }
        bounded(self.limits.op_timeout, "clear", self.backend.mark_cleared(at)).await?;
        info!(cleared_at = %at, "event log cleared");
        Ok(at)
    }
}
