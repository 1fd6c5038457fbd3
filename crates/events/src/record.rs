use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hooklog_core::{Clock, EventId, IdGenerator};

use crate::payload::Payload;

/// One stored webhook delivery.
///
/// Serialized shape (shared by every backend):
///
/// ```json
/// { "id": "0190…", "receivedAt": "2024-05-01T12:00:00.123Z", "payload": { … } }
/// ```
///
/// - `id` is generated at ingestion and never reused.
/// - `received_at` is captured at ingestion and is the basis for clear
///   boundaries.
/// - `payload` is opaque to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: EventId,
    pub received_at: DateTime<Utc>,
    pub payload: Payload,
}

impl EventRecord {
    pub fn new(id: EventId, received_at: DateTime<Utc>, payload: Payload) -> Self {
        Self {
            id,
            received_at,
            payload,
        }
    }

    /// Stamp a payload with a fresh id and the current time.
    pub fn ingest(payload: Payload, clock: &dyn Clock, ids: &dyn IdGenerator) -> Self {
        Self::new(ids.new_id(), clock.now(), payload)
    }

    /// Whether this record is hidden by a clear boundary.
    pub fn is_cleared_by(&self, boundary: Option<DateTime<Utc>>) -> bool {
        boundary.is_some_and(|b| self.received_at <= b)
    }
}
