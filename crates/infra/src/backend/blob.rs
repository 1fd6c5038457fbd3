//! Object-per-record backend.
//!
//! Each record is its own object `<prefix><uuid>.json`. The store gives no
//! ordering guarantee, so listing sorts by upload time (newest first) and
//! breaks ties by name; names are UUIDv7, so equal timestamps still sort in
//! creation order for a single writer.
//!
//! The clear boundary lives in the reserved object `<prefix>_cleared.json`,
//! which never shows up as a record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::object_store::{ObjectMeta, ObjectStore};
use super::{Backend, BackendError, ClearMarker, RecordRef};

const MARKER_NAME: &str = "_cleared.json";

#[derive(Debug)]
pub struct BlobBackend<S> {
    store: S,
    prefix: String,
    marker: String,
}

impl<S: ObjectStore> BlobBackend<S> {
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let marker = format!("{prefix}{MARKER_NAME}");
        Self { store, prefix, marker }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record objects, newest first.
    async fn sorted_records(&self) -> Result<Vec<ObjectMeta>, BackendError> {
        let mut objects: Vec<ObjectMeta> = self
            .store
            .list(&self.prefix)
            .await?
            .into_iter()
            .filter(|o| o.name != self.marker)
            .collect();
        objects.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(objects)
    }
}

#[async_trait]
impl<S: ObjectStore> Backend for BlobBackend<S> {
    fn kind(&self) -> &'static str {
        "blob"
    }

    #[instrument(skip(self, record), fields(prefix = %self.prefix, bytes = record.len()), err)]
    async fn append_one(&self, record: Vec<u8>) -> Result<RecordRef, BackendError> {
        let name = format!("{}{}.json", self.prefix, Uuid::now_v7());
        let meta = self.store.put(&name, record).await?;
        Ok(RecordRef::Object {
            name: meta.name,
            uploaded_at: meta.uploaded_at,
        })
    }

    #[instrument(skip(self, just_written), fields(prefix = %self.prefix), err)]
    async fn evict_beyond(&self, cap: usize, just_written: &RecordRef) -> Result<usize, BackendError> {
        let keep_name = match just_written {
            RecordRef::Object { name, .. } => Some(name.as_str()),
            RecordRef::Position(_) => None,
        };

        // The listing may not include the fresh object yet; it always counts
        // as one of the `cap` survivors.
        let others = self
            .sorted_records()
            .await?
            .into_iter()
            .filter(|o| Some(o.name.as_str()) != keep_name);
        let keep_others = cap.max(1) - usize::from(keep_name.is_some());

        let mut evicted = 0;
        for object in others.skip(keep_others) {
            match self.store.delete(&object.name).await {
                Ok(()) => evicted += 1,
                Err(e) => warn!(object = %object.name, error = %e, "failed to evict object"),
            }
        }
        if evicted > 0 {
            debug!(evicted, "evicted oldest objects");
        }
        Ok(evicted)
    }

    async fn list_recent(&self, max: usize) -> Result<Vec<RecordRef>, BackendError> {
        Ok(self
            .sorted_records()
            .await?
            .into_iter()
            .take(max)
            .map(|o| RecordRef::Object {
                name: o.name,
                uploaded_at: o.uploaded_at,
            })
            .collect())
    }

    async fn fetch(&self, record: &RecordRef) -> Result<Vec<u8>, BackendError> {
        let RecordRef::Object { name, .. } = record else {
            return Err(BackendError::not_found(format!("{record} is not an object")));
        };
        self.store.get(name).await
    }

    #[instrument(skip(self), fields(prefix = %self.prefix), err)]
    async fn mark_cleared(&self, at: DateTime<Utc>) -> Result<(), BackendError> {
        self.store.put(&self.marker, ClearMarker::encode(at)).await?;
        info!(cleared_at = %at, "blob log cleared");
        Ok(())
    }

    async fn cleared_boundary(&self) -> Result<Option<DateTime<Utc>>, BackendError> {
        match self.store.get(&self.marker).await {
            Ok(bytes) => ClearMarker::decode(&bytes).map(Some),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
