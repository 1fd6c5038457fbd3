//! Key-value list backend.
//!
//! Layout:
//! - `<key>`: list of encoded records, newest at index 0
//! - `<key>:cleared`: clear marker
//!
//! Ordering and cap enforcement are delegated to the store's atomic list
//! primitives (push-front and trim-to-range). No in-process lock is taken.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use super::{Backend, BackendError, ClearMarker, ReadBudget, RecordRef};

/// Atomic list/string primitives a KV store must offer.
///
/// Every method is a single atomic operation at the store (a single command
/// or a `MULTI` transaction), never a read-then-write from the client.
#[async_trait]
pub trait KvClient: Send + Sync {
    /// `LPUSH key value`, then (if `keep` is set) `LTRIM key 0 keep-1`, atomically.
    async fn push_front(&self, key: &str, value: Vec<u8>, keep: Option<usize>) -> Result<(), BackendError>;

    /// `LTRIM key 0 keep-1`.
    async fn trim(&self, key: &str, keep: usize) -> Result<(), BackendError>;

    /// `LRANGE key start stop` (inclusive).
    async fn range(&self, key: &str, start: usize, stop: usize) -> Result<Vec<Vec<u8>>, BackendError>;

    /// `LINDEX key index`.
    async fn index(&self, key: &str, index: usize) -> Result<Option<Vec<u8>>, BackendError>;

    /// `GET key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// `MULTI; DEL list_key; SET marker_key marker; EXEC`.
    async fn clear_list(&self, list_key: &str, marker_key: &str, marker: Vec<u8>) -> Result<(), BackendError>;
}

/// List-backed event log over any [`KvClient`].
#[derive(Debug)]
pub struct KvBackend<C> {
    client: C,
    key: String,
    cleared_key: String,
}

impl<C: KvClient> KvBackend<C> {
    pub fn new(client: C, key: impl Into<String>) -> Self {
        let key = key.into();
        let cleared_key = format!("{key}:cleared");
        Self {
            client,
            key,
            cleared_key,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl<C: KvClient> Backend for KvBackend<C> {
    fn kind(&self) -> &'static str {
        "kv"
    }

    fn caps_on_write(&self) -> bool {
        true
    }

    #[instrument(skip(self, record), fields(key = %self.key, bytes = record.len()), err)]
    async fn append_one(&self, record: Vec<u8>) -> Result<RecordRef, BackendError> {
        self.client.push_front(&self.key, record, None).await?;
        Ok(RecordRef::Position(0))
    }

    async fn evict_beyond(&self, cap: usize, _just_written: &RecordRef) -> Result<usize, BackendError> {
        // The newest record sits at index 0, so trimming to [0, cap) never drops it.
        // LTRIM does not report how much it removed.
        self.client.trim(&self.key, cap.max(1)).await?;
        Ok(0)
    }

    async fn list_recent(&self, max: usize) -> Result<Vec<RecordRef>, BackendError> {
        if max == 0 {
            return Ok(Vec::new());
        }
        let items = self.client.range(&self.key, 0, max - 1).await?;
        Ok((0..items.len()).map(RecordRef::Position).collect())
    }

    async fn fetch(&self, record: &RecordRef) -> Result<Vec<u8>, BackendError> {
        let RecordRef::Position(idx) = record else {
            return Err(BackendError::not_found(format!("{record} is not a list position")));
        };
        self.client
            .index(&self.key, *idx)
            .await?
            .ok_or_else(|| BackendError::not_found(record.to_string()))
    }

    #[instrument(skip(self), fields(key = %self.key), err)]
    async fn mark_cleared(&self, at: DateTime<Utc>) -> Result<(), BackendError> {
        self.client
            .clear_list(&self.key, &self.cleared_key, ClearMarker::encode(at))
            .await?;
        info!(cleared_at = %at, "kv log cleared");
        Ok(())
    }

    async fn cleared_boundary(&self) -> Result<Option<DateTime<Utc>>, BackendError> {
        match self.client.get(&self.cleared_key).await? {
            Some(bytes) => ClearMarker::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Push and trim in one transaction.
    #[instrument(skip(self, record), fields(key = %self.key, bytes = record.len()), err)]
    async fn append_capped(&self, record: Vec<u8>, cap: usize) -> Result<RecordRef, BackendError> {
        self.client.push_front(&self.key, record, Some(cap.max(1))).await?;
        Ok(RecordRef::Position(0))
    }

    /// One `LRANGE` instead of an `LINDEX` per record; positions shift under
    /// concurrent pushes, a single range read does not.
    async fn load_recent(&self, max: usize, budget: ReadBudget) -> Result<Vec<Vec<u8>>, BackendError> {
        if max == 0 {
            return Ok(Vec::new());
        }
        tokio::time::timeout(budget.list_timeout, self.client.range(&self.key, 0, max - 1))
            .await
            .map_err(|_| BackendError::Timeout(format!("LRANGE {}", self.key)))?
    }
}

/// In-process [`KvClient`] with the same atomicity as a single Redis node.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryKvClient {
    lists: RwLock<HashMap<String, VecDeque<Vec<u8>>>>,
    strings: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryKvClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, key: &str) -> usize {
        self.lists
            .read()
            .map(|lists| lists.get(key).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }
}

fn poisoned() -> BackendError {
    BackendError::unavailable("lock poisoned")
}

#[async_trait]
impl KvClient for InMemoryKvClient {
    async fn push_front(&self, key: &str, value: Vec<u8>, keep: Option<usize>) -> Result<(), BackendError> {
        let mut lists = self.lists.write().map_err(|_| poisoned())?;
        let list = lists.entry(key.to_string()).or_default();
        list.push_front(value);
        if let Some(keep) = keep {
            list.truncate(keep);
        }
        Ok(())
    }

    async fn trim(&self, key: &str, keep: usize) -> Result<(), BackendError> {
        let mut lists = self.lists.write().map_err(|_| poisoned())?;
        if let Some(list) = lists.get_mut(key) {
            list.truncate(keep);
        }
        Ok(())
    }

    async fn range(&self, key: &str, start: usize, stop: usize) -> Result<Vec<Vec<u8>>, BackendError> {
        let lists = self.lists.read().map_err(|_| poisoned())?;
        Ok(lists
            .get(key)
            .map(|list| {
                list.iter()
                    .skip(start)
                    .take(stop.saturating_sub(start).saturating_add(1))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn index(&self, key: &str, index: usize) -> Result<Option<Vec<u8>>, BackendError> {
        let lists = self.lists.read().map_err(|_| poisoned())?;
        Ok(lists.get(key).and_then(|list| list.get(index).cloned()))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let strings = self.strings.read().map_err(|_| poisoned())?;
        Ok(strings.get(key).cloned())
    }

    async fn clear_list(&self, list_key: &str, marker_key: &str, marker: Vec<u8>) -> Result<(), BackendError> {
        // Lock order: lists, then strings (same everywhere).
        let mut lists = self.lists.write().map_err(|_| poisoned())?;
        let mut strings = self.strings.write().map_err(|_| poisoned())?;
        lists.remove(list_key);
        strings.insert(marker_key.to_string(), marker);
        Ok(())
    }
}

#[async_trait]
impl<C: KvClient + ?Sized> KvClient for std::sync::Arc<C> {
    async fn push_front(&self, key: &str, value: Vec<u8>, keep: Option<usize>) -> Result<(), BackendError> {
        (**self).push_front(key, value, keep).await
    }

    async fn trim(&self, key: &str, keep: usize) -> Result<(), BackendError> {
        (**self).trim(key, keep).await
    }

    async fn range(&self, key: &str, start: usize, stop: usize) -> Result<Vec<Vec<u8>>, BackendError> {
        (**self).range(key, start, stop).await
    }

    async fn index(&self, key: &str, index: usize) -> Result<Option<Vec<u8>>, BackendError> {
        (**self).index(key, index).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        (**self).get(key).await
    }

    async fn clear_list(&self, list_key: &str, marker_key: &str, marker: Vec<u8>) -> Result<(), BackendError> {
        (**self).clear_list(list_key, marker_key, marker).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn rec(n: u32) -> Vec<u8> {
        format!(r#"{{"id":"evt-{n}"}}"#).into_bytes()
    }

    fn ids(items: Vec<Vec<u8>>) -> Vec<String> {
        items
            .into_iter()
            .map(|b| String::from_utf8(b).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn push_and_trim_keep_the_newest() {
        let client = Arc::new(InMemoryKvClient::new());
        let backend = KvBackend::new(client.clone(), "hooklog:test");

        for n in 1..=5 {
            backend.append_capped(rec(n), 3).await.unwrap();
        }
        assert_eq!(client.len("hooklog:test"), 3);

        let recent = backend.load_recent(10, ReadBudget::default()).await.unwrap();
        assert_eq!(
            ids(recent),
            vec![r#"{"id":"evt-5"}"#, r#"{"id":"evt-4"}"#, r#"{"id":"evt-3"}"#]
        );
    }

    #[tokio::test]
    async fn list_and_fetch_by_position() {
        let backend = KvBackend::new(InMemoryKvClient::new(), "k");
        backend.append_one(rec(1)).await.unwrap();
        backend.append_one(rec(2)).await.unwrap();

        let refs = backend.list_recent(5).await.unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(backend.fetch(&refs[1]).await.unwrap(), rec(1));
        assert!(matches!(
            backend.fetch(&RecordRef::Position(9)).await,
            Err(BackendError::NotFound(_))
        ));
        assert!(backend.list_recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn evict_beyond_is_a_range_trim() {
        let backend = KvBackend::new(InMemoryKvClient::new(), "k");
        for n in 1..=4 {
            backend.append_one(rec(n)).await.unwrap();
        }
        backend.evict_beyond(2, &RecordRef::Position(0)).await.unwrap();
        let recent = backend.load_recent(10, ReadBudget::default()).await.unwrap();
        assert_eq!(ids(recent), vec![r#"{"id":"evt-4"}"#, r#"{"id":"evt-3"}"#]);
    }

    #[tokio::test]
    async fn clear_drops_list_and_sets_marker() {
        let client = Arc::new(InMemoryKvClient::new());
        let backend = KvBackend::new(client.clone(), "k");
        backend.append_one(rec(1)).await.unwrap();

        let at = Utc::now();
        backend.mark_cleared(at).await.unwrap();
        assert!(client.is_empty("k"));
        assert_eq!(backend.cleared_boundary().await.unwrap(), Some(at));
    }
}
