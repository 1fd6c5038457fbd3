//! Redis-backed [`KvClient`] (optional, `redis` feature).
//!
//! Push-and-trim and clear run as `MULTI`/`EXEC` pipelines, so each is one
//! atomic step at the server. A multiplexed connection is shared by all
//! callers; clones are cheap.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::instrument;

use super::BackendError;
use super::kv::KvClient;

#[derive(Clone)]
pub struct RedisKvClient {
    conn: MultiplexedConnection,
}

impl core::fmt::Debug for RedisKvClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisKvClient").finish_non_exhaustive()
    }
}

fn redis_err(op: &str, e: redis::RedisError) -> BackendError {
    BackendError::unavailable(format!("{op} failed: {e}"))
}

/// Redis uses signed, inclusive list indexes.
fn idx(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

impl RedisKvClient {
    /// Connect to `redis_url` (e.g. "redis://localhost:6379").
    #[instrument(skip(redis_url), err)]
    pub async fn connect(redis_url: &str) -> Result<Self, BackendError> {
        let client = redis::Client::open(redis_url).map_err(|e| redis_err("open", e))?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| redis_err("connect", e))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvClient for RedisKvClient {
    async fn push_front(&self, key: &str, value: Vec<u8>, keep: Option<usize>) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().lpush(key, value).ignore();
        if let Some(keep) = keep {
            pipe.ltrim(key, 0, idx(keep.saturating_sub(1))).ignore();
        }
        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| redis_err("LPUSH/LTRIM", e))
    }

    async fn trim(&self, key: &str, keep: usize) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        conn.ltrim::<_, ()>(key, 0, idx(keep.saturating_sub(1)))
            .await
            .map_err(|e| redis_err("LTRIM", e))
    }

    async fn range(&self, key: &str, start: usize, stop: usize) -> Result<Vec<Vec<u8>>, BackendError> {
        let mut conn = self.conn.clone();
        conn.lrange(key, idx(start), idx(stop))
            .await
            .map_err(|e| redis_err("LRANGE", e))
    }

    async fn index(&self, key: &str, index: usize) -> Result<Option<Vec<u8>>, BackendError> {
        let mut conn = self.conn.clone();
        conn.lindex(key, idx(index))
            .await
            .map_err(|e| redis_err("LINDEX", e))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(|e| redis_err("GET", e))
    }

    async fn clear_list(&self, list_key: &str, marker_key: &str, marker: Vec<u8>) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .del(list_key)
            .ignore()
            .set(marker_key, marker)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| redis_err("DEL/SET", e))
    }
}
