//! Object-store clients used by [`super::BlobBackend`].
//!
//! An object store is a flat keyspace of named byte blobs, each carrying the
//! time it was uploaded. Listing order is unspecified, and may lag behind
//! uploads; callers sort by `uploaded_at` themselves.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info};

use hooklog_core::Clock;

use super::BackendError;
use super::file::write_atomically;

/// Metadata of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    pub size: u64,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create or overwrite an object.
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ObjectMeta, BackendError>;

    /// Object contents, or `NotFound`.
    async fn get(&self, name: &str) -> Result<Vec<u8>, BackendError>;

    /// Metadata of every object whose name starts with `prefix`, in no
    /// particular order.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, BackendError>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, name: &str) -> Result<(), BackendError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Filesystem
// ─────────────────────────────────────────────────────────────────────────────

/// Directory-backed object store: object `a/b.json` lives at `<root>/a/b.json`,
/// and its upload time is the file's modification time.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!(path = %root.display(), "object store initialized");
        Ok(Self { root })
    }

    fn object_path(&self, name: &str) -> Result<PathBuf, BackendError> {
        let rel = Path::new(name);
        let valid = !name.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(BackendError::not_found(format!("invalid object name: {name:?}")));
        }
        Ok(self.root.join(rel))
    }

    async fn meta_for(&self, name: String, path: &Path) -> Result<ObjectMeta, BackendError> {
        let meta = fs::metadata(path).await?;
        let uploaded_at = meta.modified().map(DateTime::<Utc>::from)?;
        Ok(ObjectMeta {
            name,
            uploaded_at,
            size: meta.len(),
        })
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ObjectMeta, BackendError> {
        let path = self.object_path(name)?;
        write_atomically(&path, &bytes).await?;
        debug!(object = name, size = bytes.len(), "stored object");
        self.meta_for(name.to_string(), &path).await
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, BackendError> {
        let path = self.object_path(name)?;
        Ok(fs::read(&path).await?)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, BackendError> {
        let (dir, file_prefix) = prefix.rsplit_once('/').unwrap_or(("", prefix));
        let dir_path = if dir.is_empty() {
            self.root.clone()
        } else {
            self.object_path(dir)?
        };

        let mut entries = match fs::read_dir(&dir_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !file_name.starts_with(file_prefix) || file_name.ends_with(".tmp") {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = if dir.is_empty() {
                file_name
            } else {
                format!("{dir}/{file_name}")
            };
            match self.meta_for(name, &entry.path()).await {
                Ok(meta) => out.push(meta),
                // Deleted between read_dir and stat.
                Err(BackendError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    async fn delete(&self, name: &str) -> Result<(), BackendError> {
        let path = self.object_path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Fail,
    Delay(Duration),
}

/// In-memory object store with an injectable clock and per-object fault
/// injection.
///
/// Intended for tests/dev.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    faults: RwLock<HashMap<String, Fault>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryObjectStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            faults: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Make every `get` of `name` fail.
    pub fn fail_gets_of(&self, name: &str) {
        if let Ok(mut faults) = self.faults.write() {
            faults.insert(name.to_string(), Fault::Fail);
        }
    }

    /// Make every `get` of `name` take `delay`.
    pub fn delay_gets_of(&self, name: &str, delay: Duration) {
        if let Ok(mut faults) = self.faults.write() {
            faults.insert(name.to_string(), Fault::Delay(delay));
        }
    }

    /// Store an object with an explicit upload time.
    pub fn insert_at(&self, name: &str, bytes: Vec<u8>, uploaded_at: DateTime<Utc>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(name.to_string(), StoredObject { bytes, uploaded_at });
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    fn fault(&self, name: &str) -> Option<Fault> {
        self.faults.read().ok().and_then(|f| f.get(name).copied())
    }
}

fn poisoned() -> BackendError {
    BackendError::unavailable("lock poisoned")
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ObjectMeta, BackendError> {
        let uploaded_at = self.clock.now();
        let size = bytes.len() as u64;
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        objects.insert(name.to_string(), StoredObject { bytes, uploaded_at });
        Ok(ObjectMeta {
            name: name.to_string(),
            uploaded_at,
            size,
        })
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, BackendError> {
        match self.fault(name) {
            Some(Fault::Fail) => return Err(BackendError::unavailable(format!("injected failure: {name}"))),
            Some(Fault::Delay(delay)) => tokio::time::sleep(delay).await,
            None => {}
        }
        let objects = self.objects.read().map_err(|_| poisoned())?;
        objects
            .get(name)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| BackendError::not_found(name.to_string()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, BackendError> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, o)| ObjectMeta {
                name: name.clone(),
                uploaded_at: o.uploaded_at,
                size: o.bytes.len() as u64,
            })
            .collect())
    }

    async fn delete(&self, name: &str) -> Result<(), BackendError> {
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        objects.remove(name);
        Ok(())
    }
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ObjectMeta, BackendError> {
        (**self).put(name, bytes).await
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, BackendError> {
        (**self).get(name).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, BackendError> {
        (**self).list(prefix).await
    }

    async fn delete(&self, name: &str) -> Result<(), BackendError> {
        (**self).delete(name).await
    }
}
