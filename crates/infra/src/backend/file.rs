//! Single-document file backend.
//!
//! The whole log is one JSON array on disk, newest record first:
//!
//! ```text
//! [
//! {"id":"…","receivedAt":"…","payload":{…}},
//! {"id":"…","receivedAt":"…","payload":{…}}
//! ]
//! ```
//!
//! Appending is a read-modify-write of the whole document, so every mutation
//! runs on the [`WriteQueue`] handed to [`FileBackend::new`]. Documents are
//! replaced atomically (temp file, `fsync`, rename): a failed write leaves the
//! previous document intact.
//!
//! Clear truncates the document *and* writes a `<file>.cleared` sidecar. The
//! sidecar keeps records that were stamped before the clear but queued behind
//! it hidden from listings.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::value::RawValue;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::write_queue::WriteQueue;
use super::{Backend, BackendError, ClearMarker, ReadBudget, RecordRef};

type Document = Vec<Box<RawValue>>;

/// File-backed, write-serialized event log.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    cleared_path: PathBuf,
    queue: WriteQueue,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, queue: WriteQueue) -> Self {
        let path = path.into();
        let cleared_path = sibling(&path, "cleared");
        Self {
            path,
            cleared_path,
            queue,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn queue(&self) -> &WriteQueue {
        &self.queue
    }

    /// Read the document for listing. A corrupt document reads as empty.
    async fn read_for_listing(&self) -> Result<Document, BackendError> {
        match self.read_document().await {
            Err(BackendError::Corrupt(reason)) => {
                warn!(path = %self.path.display(), %reason, "log document is corrupt; listing nothing");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Read the document for a write. A corrupt document is moved aside so
    /// the write does not destroy it, and the log restarts empty.
    async fn read_for_write(&self) -> Result<Document, BackendError> {
        match self.read_document().await {
            Err(BackendError::Corrupt(reason)) => {
                let aside = sibling(
                    &self.path,
                    &format!("corrupt-{}", Utc::now().timestamp_millis()),
                );
                fs::rename(&self.path, &aside).await?;
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    %reason,
                    "log document was corrupt; moved aside and starting a new one"
                );
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn read_document(&self) -> Result<Document, BackendError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice::<Document>(&bytes)
            .map_err(|e| BackendError::corrupt(format!("{}: {e}", self.path.display())))
    }

    async fn write_document(&self, doc: &Document) -> Result<(), BackendError> {
        let mut out = Vec::with_capacity(doc.iter().map(|r| r.get().len() + 2).sum::<usize>() + 4);
        out.extend_from_slice(b"[\n");
        for (idx, raw) in doc.iter().enumerate() {
            if idx > 0 {
                out.extend_from_slice(b",\n");
            }
            out.extend_from_slice(raw.get().as_bytes());
        }
        out.extend_from_slice(b"\n]\n");
        write_atomically(&self.path, &out).await
    }
}

#[async_trait]
impl Backend for FileBackend {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn caps_on_write(&self) -> bool {
        true
    }

    #[instrument(skip(self, record), fields(path = %self.path.display(), bytes = record.len()), err)]
    async fn append_one(&self, record: Vec<u8>) -> Result<RecordRef, BackendError> {
        self.append_capped(record, usize::MAX).await
    }

    #[instrument(skip(self, _just_written), fields(path = %self.path.display()), err)]
    async fn evict_beyond(&self, cap: usize, _just_written: &RecordRef) -> Result<usize, BackendError> {
        self.queue
            .run(|| async move {
                let mut doc = self.read_for_write().await?;
                if doc.len() <= cap {
                    return Ok(0);
                }
                let evicted = doc.len() - cap;
                doc.truncate(cap);
                self.write_document(&doc).await?;
                Ok::<_, BackendError>(evicted)
            })
            .await
    }

    async fn list_recent(&self, max: usize) -> Result<Vec<RecordRef>, BackendError> {
        let doc = self.read_for_listing().await?;
        Ok((0..doc.len().min(max)).map(RecordRef::Position).collect())
    }

    async fn fetch(&self, record: &RecordRef) -> Result<Vec<u8>, BackendError> {
        let RecordRef::Position(idx) = record else {
            return Err(BackendError::not_found(format!("{record} is not a file position")));
        };
        let doc = self.read_for_listing().await?;
        doc.get(*idx)
            .map(|raw| raw.get().as_bytes().to_vec())
            .ok_or_else(|| BackendError::not_found(record.to_string()))
    }

    #[instrument(skip(self), fields(path = %self.path.display()), err)]
    async fn mark_cleared(&self, at: DateTime<Utc>) -> Result<(), BackendError> {
        self.queue
            .run(|| async move {
                // Boundary first: if truncation fails the records are still hidden.
                write_atomically(&self.cleared_path, &ClearMarker::encode(at)).await?;
                self.write_document(&Vec::new()).await?;
                info!(cleared_at = %at, "file log cleared");
                Ok::<_, BackendError>(())
            })
            .await
    }

    async fn cleared_boundary(&self) -> Result<Option<DateTime<Utc>>, BackendError> {
        match fs::read(&self.cleared_path).await {
            Ok(bytes) => ClearMarker::decode(&bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Prepend and truncate in one queued read-modify-write.
    async fn append_capped(&self, record: Vec<u8>, cap: usize) -> Result<RecordRef, BackendError> {
        let text = String::from_utf8(record)
            .map_err(|e| BackendError::corrupt(format!("record is not UTF-8: {e}")))?;
        let raw = RawValue::from_string(text)
            .map_err(|e| BackendError::corrupt(format!("record is not JSON: {e}")))?;

        self.queue
            .run(|| async move {
                let mut doc = self.read_for_write().await?;
                doc.insert(0, raw);
                if doc.len() > cap {
                    debug!(evicted = doc.len() - cap, "evicting oldest records");
                    doc.truncate(cap.max(1));
                }
                self.write_document(&doc).await?;
                Ok::<_, BackendError>(RecordRef::Position(0))
            })
            .await
    }

    /// One document read instead of a fetch per record.
    async fn load_recent(&self, max: usize, budget: ReadBudget) -> Result<Vec<Vec<u8>>, BackendError> {
        let doc = tokio::time::timeout(budget.list_timeout, self.read_for_listing())
            .await
            .map_err(|_| BackendError::Timeout(format!("read {}", self.path.display())))??;
        Ok(doc
            .into_iter()
            .take(max)
            .map(|raw| raw.get().as_bytes().to_vec())
            .collect())
    }
}

/// `<dir>/<file name>.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "events.json".into());
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Replace `path` with `bytes` via temp file + fsync + rename.
///
/// Each call writes its own `<file>.<uuid>.tmp`, so concurrent writers of the
/// same path never share a temp file; the last rename wins.
pub(crate) async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let tmp = sibling(path, &format!("{}.tmp", Uuid::now_v7().simple()));
    let result: std::io::Result<()> = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, path).await
    }
    .await;
    if result.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }
    Ok(result?)
}
