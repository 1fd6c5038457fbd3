//! Process-local FIFO write queue.
//!
//! Serializes every read-modify-write of a single document: each job waits for
//! the previous job to finish before it reads the current state, so two
//! concurrent writers can never both read the same pre-write document.
//!
//! The queue is an explicit value handed to the backend that owns the
//! document (no module-level singleton). Clones share the same queue.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

/// FIFO chain of write jobs protecting exactly one resource.
///
/// Unbounded in depth; resets on process restart (the document itself is
/// durable). Built on `tokio::sync::Mutex`, whose waiters are woken in the
/// order they queued.
#[derive(Debug, Clone, Default)]
pub struct WriteQueue {
    turn: Arc<Mutex<()>>,
    depth: Arc<AtomicUsize>,
}

struct DepthGuard<'a>(&'a AtomicUsize);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` after every previously submitted job has completed.
    ///
    /// If the caller is cancelled while waiting, its slot is released without
    /// running the job.
    pub async fn run<F, Fut, T>(&self, job: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.depth.fetch_add(1, Ordering::AcqRel);
        let _depth = DepthGuard(&self.depth);
        let _turn = self.turn.lock().await;
        job().await
    }

    /// Jobs currently running or waiting.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }
}
