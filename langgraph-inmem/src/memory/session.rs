//! Scoped checkpoint session bound to one thread.
//!
//! A session holds the thread's lease for its whole lifetime, so checkpoints written through
//! it are never interleaved with another session's. The lease is returned in `Drop`, which runs
//! on every exit path: normal scope end, early `?` return, or unwinding.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::logging::{log_session_acquired, log_session_released};
use crate::memory::checkpoint::{CheckpointListItem, CheckpointTags};
use crate::memory::checkpointer::{validate_thread_id, CheckpointError, CheckpointStore};
use crate::memory::document::Document;
use crate::memory::memory_saver::MemorySaver;

impl MemorySaver {
    /// Acquires a session for `thread_id`, waiting while another session holds it.
    ///
    /// Plain [`CheckpointStore`] calls on the same thread are not blocked by the lease.
    pub async fn session(&self, thread_id: &str) -> Result<CheckpointSession<'_>, CheckpointError> {
        validate_thread_id(thread_id)?;
        let lease = Arc::clone(&*self.leases.entry(thread_id.to_string()).or_default());
        let _pending = PendingLease { saver: self, thread_id };
        let guard = lease.lock_owned().await;
        log_session_acquired(thread_id);
        Ok(CheckpointSession {
            saver: self,
            thread_id: thread_id.to_string(),
            lease: Some(guard),
        })
    }

    /// Forgets the lease of `thread_id` once no session holds or awaits it.
    fn release_lease(&self, thread_id: &str) {
        self.leases
            .remove_if(thread_id, |_, lease: &Arc<Mutex<()>>| Arc::strong_count(lease) == 1);
    }
}

/// Forgets the lease entry when a `session` call ends, including a call cancelled mid-wait.
/// Declared before the lock future so the future's `Arc` is dropped first.
struct PendingLease<'a> {
    saver: &'a MemorySaver,
    thread_id: &'a str,
}

impl Drop for PendingLease<'_> {
    fn drop(&mut self) {
        self.saver.release_lease(self.thread_id);
    }
}

/// Handle bound to one thread of a [`MemorySaver`].
///
/// `save` is `put` against the bound thread and `load` is `get` of its latest checkpoint.
///
/// **Interaction**: Created by [`MemorySaver::session`]; releases its lease on drop.
pub struct CheckpointSession<'a> {
    saver: &'a MemorySaver,
    thread_id: String,
    lease: Option<OwnedMutexGuard<()>>,
}

impl<'a> CheckpointSession<'a> {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Saves `blob` as the next checkpoint and returns its sequence.
    pub async fn save(&self, blob: &Document) -> Result<u64, CheckpointError> {
        self.saver.put(&self.thread_id, blob, None).await
    }

    pub async fn save_with_tags(&self, blob: &Document, tags: CheckpointTags) -> Result<u64, CheckpointError> {
        self.saver.put(&self.thread_id, blob, Some(tags)).await
    }

    /// Latest checkpoint blob of the bound thread.
    pub async fn load(&self) -> Result<Document, CheckpointError> {
        self.saver.get(&self.thread_id, None).await
    }

    pub async fn history(&self) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        self.saver.list_checkpoints(&self.thread_id).await
    }
}

impl std::fmt::Debug for CheckpointSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointSession")
            .field("thread_id", &self.thread_id)
            .field("held", &self.lease.is_some())
            .finish()
    }
}

impl Drop for CheckpointSession<'_> {
    fn drop(&mut self) {
        drop(self.lease.take());
        self.saver.release_lease(&self.thread_id);
        log_session_released(&self.thread_id);
    }
}
