//! Checkpoint store capability.
//!
//! The graph runtime saves and resumes execution state through [`CheckpointStore`], keyed by
//! its own thread identifiers; blobs are opaque to the store.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::PersistenceError;
use crate::memory::checkpoint::{Checkpoint, CheckpointListItem, CheckpointTags};
use crate::memory::document::Document;

/// Error for checkpoint operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Thread has no checkpoints, or the requested sequence does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Empty thread id.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Durable storage could not be opened or written; the mutation was not applied.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl From<PersistenceError> for CheckpointError {
    fn from(e: PersistenceError) -> Self {
        CheckpointError::PersistenceUnavailable(e.to_string())
    }
}

pub(crate) fn validate_thread_id(thread_id: &str) -> Result<(), CheckpointError> {
    if thread_id.is_empty() {
        return Err(CheckpointError::InvalidArgument(
            "thread_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Per-thread checkpoint history.
///
/// Sequences for a thread start at 1 and strictly increase: a deleted sequence is never handed
/// out again while the thread exists. Reads without a sequence return the latest checkpoint.
/// A thread exists while it has checkpoints; once removed, its numbering starts over.
///
/// **Interaction**: Implemented by [`MemorySaver`](crate::MemorySaver); held by the runtime as
/// `Arc<dyn CheckpointStore>`.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Appends a checkpoint and returns its sequence.
    async fn put(
        &self,
        thread_id: &str,
        blob: &Document,
        tags: Option<CheckpointTags>,
    ) -> Result<u64, CheckpointError>;

    /// Checkpoint `sequence`, or the latest when `None`.
    async fn get_checkpoint(
        &self,
        thread_id: &str,
        sequence: Option<u64>,
    ) -> Result<Checkpoint, CheckpointError>;

    /// Blob of checkpoint `sequence`, or of the latest when `None`.
    async fn get(&self, thread_id: &str, sequence: Option<u64>) -> Result<Document, CheckpointError> {
        Ok(self.get_checkpoint(thread_id, sequence).await?.blob)
    }

    /// Threads with at least one checkpoint, sorted.
    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError>;

    /// History of `thread_id` ascending by sequence; empty for an unknown thread.
    async fn list_checkpoints(&self, thread_id: &str) -> Result<Vec<CheckpointListItem>, CheckpointError>;

    /// Deletes one checkpoint, or the whole thread when `sequence` is `None`.
    ///
    /// Returns how many checkpoints were removed. An explicit sequence that does not exist is
    /// `NotFound`; deleting an unknown thread without a sequence removes nothing.
    async fn delete(&self, thread_id: &str, sequence: Option<u64>) -> Result<usize, CheckpointError>;
}
