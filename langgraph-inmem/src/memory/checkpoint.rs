//! Checkpoint and metadata types.
//!
//! A checkpoint is an opaque state blob saved for one execution thread, numbered by a
//! per-thread sequence starting at 1.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::memory::document::{encoded_len, Document};

/// Caller-supplied labels attached to a checkpoint (e.g. `source = "loop"`, `step = "3"`).
pub type CheckpointTags = BTreeMap<String, String>;

/// Metadata recorded with each checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at_ms: u64,
    /// Size of the blob's compact JSON encoding.
    pub size_bytes: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: CheckpointTags,
}

impl CheckpointMetadata {
    /// Metadata for `blob` stamped with the current time.
    pub fn for_blob(blob: &Document, tags: Option<CheckpointTags>) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            created_at_ms,
            size_bytes: encoded_len(blob),
            tags: tags.unwrap_or_default(),
        }
    }

    pub fn created_at(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(self.created_at_ms)
    }
}

/// One stored checkpoint.
///
/// **Interaction**: Returned by `CheckpointStore::get_checkpoint`.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub thread_id: String,
    pub sequence: u64,
    pub blob: Document,
    pub metadata: CheckpointMetadata,
}

/// Item returned by `CheckpointStore::list_checkpoints` for history views.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointListItem {
    pub sequence: u64,
    pub metadata: CheckpointMetadata,
}
