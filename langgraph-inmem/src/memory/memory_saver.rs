//! In-memory [`CheckpointStore`] with optional persistence.
//!
//! Threads live in a `DashMap` of ordered per-thread histories, so readers of different
//! threads do not contend. Mutations go through the async writer gate: sequence assignment,
//! the durable write and the in-memory insert happen while it is held, so two `put`s on one
//! thread can never receive the same sequence.
//!
//! Each history keeps the highest sequence it ever assigned. Deleting checkpoints never lowers
//! it; only removing the whole thread does. Compaction writes it out as a `watermark` record
//! when the newest checkpoint is gone, so restarts keep numbering where they left off.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::StoreConfig;
use crate::memory::checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointTags};
use crate::memory::checkpointer::{validate_thread_id, CheckpointError, CheckpointStore};
use crate::memory::document::Document;
use crate::persistence::{Durability, RecordLog, ReplayStats};

/// Log file name under the persistence directory.
pub const CHECKPOINT_LOG_FILE: &str = "checkpoints.log";

/// Durable saver mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum SaverRecord {
    Put {
        thread_id: String,
        sequence: u64,
        blob: Document,
        metadata: CheckpointMetadata,
    },
    Delete {
        thread_id: String,
        sequence: Option<u64>,
    },
    /// Highest sequence assigned on a live thread whose newest checkpoint was deleted.
    Watermark {
        thread_id: String,
        sequence: u64,
    },
    Clear,
}

#[derive(Debug, Clone)]
struct Stored {
    blob: Document,
    metadata: CheckpointMetadata,
}

/// Checkpoints of one thread plus the highest sequence ever assigned to it.
#[derive(Debug, Default)]
struct History {
    checkpoints: BTreeMap<u64, Stored>,
    last_sequence: u64,
}

impl History {
    fn insert(&mut self, sequence: u64, stored: Stored) {
        self.last_sequence = self.last_sequence.max(sequence);
        self.checkpoints.insert(sequence, stored);
    }

    fn latest(&self) -> Option<(&u64, &Stored)> {
        self.checkpoints.iter().next_back()
    }

    fn len(&self) -> usize {
        self.checkpoints.len()
    }

    fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

fn apply(threads: &DashMap<String, History>, record: SaverRecord) -> usize {
    match record {
        SaverRecord::Put {
            thread_id,
            sequence,
            blob,
            metadata,
        } => {
            threads
                .entry(thread_id)
                .or_default()
                .insert(sequence, Stored { blob, metadata });
            0
        }
        SaverRecord::Delete {
            thread_id,
            sequence: Some(sequence),
        } => {
            let removed = threads
                .get_mut(&thread_id)
                .map_or(0, |mut h| usize::from(h.checkpoints.remove(&sequence).is_some()));
            threads.remove_if(&thread_id, |_, h| h.is_empty());
            removed
        }
        SaverRecord::Delete {
            thread_id,
            sequence: None,
        } => threads.remove(&thread_id).map_or(0, |(_, h)| h.len()),
        SaverRecord::Watermark {
            thread_id,
            sequence,
        } => {
            if let Some(mut h) = threads.get_mut(&thread_id) {
                h.last_sequence = h.last_sequence.max(sequence);
            }
            0
        }
        SaverRecord::Clear => {
            let removed = threads.iter().map(|h| h.len()).sum();
            threads.clear();
            removed
        }
    }
}

/// Checkpoint saver keeping per-thread histories in memory, optionally persisted.
///
/// Sequences are strictly increasing per thread: each `put` gets the highest sequence ever
/// assigned on the thread + 1, even if that checkpoint was deleted since. A thread that loses
/// all its checkpoints is removed and a later `put` starts it again at 1.
///
/// **Durability policy**: if the durable write fails, the operation fails with
/// `PersistenceUnavailable` and memory is left unchanged. A write that outlives the bounded
/// wait may still reach the disk after the error is returned; the log is then poisoned, and
/// the next open replays that checkpoint.
///
/// **Interaction**: Implements [`CheckpointStore`] for the graph runtime; hands out
/// [`CheckpointSession`](crate::CheckpointSession)s via [`session`](Self::session).
pub struct MemorySaver {
    threads: DashMap<String, History>,
    writer: Mutex<Durability>,
    pub(crate) leases: DashMap<String, Arc<Mutex<()>>>,
    replay_stats: Option<ReplayStats>,
}

impl std::fmt::Debug for MemorySaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySaver")
            .field("threads", &self.threads.len())
            .field("active_sessions", &self.leases.len())
            .field("replay_stats", &self.replay_stats)
            .finish()
    }
}

impl MemorySaver {
    /// Creates an empty memory-only saver.
    pub fn new() -> Self {
        Self {
            threads: DashMap::new(),
            writer: Mutex::new(Durability::Memory),
            leases: DashMap::new(),
            replay_stats: None,
        }
    }

    /// Creates a saver from `config`, replaying `checkpoints.log` when a persistence directory
    /// is set. The directory may be shared with an `InMemoryStore`.
    pub async fn open(config: StoreConfig) -> Result<Self, CheckpointError> {
        let Some(dir) = config.persist_path.as_ref() else {
            return Ok(Self::new());
        };
        let (log, records, stats) =
            RecordLog::open::<SaverRecord>(dir.join(CHECKPOINT_LOG_FILE), config.persist_timeout)
                .await?;

        let threads = DashMap::new();
        for record in records {
            apply(&threads, record);
        }
        let saver = Self {
            threads,
            writer: Mutex::new(Durability::Log(log)),
            leases: DashMap::new(),
            replay_stats: Some(stats),
        };

        let live = saver.live_records().len();
        if config.compact_on_open && (stats.records_applied as usize != live || stats.records_corrupted > 0) {
            saver.compact().await?;
        }
        Ok(saver)
    }

    /// Replay outcome when opened with persistence; `None` for memory-only savers.
    pub fn replay_stats(&self) -> Option<ReplayStats> {
        self.replay_stats
    }

    /// Number of threads with checkpoints.
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Whether `thread_id` has at least one checkpoint.
    pub fn contains(&self, thread_id: &str) -> bool {
        self.threads.contains_key(thread_id)
    }

    /// Metadata of the latest checkpoint of `thread_id`.
    pub fn metadata(&self, thread_id: &str) -> Option<CheckpointMetadata> {
        self.threads
            .get(thread_id)
            .and_then(|h| h.latest().map(|(_, s)| s.metadata.clone()))
    }

    /// Number of threads with a session held or awaited.
    pub fn active_sessions(&self) -> usize {
        self.leases.len()
    }

    /// Removes every checkpoint of every thread.
    pub async fn clear_all(&self) -> Result<usize, CheckpointError> {
        let mut writer = self.writer.lock().await;
        writer.record(&SaverRecord::Clear).await?;
        Ok(apply(&self.threads, SaverRecord::Clear))
    }

    /// Rewrites the log with only live checkpoints. No-op for memory-only savers.
    pub async fn compact(&self) -> Result<(), CheckpointError> {
        let mut writer = self.writer.lock().await;
        let records = self.live_records();
        writer.compact(&records).await?;
        Ok(())
    }

    /// Syncs and releases the log. Reads keep working; later mutations fail with
    /// `PersistenceUnavailable`.
    pub async fn close(&self) -> Result<(), CheckpointError> {
        self.writer.lock().await.close().await?;
        Ok(())
    }

    /// One `put` per live checkpoint, grouped by thread in sequence order, followed by a
    /// `watermark` where the thread's newest checkpoint was deleted.
    fn live_records(&self) -> Vec<SaverRecord> {
        let mut thread_ids: Vec<String> = self.threads.iter().map(|e| e.key().clone()).collect();
        thread_ids.sort();
        let mut records = Vec::new();
        for thread_id in thread_ids {
            let Some(history) = self.threads.get(&thread_id) else {
                continue;
            };
            for (sequence, stored) in &history.checkpoints {
                records.push(SaverRecord::Put {
                    thread_id: thread_id.clone(),
                    sequence: *sequence,
                    blob: stored.blob.clone(),
                    metadata: stored.metadata.clone(),
                });
            }
            let newest = history.latest().map_or(0, |(sequence, _)| *sequence);
            if history.last_sequence > newest {
                records.push(SaverRecord::Watermark {
                    thread_id: thread_id.clone(),
                    sequence: history.last_sequence,
                });
            }
        }
        records
    }

    fn next_sequence(&self, thread_id: &str) -> u64 {
        self.threads
            .get(thread_id)
            .map_or(0, |h| h.last_sequence)
            + 1
    }
}

impl Default for MemorySaver {
    fn default() -> Self {
        Self::new()
    }
}

fn checkpoint_path(thread_id: &str, sequence: Option<u64>) -> String {
    match sequence {
        Some(s) => format!("thread {} checkpoint {}", thread_id, s),
        None => format!("thread {}", thread_id),
    }
}

#[async_trait]
impl CheckpointStore for MemorySaver {
    async fn put(
        &self,
        thread_id: &str,
        blob: &Document,
        tags: Option<CheckpointTags>,
    ) -> Result<u64, CheckpointError> {
        validate_thread_id(thread_id)?;
        let mut writer = self.writer.lock().await;
        let sequence = self.next_sequence(thread_id);
        let record = SaverRecord::Put {
            thread_id: thread_id.to_string(),
            sequence,
            blob: blob.clone(),
            metadata: CheckpointMetadata::for_blob(blob, tags),
        };
        writer.record(&record).await?;
        apply(&self.threads, record);
        Ok(sequence)
    }

    async fn get_checkpoint(
        &self,
        thread_id: &str,
        sequence: Option<u64>,
    ) -> Result<Checkpoint, CheckpointError> {
        validate_thread_id(thread_id)?;
        let history = self
            .threads
            .get(thread_id)
            .ok_or_else(|| CheckpointError::NotFound(checkpoint_path(thread_id, None)))?;
        let found = match sequence {
            Some(s) => history.checkpoints.get_key_value(&s),
            None => history.latest(),
        };
        let (seq, stored) =
            found.ok_or_else(|| CheckpointError::NotFound(checkpoint_path(thread_id, sequence)))?;
        Ok(Checkpoint {
            thread_id: thread_id.to_string(),
            sequence: *seq,
            blob: stored.blob.clone(),
            metadata: stored.metadata.clone(),
        })
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError> {
        let mut threads: Vec<String> = self.threads.iter().map(|e| e.key().clone()).collect();
        threads.sort();
        Ok(threads)
    }

    async fn list_checkpoints(&self, thread_id: &str) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        validate_thread_id(thread_id)?;
        Ok(self
            .threads
            .get(thread_id)
            .map(|h| {
                h.checkpoints
                    .iter()
                    .map(|(sequence, stored)| CheckpointListItem {
                        sequence: *sequence,
                        metadata: stored.metadata.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, thread_id: &str, sequence: Option<u64>) -> Result<usize, CheckpointError> {
        validate_thread_id(thread_id)?;
        let mut writer = self.writer.lock().await;
        let exists = match sequence {
            Some(s) => self
                .threads
                .get(thread_id)
                .map_or(false, |h| h.checkpoints.contains_key(&s)),
            None => self.threads.contains_key(thread_id),
        };
        if !exists {
            return match sequence {
                Some(_) => Err(CheckpointError::NotFound(checkpoint_path(thread_id, sequence))),
                None => Ok(0),
            };
        }
        let record = SaverRecord::Delete {
            thread_id: thread_id.to_string(),
            sequence,
        };
        writer.record(&record).await?;
        Ok(apply(&self.threads, record))
    }
}
