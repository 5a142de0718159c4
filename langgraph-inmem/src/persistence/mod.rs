//! Durable record log backing the store and the checkpoint saver.
//!
//! ## File Format
//! ```text
//! ┌────────────┬──────────────┬────────────┬──────────────────┐
//! │ magic (4)  │ len u32 (4)  │ crc32 (4)  │ JSON payload     │
//! │  "LGIM"    │ little-endian│ of payload │ (len bytes)      │
//! └────────────┴──────────────┴────────────┴──────────────────┘
//! ```
//!
//! Each mutation is one frame appended and synced before the in-memory state changes.
//! Replay applies frames in file order, so the newest frame for a key wins and tombstone
//! frames suppress earlier values. A trailing partial frame is cut off; a complete frame that
//! fails validation is skipped without affecting its neighbours.

mod codec;
mod log;

use serde::Serialize;

use crate::error::PersistenceError;

pub use codec::{encode_frame, HEADER_SIZE, MAGIC};
pub use log::RecordLog;

/// Outcome of replaying a log on open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Frames decoded and handed to the owner for replay.
    pub records_applied: u64,
    /// Complete frames skipped because of bad magic, checksum or payload.
    pub records_corrupted: u64,
    /// Whether trailing bytes after the last good frame were cut off.
    pub torn_tail_truncated: bool,
}

/// Where an owner records mutations before applying them in memory.
///
/// Held behind the owner's async writer gate, which also serializes mutations.
#[derive(Debug)]
pub(crate) enum Durability {
    Memory,
    Log(RecordLog),
    Closed,
}

impl Durability {
    /// Makes `record` durable (no-op in memory). On `Err` the caller must not apply it.
    pub async fn record<R: Serialize + Sync>(&mut self, record: &R) -> Result<(), PersistenceError> {
        match self {
            Durability::Memory => Ok(()),
            Durability::Log(log) => log.append(record).await,
            Durability::Closed => Err(PersistenceError::Closed),
        }
    }

    /// Rewrites the log with exactly `records` (no-op in memory).
    pub async fn compact<R: Serialize + Sync>(&mut self, records: &[R]) -> Result<(), PersistenceError> {
        match self {
            Durability::Log(log) => log.rewrite(records).await,
            Durability::Memory => Ok(()),
            Durability::Closed => Err(PersistenceError::Closed),
        }
    }

    /// Syncs and releases any file handle; later mutations fail with `Closed`.
    pub async fn close(&mut self) -> Result<(), PersistenceError> {
        match std::mem::replace(self, Durability::Closed) {
            Durability::Log(mut log) => log.close().await,
            Durability::Memory | Durability::Closed => Ok(()),
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Durability::Log(_))
    }
}
