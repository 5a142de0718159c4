//! Logging utilities for storage and persistence events.
//!
//! Replay, repair, compaction and write-failure events go through `tracing` when the
//! `tracing` feature is enabled, and to stderr otherwise.

use std::path::Path;

use crate::error::PersistenceError;
use crate::persistence::ReplayStats;

/// Log the outcome of replaying a durable log on startup.
pub fn log_replay_complete(path: &Path, stats: &ReplayStats) {
    #[cfg(feature = "tracing")]
    tracing::info!(
        path = %path.display(),
        applied = stats.records_applied,
        corrupted = stats.records_corrupted,
        truncated = stats.torn_tail_truncated,
        "Replayed persistence log"
    );

    #[cfg(not(feature = "tracing"))]
    eprintln!(
        "[INFO] Replayed persistence log {}: {} applied, {} corrupted, truncated={}",
        path.display(),
        stats.records_applied,
        stats.records_corrupted,
        stats.torn_tail_truncated
    );
}

/// Log a complete frame that failed validation and was skipped.
pub fn log_corrupt_record(path: &Path, offset: u64, reason: &str) {
    #[cfg(feature = "tracing")]
    tracing::warn!(path = %path.display(), offset, reason, "Skipping corrupt record");

    #[cfg(not(feature = "tracing"))]
    eprintln!(
        "[WARN] Skipping corrupt record in {} at offset {}: {}",
        path.display(),
        offset,
        reason
    );
}

/// Log a partial trailing frame that was cut off.
pub fn log_torn_tail(path: &Path, offset: u64, dropped_bytes: u64) {
    #[cfg(feature = "tracing")]
    tracing::warn!(path = %path.display(), offset, dropped_bytes, "Truncating torn tail");

    #[cfg(not(feature = "tracing"))]
    eprintln!(
        "[WARN] Truncating torn tail in {} at offset {} ({} bytes)",
        path.display(),
        offset,
        dropped_bytes
    );
}

/// Log a compaction rewrite.
pub fn log_compaction(path: &Path, live_records: usize) {
    #[cfg(feature = "tracing")]
    tracing::debug!(path = %path.display(), live_records, "Compacted persistence log");

    #[cfg(not(feature = "tracing"))]
    eprintln!(
        "[DEBUG] Compacted persistence log {} to {} records",
        path.display(),
        live_records
    );
}

/// Log a durable write that failed; the mutation was not applied.
pub fn log_write_failed(path: &Path, error: &PersistenceError) {
    #[cfg(feature = "tracing")]
    tracing::error!(path = %path.display(), %error, "Durable write failed");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[ERROR] Durable write failed on {}: {}", path.display(), error);
}

/// Log that the log refuses further writes.
pub fn log_poisoned(path: &Path) {
    #[cfg(feature = "tracing")]
    tracing::error!(path = %path.display(), "Persistence log poisoned; reopen to recover");

    #[cfg(not(feature = "tracing"))]
    eprintln!(
        "[ERROR] Persistence log {} poisoned; reopen to recover",
        path.display()
    );
}

/// Log a checkpoint session acquiring its thread lease.
pub fn log_session_acquired(thread_id: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!(thread_id, "Checkpoint session acquired");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[DEBUG] Checkpoint session acquired: {}", thread_id);
}

/// Log a checkpoint session releasing its thread lease.
pub fn log_session_released(thread_id: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!(thread_id, "Checkpoint session released");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[DEBUG] Checkpoint session released: {}", thread_id);
}
