//! Append-only record log with bounded-wait disk I/O.
//!
//! All file work runs on the blocking pool and is wrapped in `tokio::time::timeout`.
//! Write ordering per append: encode, write, `sync_data`, then return so the owner may apply
//! the mutation in memory. A failed append is rolled back to the previous length; if that is
//! not possible (or the wait expired with the write still in flight) the log is poisoned and
//! refuses further appends. A write still in flight when the wait expired may complete
//! afterwards; it is then part of the log and replayed on the next open.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::codec::{encode_frame, scan_frames};
use super::ReplayStats;
use crate::error::PersistenceError;
use crate::logging;

struct LogFile {
    file: Option<File>,
    len: u64,
}

/// Durable append-only log of records of one type.
///
/// **Interaction**: Owned by `InMemoryStore` / `MemorySaver` behind their writer gate, so
/// appends are already serialized when they reach here.
pub struct RecordLog {
    path: PathBuf,
    inner: Arc<Mutex<LogFile>>,
    timeout: Duration,
    poisoned: bool,
}

impl std::fmt::Debug for RecordLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordLog")
            .field("path", &self.path)
            .field("timeout", &self.timeout)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

impl RecordLog {
    /// Opens (or creates) the log at `path` and returns every readable record in file order.
    ///
    /// Creates the parent directory. A torn tail is truncated before the log is reopened for
    /// appending. Fails if the location cannot be read or written within `timeout`.
    pub async fn open<R>(
        path: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<(Self, Vec<R>, ReplayStats), PersistenceError>
    where
        R: DeserializeOwned + Send + 'static,
    {
        let path = path.into();
        let task_path = path.clone();
        let (file, len, records, stats) =
            run_blocking(timeout, move || open_blocking::<R>(&task_path)).await?;
        logging::log_replay_complete(&path, &stats);
        Ok((
            Self {
                path,
                inner: Arc::new(Mutex::new(LogFile {
                    file: Some(file),
                    len,
                })),
                timeout,
                poisoned: false,
            },
            records,
            stats,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Current length in bytes of the durable log.
    pub fn len_bytes(&self) -> u64 {
        lock(&self.inner).len
    }

    /// Appends one record and syncs it to disk.
    ///
    /// On `Err` the record is not part of the log (or the log is poisoned), and the caller must
    /// not apply the mutation.
    pub async fn append<R: Serialize + Sync>(&mut self, record: &R) -> Result<(), PersistenceError> {
        if self.poisoned {
            return Err(PersistenceError::Poisoned(self.path.clone()));
        }
        let frame = encode_frame(record)?;
        let inner = Arc::clone(&self.inner);
        let path = self.path.clone();
        let task = tokio::task::spawn_blocking(move || append_blocking(&inner, &path, &frame));

        let err = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(()))) => return Ok(()),
            Ok(Ok(Err(AppendFailure { error, rolled_back }))) => {
                if !rolled_back {
                    self.poison();
                }
                error
            }
            Ok(Err(join)) => {
                self.poison();
                PersistenceError::Task(join.to_string())
            }
            Err(_) => {
                // The write may still land; nothing after it can be trusted.
                self.poison();
                PersistenceError::Timeout(self.timeout)
            }
        };
        logging::log_write_failed(&self.path, &err);
        Err(err)
    }

    /// Replaces the log with exactly `records` (temp file, sync, rename).
    pub async fn rewrite<R: Serialize + Sync>(&mut self, records: &[R]) -> Result<(), PersistenceError> {
        if self.poisoned {
            return Err(PersistenceError::Poisoned(self.path.clone()));
        }
        let mut bytes = Vec::new();
        for record in records {
            bytes.extend_from_slice(&encode_frame(record)?);
        }
        let inner = Arc::clone(&self.inner);
        let path = self.path.clone();
        let result = run_blocking(self.timeout, move || rewrite_blocking(&inner, &path, &bytes)).await;
        match result {
            Ok(()) => {
                logging::log_compaction(&self.path, records.len());
                Ok(())
            }
            Err(e) => {
                self.poison();
                logging::log_write_failed(&self.path, &e);
                Err(e)
            }
        }
    }

    /// Syncs and releases the file handle. Later appends fail with `Closed`.
    pub async fn close(&mut self) -> Result<(), PersistenceError> {
        let inner = Arc::clone(&self.inner);
        let path = self.path.clone();
        run_blocking(self.timeout, move || {
            let mut guard = lock(&inner);
            if let Some(file) = guard.file.take() {
                file.sync_all().map_err(|e| PersistenceError::io(&path, e))?;
            }
            Ok(())
        })
        .await
    }

    fn poison(&mut self) {
        if !self.poisoned {
            self.poisoned = true;
            logging::log_poisoned(&self.path);
        }
    }

    #[cfg(test)]
    pub(crate) fn poison_for_test(&mut self) {
        self.poison();
    }

    #[cfg(test)]
    pub(crate) fn set_timeout_for_test(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Holds the file lock on another thread for `hold`; returns once the lock is taken.
    #[cfg(test)]
    pub(crate) fn stall_for_test(&self, hold: Duration) -> std::thread::JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || {
            let _guard = lock(&inner);
            let _ = locked_tx.send(());
            std::thread::sleep(hold);
        });
        let _ = locked_rx.recv();
        handle
    }

    #[cfg(test)]
    pub(crate) fn swap_file_for_test(&self, file: File) {
        lock(&self.inner).file = Some(file);
    }
}

struct AppendFailure {
    error: PersistenceError,
    rolled_back: bool,
}

fn lock(inner: &Mutex<LogFile>) -> std::sync::MutexGuard<'_, LogFile> {
    // The guarded data stays consistent: `len` is only advanced after a successful sync.
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

async fn run_blocking<T, F>(timeout: Duration, f: F) -> Result<T, PersistenceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PersistenceError> + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(PersistenceError::Task(join.to_string())),
        Err(_) => Err(PersistenceError::Timeout(timeout)),
    }
}

fn open_append(path: &Path) -> Result<File, PersistenceError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PersistenceError::io(path, e))
}

fn open_blocking<R: DeserializeOwned>(
    path: &Path,
) -> Result<(File, u64, Vec<R>, ReplayStats), PersistenceError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| PersistenceError::io(dir, e))?;
    }
    let buf = match fs::read(path) {
        Ok(buf) => buf,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(PersistenceError::io(path, e)),
    };

    let scan = scan_frames::<R>(&buf);
    for frame in &scan.corrupt {
        logging::log_corrupt_record(path, frame.offset, &frame.reason);
    }
    let torn = scan.has_torn_tail(buf.len());
    let file = open_append(path)?;
    if torn {
        logging::log_torn_tail(path, scan.valid_len, buf.len() as u64 - scan.valid_len);
        file.set_len(scan.valid_len)
            .and_then(|_| file.sync_all())
            .map_err(|e| PersistenceError::io(path, e))?;
    }

    let stats = ReplayStats {
        records_applied: scan.records.len() as u64,
        records_corrupted: scan.corrupt.len() as u64,
        torn_tail_truncated: torn,
    };
    Ok((file, scan.valid_len, scan.records, stats))
}

fn append_blocking(inner: &Mutex<LogFile>, path: &Path, frame: &[u8]) -> Result<(), AppendFailure> {
    let mut guard = lock(inner);
    let start = guard.len;
    let file = guard.file.as_mut().ok_or(AppendFailure {
        error: PersistenceError::Closed,
        rolled_back: true,
    })?;
    match file.write_all(frame).and_then(|_| file.sync_data()) {
        Ok(()) => {
            guard.len = start + frame.len() as u64;
            Ok(())
        }
        Err(e) => {
            let rolled_back = file.set_len(start).and_then(|_| file.sync_data()).is_ok();
            Err(AppendFailure {
                error: PersistenceError::io(path, e),
                rolled_back,
            })
        }
    }
}

fn rewrite_blocking(inner: &Mutex<LogFile>, path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let mut guard = lock(inner);
    if guard.file.is_none() {
        return Err(PersistenceError::Closed);
    }
    let tmp = path.with_extension("log.compact");
    {
        let mut out = File::create(&tmp).map_err(|e| PersistenceError::io(&tmp, e))?;
        out.write_all(bytes)
            .and_then(|_| out.sync_all())
            .map_err(|e| PersistenceError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| PersistenceError::io(path, e))?;
    if let Some(dir) = path.parent() {
        // Directory fsync makes the rename durable where the platform supports it.
        if let Ok(d) = File::open(dir) {
            let _ = d.sync_all();
        }
    }
    guard.file = Some(open_append(path)?);
    guard.len = bytes.len() as u64;
    Ok(())
}
