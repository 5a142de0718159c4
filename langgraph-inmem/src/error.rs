//! Persistence error types.
//!
//! Raised by the [`persistence`](crate::persistence) log and surfaced to callers as
//! `PersistenceUnavailable` on [`StoreError`](crate::StoreError) and
//! [`CheckpointError`](crate::CheckpointError).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of the durable record log.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem operation failed on `path`.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded for writing.
    #[error("record encoding failed: {0}")]
    Encode(String),

    /// The disk operation did not finish within the configured bound.
    #[error("persistence operation timed out after {0:?}")]
    Timeout(Duration),

    /// An earlier write left the log in an unknown state; reopen the store to recover.
    #[error("persistence log {} is poisoned by an earlier failed write", .0.display())]
    Poisoned(PathBuf),

    /// The log was already closed.
    #[error("persistence log is closed")]
    Closed,

    /// The blocking I/O task panicked or was cancelled.
    #[error("persistence task failed: {0}")]
    Task(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display of Io contains the path and the underlying message.
    #[test]
    fn persistence_error_display_io_contains_path() {
        let err = PersistenceError::io(
            "/tmp/store.log",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let s = err.to_string();
        assert!(s.contains("/tmp/store.log"), "{}", s);
        assert!(s.contains("denied"), "{}", s);
    }

    /// **Scenario**: Timeout reports the configured bound.
    #[test]
    fn persistence_error_display_timeout() {
        let err = PersistenceError::Timeout(Duration::from_millis(250));
        assert!(err.to_string().contains("250ms"), "{}", err);
    }
}
