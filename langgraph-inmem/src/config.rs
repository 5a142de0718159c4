//! Construction config for [`InMemoryStore`](crate::InMemoryStore) and
//! [`MemorySaver`](crate::MemorySaver).
//!
//! The only recognized storage option is the persistence directory; absent means memory-only.
//! Both the store and the saver may share one directory (they use different log files).

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var: persistence directory. Unset or empty means memory-only.
pub const ENV_PERSIST_PATH: &str = "LANGGRAPH_INMEM_PERSIST_PATH";
/// Env var: bounded wait for each disk operation, in milliseconds.
pub const ENV_PERSIST_TIMEOUT_MS: &str = "LANGGRAPH_INMEM_PERSIST_TIMEOUT_MS";
/// Env var: `true`/`false`, rewrite the log with live state after replay.
pub const ENV_COMPACT_ON_OPEN: &str = "LANGGRAPH_INMEM_COMPACT_ON_OPEN";

const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Store / saver construction config.
///
/// **Interaction**: Passed to `InMemoryStore::open` and `MemorySaver::open`. `Default` is
/// memory-only.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory for the durable logs. `None` keeps everything in memory.
    pub persist_path: Option<PathBuf>,
    /// Upper bound for a single disk operation (open, replay, append). Exceeding it fails the
    /// operation with `PersistenceUnavailable` instead of hanging.
    pub persist_timeout: Duration,
    /// Rewrite the log with only live records after a successful replay.
    pub compact_on_open: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persist_path: None,
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
            compact_on_open: true,
        }
    }
}

impl StoreConfig {
    /// Memory-only config.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Config persisting under `path`.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self::default().with_persist_path(path)
    }

    pub fn with_persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_path = Some(path.into());
        self
    }

    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    pub fn with_compact_on_open(mut self, compact: bool) -> Self {
        self.compact_on_open = compact;
        self
    }

    /// Whether a persistence directory is configured.
    pub fn is_persistent(&self) -> bool {
        self.persist_path.is_some()
    }

    pub fn persist_path(&self) -> Option<&Path> {
        self.persist_path.as_deref()
    }

    /// Fill config from env vars.
    ///
    /// `LANGGRAPH_INMEM_PERSIST_PATH`, `LANGGRAPH_INMEM_PERSIST_TIMEOUT_MS` and
    /// `LANGGRAPH_INMEM_COMPACT_ON_OPEN` are all optional; unparsable values fall back to the
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let persist_path = lookup(ENV_PERSIST_PATH)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        let persist_timeout = lookup(ENV_PERSIST_TIMEOUT_MS)
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.persist_timeout);
        let compact_on_open = lookup(ENV_COMPACT_ON_OPEN)
            .and_then(|s| s.trim().parse::<bool>().ok())
            .unwrap_or(defaults.compact_on_open);
        Self {
            persist_path,
            persist_timeout,
            compact_on_open,
        }
    }
}
