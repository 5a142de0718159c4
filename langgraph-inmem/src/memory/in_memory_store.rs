//! In-memory [`StateStore`] with optional write-through persistence.
//!
//! Items live in a `BTreeMap` ordered by `(namespace, key)`, so a namespace-prefix search is a
//! range scan. Mutations pass through an async writer gate: the record is made durable first
//! (when persistence is configured), then the in-memory state is updated under a short write
//! lock. Readers only take the read lock and never wait on disk I/O.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::StoreConfig;
use crate::memory::document::Document;
use crate::memory::namespace::{
    validate_key, validate_namespace, validate_segments, Namespace, NamespaceIndex, NamespaceQuery,
};
use crate::memory::store::{SearchItem, SearchQuery, StateStore, StoreError};
use crate::persistence::{Durability, RecordLog, ReplayStats};

/// Log file name under the persistence directory.
pub const STORE_LOG_FILE: &str = "store.log";

/// Durable store mutation. `Delete` is the tombstone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum StoreRecord {
    Put {
        namespace: Namespace,
        key: String,
        value: Document,
    },
    Delete {
        namespace: Namespace,
        key: String,
    },
}

#[derive(Debug, Default)]
struct StoreState {
    items: BTreeMap<(Namespace, String), Document>,
    index: NamespaceIndex,
}

impl StoreState {
    fn apply(&mut self, record: StoreRecord) -> bool {
        match record {
            StoreRecord::Put {
                namespace,
                key,
                value,
            } => {
                self.index.register(&namespace, &key);
                self.items.insert((namespace, key), value);
                true
            }
            StoreRecord::Delete { namespace, key } => {
                let removed = self.items.remove(&(namespace.clone(), key.clone())).is_some();
                self.index.remove_key(&namespace, &key);
                self.index.unregister_if_empty(&namespace);
                removed
            }
        }
    }

    fn contains(&self, namespace: &[String], key: &str) -> bool {
        self.items.contains_key(&(namespace.to_vec(), key.to_string()))
    }

    fn live_records(&self) -> Vec<StoreRecord> {
        self.items
            .iter()
            .map(|((namespace, key), value)| StoreRecord::Put {
                namespace: namespace.clone(),
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    fn prefixed<'a>(
        &'a self,
        prefix: &'a [String],
    ) -> impl Iterator<Item = (&'a (Namespace, String), &'a Document)> + 'a {
        self.items
            .range((prefix.to_vec(), String::new())..)
            .take_while(move |((namespace, _), _)| namespace.starts_with(prefix))
    }
}

/// Namespaced key-value store held in memory, optionally persisted to a record log.
///
/// **Search policy**: a namespace matches when its leading segments equal the prefix
/// (an empty prefix matches all). Matches are filtered, ordered by `(namespace, key)`, then
/// `offset` and `limit` are applied.
///
/// **Durability policy**: if the durable write fails, the mutation fails with
/// `PersistenceUnavailable` and memory is left unchanged. A write that outlives the bounded
/// wait may still reach the disk after the error is returned; the log is then poisoned, and
/// the next open replays that mutation.
///
/// **Interaction**: Used as `Arc<dyn StateStore>` by the graph runtime.
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    writer: Mutex<Durability>,
    replay_stats: Option<ReplayStats>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("items", &self.len())
            .field("replay_stats", &self.replay_stats)
            .finish()
    }
}

impl InMemoryStore {
    /// Creates an empty memory-only store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            writer: Mutex::new(Durability::Memory),
            replay_stats: None,
        }
    }

    /// Creates a store from `config`.
    ///
    /// With a persistence directory, every previously recorded mutation is replayed before
    /// this returns. An unreadable or unwritable directory, or a replay that exceeds
    /// `persist_timeout`, fails with `PersistenceUnavailable`.
    pub async fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let Some(dir) = config.persist_path.as_ref() else {
            return Ok(Self::new());
        };
        let (log, records, stats) =
            RecordLog::open::<StoreRecord>(dir.join(STORE_LOG_FILE), config.persist_timeout).await?;

        let mut state = StoreState::default();
        for record in records {
            state.apply(record);
        }

        let mut durability = Durability::Log(log);
        let stale = stats.records_applied as usize != state.items.len() || stats.records_corrupted > 0;
        if config.compact_on_open && stale {
            durability.compact(&state.live_records()).await?;
        }

        Ok(Self {
            state: RwLock::new(state),
            writer: Mutex::new(durability),
            replay_stats: Some(stats),
        })
    }

    /// Replay outcome when opened with persistence; `None` for memory-only stores.
    pub fn replay_stats(&self) -> Option<ReplayStats> {
        self.replay_stats
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.read_state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().items.is_empty()
    }

    /// Whether mutations are written to disk.
    pub async fn is_persistent(&self) -> bool {
        self.writer.lock().await.is_persistent()
    }

    /// Rewrites the log with only live items. No-op for memory-only stores.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let mut writer = self.writer.lock().await;
        let records = self.read_state().live_records();
        writer.compact(&records).await?;
        Ok(())
    }

    /// Syncs and releases the log. Reads keep working; later mutations fail with
    /// `PersistenceUnavailable`.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.writer.lock().await.close().await?;
        Ok(())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        // Mutations complete before the guard drops; a poisoned lock still holds valid state.
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn item_path(namespace: &[String], key: &str) -> String {
    format!("{}/{}", namespace.join("/"), key)
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn put(&self, namespace: &[String], key: &str, value: &Document) -> Result<(), StoreError> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let record = StoreRecord::Put {
            namespace: namespace.to_vec(),
            key: key.to_string(),
            value: value.clone(),
        };
        let mut writer = self.writer.lock().await;
        writer.record(&record).await?;
        self.write_state().apply(record);
        Ok(())
    }

    async fn get(&self, namespace: &[String], key: &str) -> Result<Document, StoreError> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        self.read_state()
            .items
            .get(&(namespace.to_vec(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(item_path(namespace, key)))
    }

    async fn delete(&self, namespace: &[String], key: &str) -> Result<bool, StoreError> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut writer = self.writer.lock().await;
        if !self.read_state().contains(namespace, key) {
            return Ok(false);
        }
        let record = StoreRecord::Delete {
            namespace: namespace.to_vec(),
            key: key.to_string(),
        };
        writer.record(&record).await?;
        Ok(self.write_state().apply(record))
    }

    async fn search(
        &self,
        namespace_prefix: &[String],
        query: SearchQuery,
    ) -> Result<Vec<SearchItem>, StoreError> {
        validate_segments(namespace_prefix)?;
        let state = self.read_state();
        let matches = state
            .prefixed(namespace_prefix)
            .filter(|(_, value)| query.filter.as_ref().map_or(true, |f| f.matches(value)))
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|((namespace, key), value)| SearchItem {
                namespace: namespace.clone(),
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        Ok(matches)
    }

    async fn list_namespaces(&self, query: &NamespaceQuery) -> Result<Vec<Namespace>, StoreError> {
        if let Some(prefix) = &query.prefix {
            validate_segments(prefix)?;
        }
        Ok(self.read_state().index.list(query))
    }

    async fn list_keys(&self, namespace: &[String]) -> Result<Vec<String>, StoreError> {
        validate_namespace(namespace)?;
        Ok(self.read_state().index.keys(namespace))
    }
}
