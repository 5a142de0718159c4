//! # Memory: Long-term Store and Checkpointing
//!
//! ## Overview
//!
//! The memory module provides two capabilities a graph runtime adapts to:
//!
//! 1. **Store**: [`StateStore`], a key-value store of JSON [`Document`]s isolated by
//!    hierarchical [`Namespace`] (e.g. `["users", "42", "prefs"]`), with equality filtering
//!    and paginated prefix search.
//! 2. **Checkpointer**: [`CheckpointStore`], an ordered history of opaque blobs per thread.
//!    Sequences start at 1 and grow by one per `put`.
//!
//! ## Search Semantics
//!
//! `search(prefix, query)` selects items whose namespace starts with `prefix` segment by
//! segment (an empty prefix selects everything), keeps the ones matching the [`Filter`],
//! orders them by `(namespace, key)`, then skips `offset` and takes `limit`.
//!
//! ## Implementations
//!
//! | Type              | Capability          | Persistence                    |
//! |-------------------|---------------------|--------------------------------|
//! | [`InMemoryStore`] | [`StateStore`]      | Optional `store.log`           |
//! | [`MemorySaver`]   | [`CheckpointStore`] | Optional `checkpoints.log`     |
//!
//! Both take a [`StoreConfig`](crate::StoreConfig); they may share one persistence directory.
//! [`CheckpointSession`] is the scoped per-thread handle returned by
//! [`MemorySaver::session`].

mod checkpoint;
mod checkpointer;
mod document;
mod filter;
mod in_memory_store;
mod memory_saver;
mod namespace;
mod session;
mod store;

pub use checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointTags};
pub use checkpointer::{CheckpointError, CheckpointStore};
pub use document::{deep_eq, Document};
pub use filter::Filter;
pub use in_memory_store::{InMemoryStore, STORE_LOG_FILE};
pub use memory_saver::{MemorySaver, CHECKPOINT_LOG_FILE};
pub use namespace::{Namespace, NamespaceIndex, NamespaceQuery};
pub use session::CheckpointSession;
pub use store::{SearchItem, SearchQuery, StateStore, StoreError};
