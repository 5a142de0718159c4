//! # LangGraph in-memory runtime storage
//!
//! In-process storage for LangGraph-style graph runtimes: a namespaced key-value
//! [`InMemoryStore`] for long-term application memory and a [`MemorySaver`] that keeps an
//! ordered checkpoint history per execution thread. Both can optionally write every mutation
//! to an append-only log on disk and replay it on startup.
//!
//! ## Main Modules
//!
//! - [`memory`]: [`StateStore`] and [`CheckpointStore`] capabilities, their in-memory
//!   implementations, namespace index, filter engine and scoped checkpoint sessions.
//! - [`persistence`]: framed record log (checksums, torn-tail repair, compaction).
//! - [`config`]: [`StoreConfig`], shared by the store and the saver.
//! - [`logging`]: structured events, via `tracing` when the `tracing` feature is on.
//!
//! ## Features
//!
//! - `tracing` (default): emit events through the `tracing` crate instead of stderr.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use langgraph_inmem::{CheckpointStore, InMemoryStore, MemorySaver, SearchQuery, StateStore};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//! let ns = vec!["users".to_string(), "42".to_string()];
//! store.put(&ns, "prefs", &json!({ "theme": "dark" })).await?;
//! let hits = store
//!     .search(&["users".to_string()], SearchQuery::new().filter_value(json!({ "theme": "dark" }))?)
//!     .await?;
//! assert_eq!(hits.len(), 1);
//!
//! let saver = MemorySaver::new();
//! let seq = saver.put("t1", &json!({ "step": 1 }), None).await?;
//! assert_eq!(seq, 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod persistence;

pub use config::StoreConfig;
pub use error::PersistenceError;
pub use memory::{
    Checkpoint, CheckpointError, CheckpointListItem, CheckpointMetadata, CheckpointSession,
    CheckpointStore, CheckpointTags, Document, Filter, InMemoryStore, MemorySaver, Namespace,
    NamespaceIndex, NamespaceQuery, SearchItem, SearchQuery, StateStore, StoreError,
};
pub use persistence::ReplayStats;
