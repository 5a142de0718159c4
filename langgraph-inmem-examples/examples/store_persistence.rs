//! Disk persistence: write through a persistent store and saver, reopen, and observe the
//! replayed state.
//!
//! ```bash
//! LANGGRAPH_INMEM_PERSIST_PATH=/tmp/lg-inmem cargo run -p langgraph-inmem-examples --example store_persistence
//! ```
//!
//! Variables may also come from `.env`. Without `LANGGRAPH_INMEM_PERSIST_PATH` a directory
//! under the system temp dir is used.

use langgraph_inmem::{CheckpointStore, InMemoryStore, MemorySaver, StateStore, StoreConfig};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    langgraph_inmem_examples::init_tracing();

    let mut config = StoreConfig::from_env();
    if !config.is_persistent() {
        config = config.with_persist_path(std::env::temp_dir().join("langgraph-inmem-example"));
    }
    println!("persisting to {:?}", config.persist_path());

    let ns = vec!["app".to_string(), "settings".to_string()];
    {
        let store = InMemoryStore::open(config.clone()).await?;
        let saver = MemorySaver::open(config.clone()).await?;
        println!("store replay: {:?}", store.replay_stats());

        let runs = match store.get(&ns, "runs").await {
            Ok(v) => v.get("count").and_then(|c| c.as_u64()).unwrap_or(0),
            Err(_) => 0,
        };
        store.put(&ns, "runs", &json!({ "count": runs + 1 })).await?;
        store.put(&ns, "scratch", &json!({ "tmp": true })).await?;
        store.delete(&ns, "scratch").await?;
        saver.put("run-log", &json!({ "run": runs + 1 }), None).await?;

        store.close().await?;
        saver.close().await?;
    }

    let store = InMemoryStore::open(config.clone()).await?;
    let saver = MemorySaver::open(config).await?;
    println!("runs: {}", store.get(&ns, "runs").await?);
    println!("scratch after restart: {:?}", store.get(&ns, "scratch").await.err());
    println!(
        "checkpoints for run-log: {}",
        saver.list_checkpoints("run-log").await?.len()
    );
    Ok(())
}
