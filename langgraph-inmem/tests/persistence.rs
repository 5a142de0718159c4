//! Integration tests for disk persistence: restart replay, tombstones, corrupt and torn
//! records, startup failure, store and saver sharing one directory.

use std::fs;

use langgraph_inmem::persistence::HEADER_SIZE;
use langgraph_inmem::{
    CheckpointError, CheckpointStore, InMemoryStore, MemorySaver, Namespace, NamespaceQuery,
    SearchQuery, StateStore, StoreConfig, StoreError,
};
use serde_json::json;
use tempfile::TempDir;

fn ns(segments: &[&str]) -> Namespace {
    segments.iter().map(|s| s.to_string()).collect()
}

fn config(dir: &TempDir) -> StoreConfig {
    StoreConfig::persistent(dir.path())
}

#[tokio::test]
async fn restart_replays_puts_and_tombstones() {
    let dir = TempDir::new().unwrap();
    let n = ns(&["users", "42"]);
    {
        let store = InMemoryStore::open(config(&dir)).await.unwrap();
        assert!(store.is_persistent().await);
        store.put(&n, "A", &json!({ "v": "a" })).await.unwrap();
        store.put(&n, "B", &json!({ "v": "b" })).await.unwrap();
        store.delete(&n, "A").await.unwrap();
        store.close().await.unwrap();
    }

    let store = InMemoryStore::open(config(&dir)).await.unwrap();
    assert!(matches!(store.get(&n, "A").await, Err(StoreError::NotFound(_))));
    assert_eq!(store.get(&n, "B").await.unwrap(), json!({ "v": "b" }));
    assert_eq!(store.list_keys(&n).await.unwrap(), vec!["B"]);
    assert_eq!(store.replay_stats().unwrap().records_applied, 3);
}

#[tokio::test]
async fn restart_without_close_keeps_synced_mutations() {
    let dir = TempDir::new().unwrap();
    {
        let store = InMemoryStore::open(config(&dir)).await.unwrap();
        store.put(&ns(&["a"]), "k", &json!(1)).await.unwrap();
        store.put(&ns(&["a"]), "k", &json!(2)).await.unwrap();
    }
    let store = InMemoryStore::open(config(&dir)).await.unwrap();
    assert_eq!(store.get(&ns(&["a"]), "k").await.unwrap(), json!(2));
    assert_eq!(
        store.list_namespaces(&NamespaceQuery::new()).await.unwrap(),
        vec![ns(&["a"])]
    );
}

#[tokio::test]
async fn compaction_on_open_drops_superseded_records() {
    let dir = TempDir::new().unwrap();
    {
        let store = InMemoryStore::open(config(&dir)).await.unwrap();
        for i in 0..10 {
            store.put(&ns(&["a"]), "k", &json!(i)).await.unwrap();
        }
        store.put(&ns(&["a"]), "gone", &json!(0)).await.unwrap();
        store.delete(&ns(&["a"]), "gone").await.unwrap();
        store.close().await.unwrap();
    }
    {
        let store = InMemoryStore::open(config(&dir)).await.unwrap();
        assert_eq!(store.replay_stats().unwrap().records_applied, 12);
        store.close().await.unwrap();
    }
    let store = InMemoryStore::open(config(&dir)).await.unwrap();
    assert_eq!(store.replay_stats().unwrap().records_applied, 1);
    assert_eq!(store.get(&ns(&["a"]), "k").await.unwrap(), json!(9));
}

#[tokio::test]
async fn compaction_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir).with_compact_on_open(false);
    {
        let store = InMemoryStore::open(cfg.clone()).await.unwrap();
        store.put(&ns(&["a"]), "k", &json!(1)).await.unwrap();
        store.put(&ns(&["a"]), "k", &json!(2)).await.unwrap();
        store.close().await.unwrap();
    }
    drop(InMemoryStore::open(cfg.clone()).await.unwrap());
    let store = InMemoryStore::open(cfg).await.unwrap();
    assert_eq!(store.replay_stats().unwrap().records_applied, 2);
}

#[tokio::test]
async fn corrupt_record_is_skipped_and_neighbours_survive() {
    let dir = TempDir::new().unwrap();
    {
        let store = InMemoryStore::open(config(&dir)).await.unwrap();
        store.put(&ns(&["a"]), "first", &json!({ "n": 1 })).await.unwrap();
        store.put(&ns(&["a"]), "second", &json!({ "n": 2 })).await.unwrap();
        store.close().await.unwrap();
    }
    let log = dir.path().join("store.log");
    let mut bytes = fs::read(&log).unwrap();
    bytes[HEADER_SIZE + 2] ^= 0xff;
    fs::write(&log, &bytes).unwrap();

    {
        let store = InMemoryStore::open(config(&dir)).await.unwrap();
        let stats = store.replay_stats().unwrap();
        assert_eq!(stats.records_corrupted, 1);
        assert_eq!(stats.records_applied, 1);
        assert!(matches!(store.get(&ns(&["a"]), "first").await, Err(StoreError::NotFound(_))));
        assert_eq!(store.get(&ns(&["a"]), "second").await.unwrap(), json!({ "n": 2 }));
        store.close().await.unwrap();
    }
    let store = InMemoryStore::open(config(&dir)).await.unwrap();
    assert_eq!(store.replay_stats().unwrap().records_corrupted, 0);
}

#[tokio::test]
async fn torn_tail_is_dropped_on_open() {
    let dir = TempDir::new().unwrap();
    {
        let store = InMemoryStore::open(config(&dir)).await.unwrap();
        store.put(&ns(&["a"]), "k", &json!("kept")).await.unwrap();
        store.put(&ns(&["a"]), "late", &json!("torn")).await.unwrap();
        store.close().await.unwrap();
    }
    let log = dir.path().join("store.log");
    let bytes = fs::read(&log).unwrap();
    fs::write(&log, &bytes[..bytes.len() - 3]).unwrap();

    let store = InMemoryStore::open(config(&dir)).await.unwrap();
    assert!(store.replay_stats().unwrap().torn_tail_truncated);
    assert_eq!(store.get(&ns(&["a"]), "k").await.unwrap(), json!("kept"));
    assert!(matches!(store.get(&ns(&["a"]), "late").await, Err(StoreError::NotFound(_))));
    store.put(&ns(&["a"]), "after", &json!(true)).await.unwrap();
    let hits = store.search(&ns(&["a"]), SearchQuery::new()).await.unwrap();
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn unusable_location_fails_startup() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not-a-dir");
    fs::write(&file, b"x").unwrap();

    let err = InMemoryStore::open(StoreConfig::persistent(&file)).await.unwrap_err();
    assert!(matches!(err, StoreError::PersistenceUnavailable(_)), "{:?}", err);
    let err = MemorySaver::open(StoreConfig::persistent(&file)).await.unwrap_err();
    assert!(matches!(err, CheckpointError::PersistenceUnavailable(_)), "{:?}", err);
}

#[tokio::test]
async fn saver_history_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let saver = MemorySaver::open(config(&dir)).await.unwrap();
        saver.put("t1", &json!({ "step": 1 }), None).await.unwrap();
        saver.put("t1", &json!({ "step": 2 }), None).await.unwrap();
        saver.put("t1", &json!({ "step": 3 }), None).await.unwrap();
        saver.delete("t1", Some(2)).await.unwrap();
        saver.put("t2", &json!({ "x": 1 }), None).await.unwrap();
        saver.delete("t2", None).await.unwrap();
        saver.close().await.unwrap();
    }
    let saver = MemorySaver::open(config(&dir)).await.unwrap();
    assert_eq!(saver.list_threads().await.unwrap(), vec!["t1"]);
    let seqs: Vec<u64> = saver
        .list_checkpoints("t1")
        .await
        .unwrap()
        .iter()
        .map(|c| c.sequence)
        .collect();
    assert_eq!(seqs, vec![1, 3]);
    assert_eq!(saver.put("t1", &json!({ "step": 4 }), None).await.unwrap(), 4);
    assert_eq!(saver.put("t2", &json!({ "x": 2 }), None).await.unwrap(), 1);
}

#[tokio::test]
async fn saver_sequences_keep_increasing_across_restarts() {
    let dir = TempDir::new().unwrap();
    {
        let saver = MemorySaver::open(config(&dir)).await.unwrap();
        for step in 1..=3 {
            saver.put("t1", &json!({ "step": step }), None).await.unwrap();
        }
        saver.delete("t1", Some(3)).await.unwrap();
        saver.close().await.unwrap();
    }
    {
        let saver = MemorySaver::open(config(&dir)).await.unwrap();
        assert_eq!(saver.get("t1", None).await.unwrap(), json!({ "step": 2 }));
        assert_eq!(saver.put("t1", &json!({ "step": 4 }), None).await.unwrap(), 4);
        saver.delete("t1", Some(4)).await.unwrap();
        saver.close().await.unwrap();
    }
    // Opened twice more so the second replay reads the compacted log.
    drop(MemorySaver::open(config(&dir)).await.unwrap());
    let saver = MemorySaver::open(config(&dir)).await.unwrap();
    let seqs: Vec<u64> = saver
        .list_checkpoints("t1")
        .await
        .unwrap()
        .iter()
        .map(|c| c.sequence)
        .collect();
    assert_eq!(seqs, vec![1, 2]);
    assert_eq!(saver.put("t1", &json!({ "step": 5 }), None).await.unwrap(), 5);
}

#[tokio::test]
async fn saver_clear_all_is_durable() {
    let dir = TempDir::new().unwrap();
    {
        let saver = MemorySaver::open(config(&dir)).await.unwrap();
        saver.put("a", &json!(1), None).await.unwrap();
        saver.put("b", &json!(2), None).await.unwrap();
        assert_eq!(saver.clear_all().await.unwrap(), 2);
        saver.put("c", &json!(3), None).await.unwrap();
    }
    let saver = MemorySaver::open(config(&dir)).await.unwrap();
    assert_eq!(saver.list_threads().await.unwrap(), vec!["c"]);
}

#[tokio::test]
async fn store_and_saver_share_directory() {
    let dir = TempDir::new().unwrap();
    {
        let store = InMemoryStore::open(config(&dir)).await.unwrap();
        let saver = MemorySaver::open(config(&dir)).await.unwrap();
        store.put(&ns(&["app"]), "k", &json!("v")).await.unwrap();
        let session = saver.session("t").await.unwrap();
        session.save(&json!({ "step": 1 })).await.unwrap();
    }
    assert!(dir.path().join("store.log").exists());
    assert!(dir.path().join("checkpoints.log").exists());

    let store = InMemoryStore::open(config(&dir)).await.unwrap();
    let saver = MemorySaver::open(config(&dir)).await.unwrap();
    assert_eq!(store.get(&ns(&["app"]), "k").await.unwrap(), json!("v"));
    assert_eq!(saver.get("t", None).await.unwrap(), json!({ "step": 1 }));
}

#[tokio::test]
async fn memory_only_config_writes_nothing() {
    let store = InMemoryStore::open(StoreConfig::in_memory()).await.unwrap();
    assert!(!store.is_persistent().await);
    assert!(store.replay_stats().is_none());
    store.put(&ns(&["a"]), "k", &json!(1)).await.unwrap();
    store.compact().await.unwrap();
    assert_eq!(store.get(&ns(&["a"]), "k").await.unwrap(), json!(1));
}
