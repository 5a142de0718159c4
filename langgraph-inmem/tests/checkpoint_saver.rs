//! Integration tests for MemorySaver through the CheckpointStore capability and scoped
//! sessions: sequence assignment, latest reads, history, deletes, session cleanup.

use std::sync::Arc;

use langgraph_inmem::{CheckpointError, CheckpointStore, MemorySaver};
use serde_json::json;

#[tokio::test]
async fn put_get_list_scenario() {
    let saver: Arc<dyn CheckpointStore> = Arc::new(MemorySaver::new());
    assert_eq!(saver.put("t1", &json!({ "step": 1 }), None).await.unwrap(), 1);
    assert_eq!(saver.put("t1", &json!({ "step": 2 }), None).await.unwrap(), 2);
    assert_eq!(saver.get("t1", None).await.unwrap(), json!({ "step": 2 }));

    let history = saver.list_checkpoints("t1").await.unwrap();
    let seqs: Vec<u64> = history.iter().map(|c| c.sequence).collect();
    assert_eq!(seqs, vec![1, 2]);
    assert!(history[0].metadata.created_at_ms <= history[1].metadata.created_at_ms);
}

#[tokio::test]
async fn sequences_strictly_increase_and_latest_wins() {
    let saver = MemorySaver::new();
    let mut last = 0;
    for step in 0..20 {
        let seq = saver.put("t", &json!({ "step": step }), None).await.unwrap();
        assert!(seq > last);
        last = seq;
        assert_eq!(saver.get("t", None).await.unwrap(), json!({ "step": step }));
    }
    assert_eq!(last, 20);
}

#[tokio::test]
async fn delete_failure_semantics() {
    let saver = MemorySaver::new();
    assert!(saver.list_checkpoints("ghost").await.unwrap().is_empty());
    assert!(matches!(saver.get("ghost", None).await, Err(CheckpointError::NotFound(_))));
    assert!(matches!(
        saver.delete("ghost", Some(1)).await,
        Err(CheckpointError::NotFound(_))
    ));

    saver.put("t1", &json!(1), None).await.unwrap();
    saver.put("t1", &json!(2), None).await.unwrap();
    assert_eq!(saver.delete("t1", Some(1)).await.unwrap(), 1);
    assert!(matches!(saver.get("t1", Some(1)).await, Err(CheckpointError::NotFound(_))));
    assert_eq!(saver.list_threads().await.unwrap(), vec!["t1"]);
    assert_eq!(saver.delete("t1", Some(2)).await.unwrap(), 1);
    assert!(saver.list_threads().await.unwrap().is_empty());
}

async fn resume(saver: &MemorySaver, fail_at: u32) -> Result<u64, CheckpointError> {
    let session = saver.session("run").await?;
    let mut seq = 0;
    for step in 1..=3 {
        if step == fail_at {
            return Err(CheckpointError::InvalidArgument(format!("step {} rejected", step)));
        }
        seq = session.save(&json!({ "step": step })).await?;
    }
    Ok(seq)
}

#[tokio::test]
async fn session_released_on_every_exit_path() {
    let saver = MemorySaver::new();
    assert!(resume(&saver, 2).await.is_err());
    assert_eq!(saver.active_sessions(), 0);
    assert_eq!(saver.get("run", None).await.unwrap(), json!({ "step": 1 }));

    assert_eq!(resume(&saver, 0).await.unwrap(), 4);
    assert_eq!(saver.active_sessions(), 0);

    let session = saver.session("run").await.unwrap();
    assert_eq!(session.load().await.unwrap(), json!({ "step": 3 }));
}

#[tokio::test]
async fn session_released_when_task_panics() {
    let saver = Arc::new(MemorySaver::new());
    let task_saver = Arc::clone(&saver);
    let result = tokio::spawn(async move {
        let session = task_saver.session("t").await.unwrap();
        session.save(&json!(1)).await.unwrap();
        panic!("node failed");
    })
    .await;
    assert!(result.is_err());
    assert_eq!(saver.active_sessions(), 0);
    let session = saver.session("t").await.unwrap();
    assert_eq!(session.history().await.unwrap().len(), 1);
}
