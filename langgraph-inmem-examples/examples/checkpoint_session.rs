//! Checkpoint saver: save steps through a scoped session, inspect history, branch from an
//! earlier checkpoint.
//!
//! ```bash
//! cargo run -p langgraph-inmem-examples --example checkpoint_session
//! ```

use langgraph_inmem::{CheckpointError, CheckpointStore, CheckpointTags, MemorySaver};
use serde_json::json;

async fn run_steps(saver: &MemorySaver, thread_id: &str, steps: u32) -> Result<u64, CheckpointError> {
    let session = saver.session(thread_id).await?;
    let mut last = 0;
    for step in 1..=steps {
        let tags = CheckpointTags::from([("step".to_string(), step.to_string())]);
        last = session
            .save_with_tags(&json!({ "step": step, "messages": step * 2 }), tags)
            .await?;
    }
    println!("[{}] latest: {}", session.thread_id(), session.load().await?);
    Ok(last)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    langgraph_inmem_examples::init_tracing();

    let saver = MemorySaver::new();
    let last = run_steps(&saver, "thread-1", 3).await?;
    println!("saved {} checkpoints", last);

    for item in saver.list_checkpoints("thread-1").await? {
        println!(
            "  seq {} size {}B tags {:?}",
            item.sequence, item.metadata.size_bytes, item.metadata.tags
        );
    }

    // Branch: start a new thread from checkpoint 1.
    let first = saver.get("thread-1", Some(1)).await?;
    saver.put("thread-1-branch", &first, None).await?;
    println!("threads: {:?}", saver.list_threads().await?);

    let removed = saver.delete("thread-1", None).await?;
    println!("deleted {} checkpoints; threads: {:?}", removed, saver.list_threads().await?);
    Ok(())
}
