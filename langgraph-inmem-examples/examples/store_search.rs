//! Namespaced store: put documents, list namespaces, search with filter and pagination.
//!
//! ```bash
//! cargo run -p langgraph-inmem-examples --example store_search
//! ```

use langgraph_inmem::{InMemoryStore, NamespaceQuery, SearchQuery, StateStore};
use serde_json::json;

fn ns(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    langgraph_inmem_examples::init_tracing();

    let store = InMemoryStore::new();
    store
        .put(&ns(&["users", "1"]), "prefs", &json!({ "theme": "dark", "lang": "en" }))
        .await?;
    store
        .put(&ns(&["users", "2"]), "prefs", &json!({ "theme": "light", "lang": "en" }))
        .await?;
    store
        .put(&ns(&["users", "3"]), "prefs", &json!({ "theme": "dark", "lang": "fr" }))
        .await?;
    store
        .put(&ns(&["users", "1", "memories"]), "m1", &json!({ "text": "likes tea" }))
        .await?;

    println!("namespaces:");
    for namespace in store.list_namespaces(&NamespaceQuery::new()).await? {
        println!("  {}", namespace.join("/"));
    }

    println!("namespaces at depth 2 under users:");
    let query = NamespaceQuery::new().prefix(["users"]).max_depth(2);
    for namespace in store.list_namespaces(&query).await? {
        println!("  {}", namespace.join("/"));
    }

    let dark = SearchQuery::new().filter_value(json!({ "theme": "dark" }))?;
    println!("dark theme users:");
    for item in store.search(&ns(&["users"]), dark.clone()).await? {
        println!("  {}/{} = {}", item.namespace.join("/"), item.key, item.value);
    }

    let page = store.search(&ns(&["users"]), dark.offset(1).limit(1)).await?;
    println!("second page of size 1: {:?}", page.iter().map(|i| &i.key).collect::<Vec<_>>());

    let removed = store.delete(&ns(&["users", "2"]), "prefs").await?;
    println!("deleted users/2/prefs: {}", removed);
    match store.get(&ns(&["users", "2"]), "prefs").await {
        Ok(v) => println!("unexpected value: {}", v),
        Err(e) => println!("after delete: {}", e),
    }
    Ok(())
}
