//! Shared helpers for the langgraph-inmem examples.

/// Initializes stdout tracing. `RUST_LOG` overrides the default `info,langgraph_inmem=debug`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,langgraph_inmem=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .try_init();
}
