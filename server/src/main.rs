//! Serves term and AND queries over an index written by `indexer build`.

use anyhow::{Context, Result};
use clap::Parser;
use server::{load_index, router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server", about = "Query a persisted inverted index over HTTP")]
struct Args {
    /// Directory holding index.bin, meta.json and doc_id_map.bin
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let loaded = load_index(&args.index).with_context(|| format!("loading index from {}", args.index.display()))?;
    tracing::info!(
        strategy = %loaded.strategy,
        num_docs = loaded.index.num_docs(),
        num_terms = loaded.index.num_terms(),
        stages = ?loaded.stage_names(),
        "index loaded"
    );

    let listener = TcpListener::bind(args.addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "query server listening");
    axum::serve(listener, router(Arc::new(loaded)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("query server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
    }
}
