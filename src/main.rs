use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use wallet_ledger::application::ledger::LedgerEngine;
use wallet_ledger::config::Config;
use wallet_ledger::domain::ports::LedgerStoreBox;
use wallet_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use wallet_ledger::interfaces::http;
use wallet_ledger::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(&config);

    let store = open_store(&config)?;
    let engine = Arc::new(LedgerEngine::new(store));

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .into_diagnostic()?;
    http::serve(listener, engine, shutdown_signal())
        .await
        .into_diagnostic()?;

    info!("Ledger API stopped");
    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(config: &Config) -> Result<LedgerStoreBox> {
    use wallet_ledger::infrastructure::rocksdb::RocksDBStore;

    if let Some(db_path) = &config.db_path {
        info!(path = %db_path.display(), "Using RocksDB storage");
        let store = RocksDBStore::open_with_lock_timeout(db_path, config.lock_timeout())
            .into_diagnostic()?;
        return Ok(Box::new(store));
    }
    Ok(in_memory(config))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(config: &Config) -> Result<LedgerStoreBox> {
    if let Some(db_path) = &config.db_path {
        warn!(
            path = %db_path.display(),
            "Built without storage-rocksdb, ignoring --db-path"
        );
    }
    Ok(in_memory(config))
}

fn in_memory(config: &Config) -> LedgerStoreBox {
    info!("Using in-memory storage");
    Box::new(InMemoryLedgerStore::with_lock_timeout(config.lock_timeout()))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
