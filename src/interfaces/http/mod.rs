//! JSON-over-HTTP gateway in front of the `LedgerEngine`.
//!
//! Routes live under `/api/v1`. Every failure is rendered as
//! `{timestamp, status, error}`.

pub mod dto;
pub mod error;
pub mod handlers;

use crate::application::ledger::LedgerEngine;
use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Header carrying the client's transfer deduplication token.
pub const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

pub type AppState = Arc<LedgerEngine>;

pub fn router(engine: AppState) -> Router {
    Router::new()
        .route("/api/v1/users", post(handlers::create_user))
        .route("/api/v1/wallets/{wallet_id}", get(handlers::get_wallet))
        .route("/api/v1/wallets/{wallet_id}/deposit", post(handlers::deposit))
        .route("/api/v1/transfers", post(handlers::create_transfer))
        .route("/api/v1/transfers/{transfer_id}", get(handlers::get_transfer))
        .with_state(engine)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, engine: AppState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "Ledger API listening");
    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown)
        .await
}
