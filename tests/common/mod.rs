#![allow(dead_code)]

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use wallet_ledger::application::ledger::LedgerEngine;
use wallet_ledger::domain::wallet::{Amount, NewUser, WalletId};
use wallet_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use wallet_ledger::interfaces::http;

/// In-memory engine with a lock timeout generous enough for contended tests.
pub fn engine() -> Arc<LedgerEngine> {
    let store = InMemoryLedgerStore::with_lock_timeout(Duration::from_secs(30));
    Arc::new(LedgerEngine::new(Box::new(store)))
}

/// Creates a user and returns the id of its wallet.
pub async fn open_wallet(engine: &LedgerEngine, name: &str) -> WalletId {
    let (_, wallet) = engine
        .create_user_and_wallet(NewUser {
            full_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        })
        .await
        .unwrap();
    wallet.id
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

/// Starts the HTTP API on an ephemeral port and returns its base URL.
pub async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(http::serve(listener, engine(), std::future::pending()));
    format!("http://{addr}/api/v1")
}
