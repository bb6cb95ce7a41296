use crate::domain::ports::{LedgerStore, UnitOfWork, UnitOfWorkBox};
use crate::domain::transfer::{IdempotencyKey, NewTransfer, TransferId, TransferTransaction};
use crate::domain::wallet::{NewUser, User, UserId, Wallet, WalletId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    wallets: HashMap<WalletId, Wallet>,
    transfers: HashMap<TransferId, TransferTransaction>,
    transfer_keys: HashMap<IdempotencyKey, TransferId>,
}

#[derive(Default)]
struct Sequences {
    users: AtomicU64,
    wallets: AtomicU64,
    transfers: AtomicU64,
}

fn next_id(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

/// A thread-safe in-memory ledger store.
///
/// Committed rows live behind an `Arc<RwLock<..>>`. Each wallet row has its
/// own mutex, held by a unit of work from `lock_wallet` until it commits or
/// is dropped. Writes are staged in the unit and applied under a single write
/// lock on commit, so readers never observe half of a transfer.
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
    row_locks: Arc<Mutex<HashMap<WalletId, Arc<Mutex<()>>>>>,
    sequences: Arc<Sequences>,
    lock_timeout: Duration,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store whose row locks give up after `lock_timeout`.
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            tables: Arc::default(),
            row_locks: Arc::default(),
            sequences: Arc::default(),
            lock_timeout,
        }
    }

    async fn row_lock(&self, id: WalletId) -> Arc<Mutex<()>> {
        let mut locks = self.row_locks.lock().await;
        locks.entry(id).or_default().clone()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_wallet_by_id(&self, id: WalletId) -> Result<Option<Wallet>> {
        let tables = self.tables.read().await;
        Ok(tables.wallets.get(&id).cloned())
    }

    async fn find_transfer_by_id(&self, id: TransferId) -> Result<Option<TransferTransaction>> {
        let tables = self.tables.read().await;
        Ok(tables.transfers.get(&id).cloned())
    }

    async fn find_transfer_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<TransferTransaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transfer_keys
            .get(key)
            .and_then(|id| tables.transfers.get(id))
            .cloned())
    }

    async fn begin<'a>(&'a self) -> Result<UnitOfWorkBox<'a>> {
        Ok(Box::new(InMemoryUnitOfWork {
            store: self,
            row_guards: HashMap::new(),
            users: Vec::new(),
            wallets: HashMap::new(),
            transfers: Vec::new(),
        }))
    }
}

struct InMemoryUnitOfWork<'a> {
    store: &'a InMemoryLedgerStore,
    row_guards: HashMap<WalletId, OwnedMutexGuard<()>>,
    users: Vec<User>,
    // Wallets created or saved by this unit.
    wallets: HashMap<WalletId, Wallet>,
    transfers: Vec<TransferTransaction>,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork<'_> {
    async fn lock_wallet(&mut self, id: WalletId) -> Result<Option<Wallet>> {
        if let Some(wallet) = self.wallets.get(&id) {
            return Ok(Some(wallet.clone()));
        }

        if !self.row_guards.contains_key(&id) {
            // Wallets are never deleted, so a miss here stays a miss.
            if !self.store.tables.read().await.wallets.contains_key(&id) {
                return Ok(None);
            }
            let row = self.store.row_lock(id).await;
            let guard = tokio::time::timeout(self.store.lock_timeout, row.lock_owned())
                .await
                .map_err(|_| LedgerError::LockTimeout(id.0))?;
            self.row_guards.insert(id, guard);
        }

        let tables = self.store.tables.read().await;
        Ok(tables.wallets.get(&id).cloned())
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        let user = User {
            id: UserId(next_id(&self.store.sequences.users)),
            full_name: user.full_name,
            email: user.email,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    async fn insert_wallet(&mut self, user_id: UserId) -> Result<Wallet> {
        let wallet = Wallet::new(WalletId(next_id(&self.store.sequences.wallets)), user_id);
        self.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn save_wallet(&mut self, wallet: Wallet) -> Result<Wallet> {
        if !self.row_guards.contains_key(&wallet.id) && !self.wallets.contains_key(&wallet.id) {
            return Err(LedgerError::internal(format!(
                "wallet {} saved without holding its row lock",
                wallet.id
            )));
        }
        self.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn save_transfer_transaction(
        &mut self,
        transfer: NewTransfer,
    ) -> Result<TransferTransaction> {
        let staged = self
            .transfers
            .iter()
            .any(|tx| tx.idempotency_key == transfer.idempotency_key);
        if staged
            || self
                .store
                .tables
                .read()
                .await
                .transfer_keys
                .contains_key(&transfer.idempotency_key)
        {
            return Err(LedgerError::UniquenessViolation(
                transfer.idempotency_key.to_string(),
            ));
        }

        let id = TransferId(next_id(&self.store.sequences.transfers));
        let tx = transfer.persisted(id, Utc::now());
        self.transfers.push(tx.clone());
        Ok(tx)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let unit = *self;
        let mut tables = unit.store.tables.write().await;

        // Last line of defence against a key inserted since it was staged.
        if let Some(conflict) = unit
            .transfers
            .iter()
            .find(|tx| tables.transfer_keys.contains_key(&tx.idempotency_key))
        {
            return Err(LedgerError::UniquenessViolation(
                conflict.idempotency_key.to_string(),
            ));
        }

        for user in unit.users {
            tables.users.insert(user.id, user);
        }
        for (id, wallet) in unit.wallets {
            tables.wallets.insert(id, wallet);
        }
        for tx in unit.transfers {
            tables.transfer_keys.insert(tx.idempotency_key.clone(), tx.id);
            tables.transfers.insert(tx.id, tx);
        }
        // Row guards are released after the write lock, once the rows are visible.
        Ok(())
    }
}
