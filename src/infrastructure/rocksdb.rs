use crate::domain::ports::{LedgerStore, UnitOfWork, UnitOfWorkBox};
use crate::domain::transfer::{IdempotencyKey, NewTransfer, TransferId, TransferTransaction};
use crate::domain::wallet::{NewUser, User, UserId, Wallet, WalletId};
use crate::error::{LedgerError, Result};
use ::rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, Transaction, TransactionDB,
    TransactionDBOptions,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Column Family for user records.
pub const CF_USERS: &str = "users";
/// Column Family for wallet records.
pub const CF_WALLETS: &str = "wallets";
/// Column Family for transfer records.
pub const CF_TRANSFERS: &str = "transfers";
/// Column Family indexing transfer ids by idempotency key.
pub const CF_TRANSFER_KEYS: &str = "transfer_keys";

const COLUMN_FAMILIES: [&str; 4] = [CF_USERS, CF_WALLETS, CF_TRANSFERS, CF_TRANSFER_KEYS];

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

struct Sequences {
    users: AtomicU64,
    wallets: AtomicU64,
    transfers: AtomicU64,
}

/// A persistent ledger store on a pessimistic RocksDB `TransactionDB`.
///
/// Each entity lives in its own Column Family, serialized as JSON under its
/// big-endian id. A unit of work is a RocksDB transaction: `lock_wallet`
/// takes a row lock with `get_for_update`, and the idempotency key index is
/// locked the same way before a transfer is inserted.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<TransactionDB>,
    sequences: Arc<Sequences>,
}

impl RocksDBStore {
    /// Opens or creates a store at `path` with the default lock timeout.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_lock_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Opens or creates a store at `path`.
    ///
    /// Ensures the column families exist and resumes each id sequence after
    /// the highest id already stored.
    pub fn open_with_lock_timeout<P: AsRef<Path>>(path: P, lock_timeout: Duration) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut txn_db_opts = TransactionDBOptions::default();
        txn_db_opts.set_txn_lock_timeout(lock_timeout.as_millis() as i64);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db: TransactionDB =
            TransactionDB::open_cf_descriptors(&opts, &txn_db_opts, path, descriptors)?;

        let sequences = Sequences {
            users: AtomicU64::new(last_id(&db, CF_USERS)?),
            wallets: AtomicU64::new(last_id(&db, CF_WALLETS)?),
            transfers: AtomicU64::new(last_id(&db, CF_TRANSFERS)?),
        };

        Ok(Self {
            db: Arc::new(db),
            sequences: Arc::new(sequences),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = cf_handle(&self.db, cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

fn cf_handle<'a>(db: &'a TransactionDB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| LedgerError::internal(format!("{name} column family not found")))
}

fn decode_id(bytes: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LedgerError::internal(format!("malformed id key of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(bytes))
}

fn last_id(db: &TransactionDB, cf_name: &str) -> Result<u64> {
    let cf = cf_handle(db, cf_name)?;
    match db.iterator_cf(cf, IteratorMode::End).next() {
        Some(item) => {
            let (key, _value) = item?;
            decode_id(&key)
        }
        None => Ok(0),
    }
}

fn next_id(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn find_wallet_by_id(&self, id: WalletId) -> Result<Option<Wallet>> {
        self.get_json(CF_WALLETS, &id.0.to_be_bytes())
    }

    async fn find_transfer_by_id(&self, id: TransferId) -> Result<Option<TransferTransaction>> {
        self.get_json(CF_TRANSFERS, &id.0.to_be_bytes())
    }

    async fn find_transfer_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<TransferTransaction>> {
        let cf = cf_handle(&self.db, CF_TRANSFER_KEYS)?;
        match self.db.get_cf(cf, key.as_str().as_bytes())? {
            Some(id) => self.get_json(CF_TRANSFERS, &id),
            None => Ok(None),
        }
    }

    async fn begin<'a>(&'a self) -> Result<UnitOfWorkBox<'a>> {
        Ok(Box::new(RocksDBUnitOfWork {
            store: self,
            txn: self.db.transaction(),
        }))
    }
}

struct RocksDBUnitOfWork<'a> {
    store: &'a RocksDBStore,
    txn: Transaction<'a, TransactionDB>,
}

impl RocksDBUnitOfWork<'_> {
    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = cf_handle(&self.store.db, cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.txn.put_cf(cf, key, bytes)?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for RocksDBUnitOfWork<'_> {
    async fn lock_wallet(&mut self, id: WalletId) -> Result<Option<Wallet>> {
        let cf = cf_handle(&self.store.db, CF_WALLETS)?;
        match self.txn.get_for_update_cf(cf, id.0.to_be_bytes(), true)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        let user = User {
            id: UserId(next_id(&self.store.sequences.users)),
            full_name: user.full_name,
            email: user.email,
        };
        self.put_json(CF_USERS, &user.id.0.to_be_bytes(), &user)?;
        Ok(user)
    }

    async fn insert_wallet(&mut self, user_id: UserId) -> Result<Wallet> {
        let wallet = Wallet::new(WalletId(next_id(&self.store.sequences.wallets)), user_id);
        self.put_json(CF_WALLETS, &wallet.id.0.to_be_bytes(), &wallet)?;
        Ok(wallet)
    }

    async fn save_wallet(&mut self, wallet: Wallet) -> Result<Wallet> {
        self.put_json(CF_WALLETS, &wallet.id.0.to_be_bytes(), &wallet)?;
        Ok(wallet)
    }

    async fn save_transfer_transaction(
        &mut self,
        transfer: NewTransfer,
    ) -> Result<TransferTransaction> {
        let keys = cf_handle(&self.store.db, CF_TRANSFER_KEYS)?;
        let key = transfer.idempotency_key.as_str().as_bytes();
        // Locks the key, so a concurrent insert of the same key waits for us.
        if self.txn.get_for_update_cf(keys, key, true)?.is_some() {
            return Err(LedgerError::UniquenessViolation(
                transfer.idempotency_key.to_string(),
            ));
        }

        let id = TransferId(next_id(&self.store.sequences.transfers));
        let tx = transfer.persisted(id, Utc::now());
        let id_bytes = id.0.to_be_bytes();
        self.put_json(CF_TRANSFERS, &id_bytes, &tx)?;
        self.txn.put_cf(keys, tx.idempotency_key.as_str().as_bytes(), id_bytes)?;
        Ok(tx)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let unit = *self;
        unit.txn.commit()?;
        Ok(())
    }
}
