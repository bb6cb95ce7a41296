use super::transfer::{IdempotencyKey, NewTransfer, TransferId, TransferTransaction};
use super::wallet::{NewUser, User, UserId, Wallet, WalletId};
use crate::error::Result;
use async_trait::async_trait;

/// Durable records for users, wallets and transfers.
///
/// Reads on the store itself see committed state only. Every mutation goes
/// through a [`UnitOfWork`] obtained from [`LedgerStore::begin`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_wallet_by_id(&self, id: WalletId) -> Result<Option<Wallet>>;
    async fn find_transfer_by_id(&self, id: TransferId) -> Result<Option<TransferTransaction>>;
    async fn find_transfer_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<TransferTransaction>>;

    /// Opens an atomic unit of work.
    async fn begin<'a>(&'a self) -> Result<UnitOfWorkBox<'a>>;
}

/// One atomic unit: every staged write lands on `commit`, or none does.
///
/// Dropping a unit without committing rolls it back and releases its locks.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Takes an exclusive row lock on the wallet and reads it.
    ///
    /// Waits while another unit holds the lock. Callers locking several
    /// wallets must do so in ascending id order.
    async fn lock_wallet(&mut self, id: WalletId) -> Result<Option<Wallet>>;

    async fn insert_user(&mut self, user: NewUser) -> Result<User>;

    /// Creates a zero-balance wallet owned by `user_id`.
    async fn insert_wallet(&mut self, user_id: UserId) -> Result<Wallet>;

    /// Upserts a wallet that was locked or created by this unit.
    async fn save_wallet(&mut self, wallet: Wallet) -> Result<Wallet>;

    /// Assigns the id and creation timestamp, then stages the insert.
    ///
    /// Fails with `UniquenessViolation` if the idempotency key is taken.
    async fn save_transfer_transaction(
        &mut self,
        transfer: NewTransfer,
    ) -> Result<TransferTransaction>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type UnitOfWorkBox<'a> = Box<dyn UnitOfWork + 'a>;
