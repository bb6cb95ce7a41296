use crate::domain::ports::{LedgerStoreBox, UnitOfWork};
use crate::domain::transfer::{
    IdempotencyKey, NewTransfer, TransferId, TransferRequest, TransferTransaction,
};
use crate::domain::wallet::{Amount, NewUser, User, Wallet, WalletId};
use crate::error::{LedgerError, Result};
use tracing::{info, warn};

/// The ledger's business logic: onboarding, deposits and transfers.
///
/// `LedgerEngine` holds no balances of its own. Every operation reads through
/// the store and performs its writes inside one unit of work, so it can be
/// shared freely between concurrent requests.
pub struct LedgerEngine {
    store: LedgerStoreBox,
}

impl LedgerEngine {
    pub fn new(store: LedgerStoreBox) -> Self {
        Self { store }
    }

    /// Creates a user together with an empty wallet, atomically.
    pub async fn create_user_and_wallet(&self, user: NewUser) -> Result<(User, Wallet)> {
        info!(email = %user.email, "Creating user and wallet");

        let mut uow = self.store.begin().await?;
        let user = uow.insert_user(user).await?;
        let wallet = uow.insert_wallet(user.id).await?;
        uow.commit().await?;

        info!(user_id = %user.id, wallet_id = %wallet.id, "Created user with wallet");
        Ok((user, wallet))
    }

    pub async fn deposit(&self, wallet_id: WalletId, amount: Amount) -> Result<Wallet> {
        info!(%wallet_id, %amount, "Deposit request");

        let mut uow = self.store.begin().await?;
        let mut wallet = uow
            .lock_wallet(wallet_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("wallet not found".to_string()))?;
        wallet.credit(amount)?;
        let wallet = uow.save_wallet(wallet).await?;
        uow.commit().await?;

        info!(%wallet_id, balance = %wallet.balance, "Deposit success");
        Ok(wallet)
    }

    /// Moves funds between two wallets, at most once per idempotency key.
    ///
    /// Checks run in a fixed order: self-transfer, replay, wallet existence,
    /// balance. A replayed key returns the stored transfer unchanged and
    /// skips every later check. The replay lookup runs again once both
    /// wallets are locked.
    pub async fn transfer(
        &self,
        request: TransferRequest,
        idempotency_key: IdempotencyKey,
    ) -> Result<TransferTransaction> {
        info!(
            from_wallet_id = %request.from_wallet_id,
            to_wallet_id = %request.to_wallet_id,
            amount = %request.amount,
            %idempotency_key,
            "Transfer request"
        );

        if request.from_wallet_id == request.to_wallet_id {
            warn!(
                wallet_id = %request.from_wallet_id,
                "Transfer rejected because source and destination wallets are equal"
            );
            return Err(LedgerError::InvalidOperation(
                "fromWalletId and toWalletId cannot be the same".to_string(),
            ));
        }

        if let Some(existing) = self
            .store
            .find_transfer_by_idempotency_key(&idempotency_key)
            .await?
        {
            info!(%idempotency_key, transfer_id = %existing.id, "Idempotent replay detected");
            return Ok(existing);
        }

        match self.apply_transfer(&request, idempotency_key.clone()).await {
            Err(LedgerError::UniquenessViolation(_)) => {
                // A concurrent request with the same key committed first.
                let winner = self
                    .store
                    .find_transfer_by_idempotency_key(&idempotency_key)
                    .await?
                    .ok_or_else(|| {
                        LedgerError::internal(format!(
                            "idempotency key {idempotency_key} conflicted but no transfer holds it"
                        ))
                    })?;
                info!(
                    %idempotency_key,
                    transfer_id = %winner.id,
                    "Idempotency race lost, returning the committed transfer"
                );
                Ok(winner)
            }
            result => result,
        }
    }

    async fn apply_transfer(
        &self,
        request: &TransferRequest,
        idempotency_key: IdempotencyKey,
    ) -> Result<TransferTransaction> {
        let mut uow = self.store.begin().await?;
        let (source, destination) = lock_pair(
            uow.as_mut(),
            request.from_wallet_id,
            request.to_wallet_id,
        )
        .await?;

        // A same-key request may have committed while this one queued on the locks.
        if let Some(existing) = self
            .store
            .find_transfer_by_idempotency_key(&idempotency_key)
            .await?
        {
            info!(
                %idempotency_key,
                transfer_id = %existing.id,
                "Idempotent replay detected after acquiring locks"
            );
            return Ok(existing);
        }

        let mut source =
            source.ok_or_else(|| LedgerError::NotFound("source wallet not found".to_string()))?;
        let mut destination = destination
            .ok_or_else(|| LedgerError::NotFound("destination wallet not found".to_string()))?;

        if let Err(err) = source.debit(request.amount) {
            warn!(
                wallet_id = %source.id,
                balance = %source.balance,
                requested = %request.amount,
                "Transfer rejected for insufficient balance"
            );
            return Err(err);
        }
        destination.credit(request.amount)?;

        uow.save_wallet(source).await?;
        uow.save_wallet(destination).await?;
        let saved = uow
            .save_transfer_transaction(NewTransfer::succeeded(request, idempotency_key))
            .await?;
        uow.commit().await?;

        info!(
            transfer_id = %saved.id,
            from_wallet_id = %saved.from_wallet_id,
            to_wallet_id = %saved.to_wallet_id,
            amount = %saved.amount,
            "Transfer success"
        );
        Ok(saved)
    }

    pub async fn get_transfer(&self, transfer_id: TransferId) -> Result<TransferTransaction> {
        info!(%transfer_id, "Fetching transfer");
        self.store
            .find_transfer_by_id(transfer_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("transfer not found".to_string()))
    }

    pub async fn get_wallet(&self, wallet_id: WalletId) -> Result<Wallet> {
        info!(%wallet_id, "Fetching wallet");
        self.store
            .find_wallet_by_id(wallet_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("wallet not found".to_string()))
    }
}

/// Locks both wallets in ascending id order and returns them as
/// `(source, destination)`, so opposite transfers cannot deadlock.
async fn lock_pair(
    uow: &mut (dyn UnitOfWork + '_),
    source: WalletId,
    destination: WalletId,
) -> Result<(Option<Wallet>, Option<Wallet>)> {
    if source < destination {
        let source = uow.lock_wallet(source).await?;
        let destination = uow.lock_wallet(destination).await?;
        Ok((source, destination))
    } else {
        let destination = uow.lock_wallet(destination).await?;
        let source = uow.lock_wallet(source).await?;
        Ok((source, destination))
    }
}
