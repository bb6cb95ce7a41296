use super::wallet::{Amount, WalletId};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on the length of an idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TransferId(pub u64);

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a transfer. Only `Success` is produced today.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Success,
    Pending,
    Failed,
}

/// Client-supplied token that deduplicates retried transfers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(LedgerError::ValidationError(
                "idempotency key must not be blank".to_string(),
            ));
        }
        if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(LedgerError::ValidationError(format!(
                "idempotency key must be at most {MAX_IDEMPOTENCY_KEY_LEN} characters"
            )));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Funds movement requested by a client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferRequest {
    pub from_wallet_id: WalletId,
    pub to_wallet_id: WalletId,
    pub amount: Amount,
}

/// A transfer ready to be persisted. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    pub from_wallet_id: WalletId,
    pub to_wallet_id: WalletId,
    pub amount: Amount,
    pub status: TransferStatus,
    pub idempotency_key: IdempotencyKey,
}

impl NewTransfer {
    pub fn succeeded(request: &TransferRequest, idempotency_key: IdempotencyKey) -> Self {
        Self {
            from_wallet_id: request.from_wallet_id,
            to_wallet_id: request.to_wallet_id,
            amount: request.amount,
            status: TransferStatus::Success,
            idempotency_key,
        }
    }

    pub fn persisted(self, id: TransferId, created_at: DateTime<Utc>) -> TransferTransaction {
        TransferTransaction {
            id,
            from_wallet_id: self.from_wallet_id,
            to_wallet_id: self.to_wallet_id,
            amount: self.amount,
            status: self.status,
            idempotency_key: self.idempotency_key,
            created_at,
        }
    }
}

/// A committed transfer. Immutable once stored.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransferTransaction {
    pub id: TransferId,
    pub from_wallet_id: WalletId,
    pub to_wallet_id: WalletId,
    pub amount: Amount,
    pub status: TransferStatus,
    pub idempotency_key: IdempotencyKey,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_idempotency_key_validation() {
        assert!(IdempotencyKey::new("tx-abc-123").is_ok());
        assert!(matches!(
            IdempotencyKey::new("   "),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            IdempotencyKey::new(""),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(IdempotencyKey::new("k".repeat(MAX_IDEMPOTENCY_KEY_LEN)).is_ok());
        assert!(IdempotencyKey::new("k".repeat(MAX_IDEMPOTENCY_KEY_LEN + 1)).is_err());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TransferStatus::Success).unwrap();
        assert_eq!(json, "\"SUCCESS\"");
        let status: TransferStatus = serde_json::from_str("\"PENDING\"").unwrap();
        assert_eq!(status, TransferStatus::Pending);
    }

    #[test]
    fn test_new_transfer_keeps_request_fields() {
        let request = TransferRequest {
            from_wallet_id: WalletId(1),
            to_wallet_id: WalletId(2),
            amount: Amount::new(dec!(20.00)).unwrap(),
        };
        let key = IdempotencyKey::new("key-1").unwrap();
        let created_at = Utc::now();

        let tx = NewTransfer::succeeded(&request, key.clone()).persisted(TransferId(5), created_at);

        assert_eq!(tx.id, TransferId(5));
        assert_eq!(tx.from_wallet_id, WalletId(1));
        assert_eq!(tx.to_wallet_id, WalletId(2));
        assert_eq!(tx.amount.value(), dec!(20.00));
        assert_eq!(tx.status, TransferStatus::Success);
        assert_eq!(tx.idempotency_key, key);
        assert_eq!(tx.created_at, created_at);
    }

    #[test]
    fn test_transaction_json_roundtrip_is_lossless() {
        let request = TransferRequest {
            from_wallet_id: WalletId(1),
            to_wallet_id: WalletId(2),
            amount: Amount::new(dec!(50.00)).unwrap(),
        };
        let tx = NewTransfer::succeeded(&request, IdempotencyKey::new("k1").unwrap())
            .persisted(TransferId(1), Utc::now());

        let bytes = serde_json::to_vec(&tx).unwrap();
        let back: TransferTransaction = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, tx);
        assert_eq!(serde_json::to_vec(&back).unwrap(), bytes);
    }
}
