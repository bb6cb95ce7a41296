use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidOperation(String),

    #[error("insufficient balance")]
    InsufficientFunds {
        wallet_id: u64,
        balance: Decimal,
        requested: Decimal,
    },

    #[error("{0}")]
    ValidationError(String),

    #[error("idempotency key already used: {0}")]
    UniquenessViolation(String),

    #[error("Timed out waiting for lock on wallet {0}")]
    LockTimeout(u64),

    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),

    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }

    /// True for failures caused by the request rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::InvalidOperation(_)
                | Self::InsufficientFunds { .. }
                | Self::ValidationError(_)
        )
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_funds_message_hides_amounts() {
        let err = LedgerError::InsufficientFunds {
            wallet_id: 1,
            balance: dec!(1.00),
            requested: dec!(2.00),
        };
        assert_eq!(err.to_string(), "insufficient balance");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_internal_errors_are_not_client_errors() {
        assert!(!LedgerError::internal("boom").is_client_error());
        assert!(!LedgerError::LockTimeout(7).is_client_error());
        assert!(!LedgerError::UniquenessViolation("k".into()).is_client_error());
    }
}
