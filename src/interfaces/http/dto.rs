//! Request and response bodies of the HTTP API.

use crate::domain::transfer::{TransferId, TransferRequest, TransferStatus, TransferTransaction};
use crate::domain::wallet::{Amount, Balance, NewUser, User, UserId, Wallet, WalletId};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Flattens validator output into one deterministic message.
fn validation_message(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|field| field.iter())
        .map(|err| match &err.message {
            Some(message) => message.to_string(),
            None => err.code.to_string(),
        })
        .collect();
    messages.sort();
    messages.dedup();
    messages.join(", ")
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| LedgerError::ValidationError(format!("{field} is required")))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "fullName is required"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(
        custom(function = "not_blank", message = "email is required"),
        email(message = "email must be valid")
    )]
    pub email: String,
}

impl CreateUserRequest {
    pub fn into_new_user(self) -> Result<NewUser> {
        self.validate()
            .map_err(|errors| LedgerError::ValidationError(validation_message(&errors)))?;
        Ok(NewUser {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: Option<Decimal>,
}

impl DepositRequest {
    pub fn amount(self) -> Result<Amount> {
        Amount::new(required(self.amount, "amount")?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferRequest {
    pub from_wallet_id: Option<WalletId>,
    pub to_wallet_id: Option<WalletId>,
    pub amount: Option<Decimal>,
}

impl CreateTransferRequest {
    pub fn into_request(self) -> Result<TransferRequest> {
        Ok(TransferRequest {
            from_wallet_id: required(self.from_wallet_id, "fromWalletId")?,
            to_wallet_id: required(self.to_wallet_id, "toWalletId")?,
            amount: Amount::new(required(self.amount, "amount")?)?,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub user_id: UserId,
    pub wallet_id: WalletId,
}

impl From<(User, Wallet)> for CreateUserResponse {
    fn from((user, wallet): (User, Wallet)) -> Self {
        Self {
            user_id: user.id,
            wallet_id: wallet.id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub wallet_id: WalletId,
    pub balance: Balance,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            wallet_id: wallet.id,
            balance: wallet.balance,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub id: TransferId,
    pub from_wallet_id: WalletId,
    pub to_wallet_id: WalletId,
    pub amount: Amount,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
}

impl From<TransferTransaction> for TransferResponse {
    fn from(tx: TransferTransaction) -> Self {
        Self {
            id: tx.id,
            from_wallet_id: tx.from_wallet_id,
            to_wallet_id: tx.to_wallet_id,
            amount: tx.amount,
            status: tx.status,
            created_at: tx.created_at,
        }
    }
}
