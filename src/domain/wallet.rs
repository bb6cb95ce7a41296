use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Number of fractional digits a monetary value may carry.
pub const MONEY_SCALE: u32 = 2;

/// Largest value a `DECIMAL(19,2)` column holds, for amounts and balances.
pub const MAX_MONEY: Decimal = dec!(99999999999999999.99);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WalletId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monetary balance held by a wallet.
///
/// Wraps `rust_decimal::Decimal`. Wallet operations keep it non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(pub Decimal);

/// A strictly positive monetary amount for deposits and transfers.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(LedgerError::ValidationError(
                "amount must be greater than 0".to_string(),
            ));
        }
        if value > MAX_MONEY {
            return Err(LedgerError::ValidationError(format!(
                "amount must be at most {MAX_MONEY}"
            )));
        }
        if value.normalize().scale() > MONEY_SCALE {
            return Err(LedgerError::ValidationError(format!(
                "amount must have at most {MONEY_SCALE} decimal places"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// A user to be onboarded, before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
}

/// An account holding a non-negative balance for one user.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub balance: Balance,
}

impl Wallet {
    pub fn new(id: WalletId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            balance: Balance::ZERO,
        }
    }

    /// Adds funds unless the balance would leave the storable range.
    pub fn credit(&mut self, amount: Amount) -> Result<()> {
        let balance = self
            .balance
            .value()
            .checked_add(amount.value())
            .filter(|balance| *balance <= MAX_MONEY)
            .ok_or_else(|| {
                LedgerError::InvalidOperation(format!(
                    "balance of wallet {} cannot exceed {MAX_MONEY}",
                    self.id
                ))
            })?;
        self.balance = Balance::new(balance);
        Ok(())
    }

    /// Removes funds if the balance covers them; otherwise leaves it untouched.
    pub fn debit(&mut self, amount: Amount) -> Result<()> {
        let amount: Balance = amount.into();
        if self.balance >= amount {
            self.balance -= amount;
            Ok(())
        } else {
            Err(LedgerError::InsufficientFunds {
                wallet_id: self.id.0,
                balance: self.balance.value(),
                requested: amount.value(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_arithmetic() {
        let b1 = Balance::new(dec!(10.0));
        let b2 = Balance::new(dec!(5.0));
        assert_eq!(b1 + b2, Balance::new(dec!(15.0)));
        assert_eq!(b1 - b2, Balance::new(dec!(5.0)));
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert!(Amount::new(dec!(50.00)).is_ok());
        assert!(Amount::new(dec!(1.500)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(0.001)),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_upper_bound() {
        assert!(Amount::new(MAX_MONEY).is_ok());
        assert!(matches!(
            Amount::new(dec!(100000000000000000.00)),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(Decimal::MAX),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_deserialize_is_validated() {
        let amount: Amount = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(amount.value(), dec!(12.50));
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
        assert!(serde_json::from_str::<Amount>("\"-3.00\"").is_err());
        assert!(serde_json::from_str::<Amount>("\"1.234\"").is_err());
        assert_eq!(serde_json::to_value(amount).unwrap(), "12.50");
    }

    #[test]
    fn test_wallet_credit_cannot_exceed_limit() {
        let mut wallet = Wallet::new(WalletId(1), UserId(1));
        wallet.credit(Amount::new(MAX_MONEY).unwrap()).unwrap();

        let result = wallet.credit(Amount::new(dec!(0.01)).unwrap());
        assert!(matches!(result, Err(LedgerError::InvalidOperation(_))));
        assert_eq!(wallet.balance, Balance::new(MAX_MONEY));
    }

    #[test]
    fn test_wallet_starts_empty() {
        let wallet = Wallet::new(WalletId(3), UserId(9));
        assert_eq!(wallet.balance, Balance::ZERO);
        assert_eq!(wallet.user_id, UserId(9));
    }

    #[test]
    fn test_wallet_credit() {
        let mut wallet = Wallet::new(WalletId(1), UserId(1));
        wallet.credit(Amount::new(dec!(200.00)).unwrap()).unwrap();
        assert_eq!(wallet.balance, Balance::new(dec!(200.00)));
    }

    #[test]
    fn test_wallet_debit_success() {
        let mut wallet = Wallet::new(WalletId(1), UserId(1));
        wallet.balance = Balance::new(dec!(100.00));

        wallet.debit(Amount::new(dec!(100.00)).unwrap()).unwrap();
        assert_eq!(wallet.balance, Balance::ZERO);
    }

    #[test]
    fn test_wallet_debit_insufficient() {
        let mut wallet = Wallet::new(WalletId(1), UserId(1));
        wallet.balance = Balance::new(dec!(1.00));

        let result = wallet.debit(Amount::new(dec!(2.00)).unwrap());
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { wallet_id: 1, .. })
        ));
        assert_eq!(wallet.balance, Balance::new(dec!(1.00)));
    }

    #[test]
    fn test_wallet_serializes_balance_as_string() {
        let mut wallet = Wallet::new(WalletId(4), UserId(2));
        wallet.balance = Balance::new(dec!(150.00));
        let json = serde_json::to_value(&wallet).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["balance"], "150.00");
    }
}
