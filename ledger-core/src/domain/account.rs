//! Account domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::to_ledger_scale;
use super::result::{Error, Result};

/// A monetary account owned by a user
///
/// Balances only change through deposits and transfers. The owner is fixed
/// at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    /// ISO 4217 currency code, normalized to uppercase
    pub currency: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Currency and balance of one account, as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub currency: String,
    pub balance: Decimal,
}

impl Account {
    /// Create a new account with a fresh id
    pub fn new(user_id: Uuid, currency: &str, balance: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            currency: Self::normalize_currency(currency),
            balance: to_ledger_scale(balance),
            created_at: Utc::now(),
        }
    }

    /// Normalize currency code to uppercase
    pub fn normalize_currency(currency: &str) -> String {
        currency.trim().to_uppercase()
    }

    /// Check that `currency` is a 3-letter code and return it normalized
    pub fn validate_currency(currency: &str) -> Result<String> {
        let normalized = Self::normalize_currency(currency);
        if normalized.len() != 3 || !normalized.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::invalid(format!(
                "currency must be a 3-letter code, got '{}'",
                currency
            )));
        }
        Ok(normalized)
    }

    pub fn balance_view(&self) -> AccountBalance {
        AccountBalance {
            currency: self.currency.clone(),
            balance: self.balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_normalization() {
        assert_eq!(Account::normalize_currency("usd"), "USD");
        assert_eq!(Account::normalize_currency(" eur "), "EUR");
    }

    #[test]
    fn test_currency_validation() {
        assert_eq!(Account::validate_currency("usd").unwrap(), "USD");
        assert!(Account::validate_currency("").is_err());
        assert!(Account::validate_currency("US").is_err());
        assert!(Account::validate_currency("US1").is_err());
        assert!(Account::validate_currency("EURO").is_err());
    }

    #[test]
    fn test_new_account_is_scaled() {
        let account = Account::new(Uuid::new_v4(), "usd", Decimal::new(10, 0));
        assert_eq!(account.currency, "USD");
        assert_eq!(account.balance.to_string(), "10.0000");
        assert_eq!(account.balance_view().balance, Decimal::new(10, 0));
    }
}
