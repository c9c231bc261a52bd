//! Fixed-point amount rules shared by deposits, transfers and new accounts
//!
//! Balances are exact decimals at scale 4 and are persisted as `DECIMAL(18,4)`.

use rust_decimal::Decimal;

use super::result::{Error, Result};

/// Number of fractional digits kept for every balance and amount
pub const LEDGER_SCALE: u32 = 4;

/// Largest balance a `DECIMAL(18,4)` column can hold
pub fn max_balance() -> Decimal {
    Decimal::new(999_999_999_999_999_999, LEDGER_SCALE)
}

/// Bring a validated value to the ledger scale (`10` -> `10.0000`)
pub fn to_ledger_scale(value: Decimal) -> Decimal {
    let mut value = value;
    value.rescale(LEDGER_SCALE);
    value
}

fn check_precision(value: Decimal) -> Result<()> {
    if value.normalize().scale() > LEDGER_SCALE {
        return Err(Error::invalid(format!(
            "amount {} has more than {} decimal places",
            value, LEDGER_SCALE
        )));
    }
    if value.abs() > max_balance() {
        return Err(Error::invalid(format!(
            "amount {} exceeds the maximum of {}",
            value,
            max_balance()
        )));
    }
    Ok(())
}

/// Validate a deposit or transfer amount: strictly positive, at most 4 decimals
pub fn validate_amount(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(Error::invalid("amount should be positive"));
    }
    check_precision(amount)?;
    Ok(to_ledger_scale(amount))
}

/// Validate the opening balance of a new account (zero allowed)
pub fn validate_initial_balance(balance: Decimal) -> Result<Decimal> {
    if balance < Decimal::ZERO {
        return Err(Error::invalid("initial balance cannot be negative"));
    }
    check_precision(balance)?;
    Ok(to_ledger_scale(balance))
}

/// Add `amount` to `balance`, refusing results the store could not represent
pub fn credit(balance: Decimal, amount: Decimal) -> Result<Decimal> {
    let new_balance = balance
        .checked_add(amount)
        .filter(|b| *b <= max_balance())
        .ok_or_else(|| Error::invalid("resulting balance exceeds the maximum"))?;
    Ok(to_ledger_scale(new_balance))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::result::ErrorKind;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_positive_amount_is_scaled() {
        let amount = validate_amount(dec("10")).unwrap();
        assert_eq!(amount.to_string(), "10.0000");
    }

    #[test]
    fn test_zero_and_negative_amounts_rejected() {
        for raw in ["0", "0.0000", "-1"] {
            let err = validate_amount(dec(raw)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
            assert!(err.to_string().contains("amount should be positive"));
        }
    }

    #[test]
    fn test_precision_is_checked_after_normalizing() {
        assert!(validate_amount(dec("10.50000")).is_ok());
        let err = validate_amount(dec("0.00001")).unwrap_err();
        assert!(err.to_string().contains("decimal places"));
    }

    #[test]
    fn test_initial_balance_allows_zero() {
        assert_eq!(
            validate_initial_balance(Decimal::ZERO).unwrap().to_string(),
            "0.0000"
        );
        assert!(validate_initial_balance(dec("-0.01")).is_err());
    }

    #[test]
    fn test_credit_respects_maximum() {
        assert_eq!(credit(dec("1.5"), dec("2.25")).unwrap(), dec("3.75"));
        let err = credit(max_balance(), dec("0.0001")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
