//! Account service - account lifecycle and single-account balance changes

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::RetryPolicy;
use crate::domain::money::{self, credit};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountBalance, Transfer};
use crate::ports::LedgerStore;

use super::retry::run_with_retry;

/// Account service for creating, reading, funding and deleting accounts
pub struct AccountService<S: LedgerStore> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: LedgerStore> AccountService<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Open an account for an existing user
    pub fn create_account(
        &self,
        user_id: Uuid,
        currency: &str,
        initial_balance: Decimal,
    ) -> Result<Uuid> {
        let currency = Account::validate_currency(currency)?;
        let balance = money::validate_initial_balance(initial_balance)?;

        let account = self.store.run_atomic(|tx| {
            if tx.get_user(user_id)?.is_none() {
                return Err(Error::not_found(format!("user {}", user_id)));
            }
            let account = Account::new(user_id, &currency, balance);
            tx.insert_account(&account)?;
            Ok(account)
        })?;

        tracing::info!(account_id = %account.id, user_id = %user_id, currency = %account.currency, "Account created");
        Ok(account.id)
    }

    pub fn get_account(&self, account_id: Uuid) -> Result<AccountBalance> {
        self.find(account_id).map(|a| a.balance_view())
    }

    /// Full account record, including owner and creation time
    pub fn find(&self, account_id: Uuid) -> Result<Account> {
        self.store
            .run_atomic(|tx| tx.get_account(account_id))?
            .ok_or_else(|| Error::not_found(format!("account {}", account_id)))
    }

    /// Accounts owned by a user, oldest first
    pub fn get_accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>> {
        self.store.run_atomic(|tx| {
            if tx.get_user(user_id)?.is_none() {
                return Err(Error::not_found(format!("user {}", user_id)));
            }
            tx.accounts_for_user(user_id)
        })
    }

    /// Add a positive amount to an account's balance
    pub fn deposit(&self, account_id: Uuid, amount: Decimal) -> Result<AccountBalance> {
        let amount = money::validate_amount(amount)?;

        let updated = run_with_retry(&self.retry, "deposit", || {
            self.store.run_atomic(|tx| {
                let mut account = tx
                    .get_account(account_id)?
                    .ok_or_else(|| Error::not_found(format!("account {}", account_id)))?;
                let new_balance = credit(account.balance, amount)?;
                tx.update_balance(account.id, account.balance, new_balance)?;
                account.balance = new_balance;
                Ok(account)
            })
        })?;

        tracing::info!(account_id = %account_id, "Deposit applied");
        Ok(updated.balance_view())
    }

    /// Delete an account regardless of its balance
    ///
    /// Transfer records that reference the account are kept.
    pub fn delete_account(&self, account_id: Uuid) -> Result<Uuid> {
        let deleted = self.store.run_atomic(|tx| tx.delete_account(account_id))?;
        if !deleted {
            return Err(Error::not_found(format!("account {}", account_id)));
        }
        tracing::info!(account_id = %account_id, "Account deleted");
        Ok(account_id)
    }

    /// Transfers in or out of an account, oldest first
    pub fn get_transfers(&self, account_id: Uuid) -> Result<Vec<Transfer>> {
        self.store.run_atomic(|tx| {
            if tx.get_account(account_id)?.is_none() {
                return Err(Error::not_found(format!("account {}", account_id)));
            }
            tx.transfers_for_account(account_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::result::ErrorKind;
    use crate::domain::{NewUser, User};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, AccountService<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let user = User::from_new(Uuid::new_v4(), NewUser::new("Ada", "Lovelace", "ada@example.com"));
        store.run_atomic(|tx| tx.insert_user(&user)).unwrap();
        let service = AccountService::new(Arc::clone(&store), RetryPolicy::immediate(3));
        (store, service, user.id)
    }

    #[test]
    fn test_deposit_into_empty_account() {
        let (_, service, user_id) = setup();
        let id = service.create_account(user_id, "usd", Decimal::ZERO).unwrap();

        let updated = service.deposit(id, dec("10.0000")).unwrap();
        assert_eq!(updated.currency, "USD");
        assert_eq!(updated.balance.to_string(), "10.0000");
        assert_eq!(service.get_account(id).unwrap(), updated);
    }

    #[test]
    fn test_deposit_rejects_non_positive_amount() {
        let (_, service, user_id) = setup();
        let id = service.create_account(user_id, "usd", Decimal::ZERO).unwrap();

        let err = service.deposit(id, Decimal::ZERO).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(err.to_string().contains("amount should be positive"));
    }

    #[test]
    fn test_deposit_into_missing_account() {
        let (_, service, _) = setup();
        let err = service.deposit(Uuid::new_v4(), Decimal::ONE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_deposit_retries_conflicts() {
        let (store, service, user_id) = setup();
        let id = service.create_account(user_id, "usd", Decimal::ZERO).unwrap();
        store.conflict_next_commits(2);

        let updated = service.deposit(id, dec("2.5")).unwrap();
        assert_eq!(updated.balance, dec("2.5"));
    }

    #[test]
    fn test_create_account_validation() {
        let (_, service, user_id) = setup();

        let err = service.create_account(Uuid::new_v4(), "usd", Decimal::ZERO).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = service.create_account(user_id, "dollars", Decimal::ZERO).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = service.create_account(user_id, "usd", dec("-1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_accounts_for_user() {
        let (_, service, user_id) = setup();
        let first = service.create_account(user_id, "eur", dec("300")).unwrap();
        let second = service.create_account(user_id, "usd", dec("100")).unwrap();

        let accounts = service.get_accounts_for_user(user_id).unwrap();
        let ids: Vec<Uuid> = accounts.iter().map(|a| a.id).collect();
        assert_eq!(accounts.len(), 2);
        assert!(ids.contains(&first) && ids.contains(&second));

        let err = service.get_accounts_for_user(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_account_with_balance() {
        let (_, service, user_id) = setup();
        let id = service.create_account(user_id, "usd", dec("50")).unwrap();

        assert_eq!(service.delete_account(id).unwrap(), id);
        assert_eq!(service.get_account(id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(service.delete_account(id).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_transfers_of_missing_account() {
        let (_, service, _) = setup();
        let err = service.get_transfers(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
