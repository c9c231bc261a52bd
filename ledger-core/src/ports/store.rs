//! Ledger store port - transactional persistence abstraction

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Account, Transfer, User};

/// Durable owner of users, accounts and transfers
///
/// All reads and writes happen inside [`LedgerStore::run_atomic`]. The unit of
/// work is committed only when it returns `Ok`; on `Err`, on panic, or if the
/// commit itself fails, none of its writes become visible.
pub trait LedgerStore: Send + Sync {
    /// Run `work` as one atomic unit of work
    ///
    /// Implementations must report concurrent modification of the same rows
    /// as [`Error::Conflict`](crate::domain::result::Error::Conflict) so the
    /// caller can run the unit of work again.
    fn run_atomic<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTx) -> Result<T>;
}

/// Primitives available inside one unit of work
pub trait LedgerTx {
    // === Users ===

    fn insert_user(&mut self, user: &User) -> Result<()>;

    fn get_user(&mut self, id: Uuid) -> Result<Option<User>>;

    /// Returns false if no such user exists
    fn update_user(&mut self, user: &User) -> Result<bool>;

    /// Returns false if no such user exists
    fn delete_user(&mut self, id: Uuid) -> Result<bool>;

    // === Accounts ===

    fn insert_account(&mut self, account: &Account) -> Result<()>;

    fn get_account(&mut self, id: Uuid) -> Result<Option<Account>>;

    /// Accounts owned by a user, oldest first
    fn accounts_for_user(&mut self, user_id: Uuid) -> Result<Vec<Account>>;

    /// Compare-and-set the balance of an account
    ///
    /// Fails with `Error::Conflict` if the stored balance is no longer
    /// `expected` or the account has disappeared.
    fn update_balance(&mut self, id: Uuid, expected: Decimal, new_balance: Decimal) -> Result<()>;

    /// Returns false if no such account exists
    fn delete_account(&mut self, id: Uuid) -> Result<bool>;

    // === Transfers ===

    /// Insert a transfer record
    ///
    /// Fails with `Error::DuplicateRequest` if a transfer with the same
    /// request id already exists.
    fn insert_transfer(&mut self, transfer: &Transfer) -> Result<()>;

    fn get_transfer_by_request_id(&mut self, request_id: &str) -> Result<Option<Transfer>>;

    /// Transfers where the account is source or destination, oldest first
    fn transfers_for_account(&mut self, account_id: Uuid) -> Result<Vec<Transfer>>;
}
