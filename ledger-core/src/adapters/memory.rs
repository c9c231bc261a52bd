//! In-memory ledger store for tests and demos
//!
//! Units of work run one at a time against a private copy of the state; the
//! copy replaces the shared state only when the unit of work succeeds and the
//! commit is not failed by injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Transfer, User};
use crate::ports::{LedgerStore, LedgerTx};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    accounts: HashMap<Uuid, Account>,
    /// Insertion order doubles as creation order
    transfers: Vec<Transfer>,
}

/// In-memory store with commit-failure injection
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failing_commits: AtomicUsize,
    conflicting_commits: AtomicUsize,
    commits: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` commits fail as if the database rejected them
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` commits fail with a write conflict
    pub fn conflict_next_commits(&self, n: usize) {
        self.conflicting_commits.store(n, Ordering::SeqCst);
    }

    /// Number of successfully committed units of work
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of stored transfers
    pub fn transfer_count(&self) -> usize {
        self.lock().transfers.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // Shared state is only ever replaced wholesale, so a panic inside a
        // unit of work cannot leave it half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_injected(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl LedgerStore for MemoryStore {
    fn run_atomic<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTx) -> Result<T>,
    {
        let mut shared = self.lock();
        let mut working = shared.clone();

        let value = work(&mut MemoryTx { state: &mut working })?;

        if Self::take_injected(&self.failing_commits) {
            return Err(Error::Database("injected commit failure".to_string()));
        }
        if Self::take_injected(&self.conflicting_commits) {
            return Err(Error::conflict("injected write conflict"));
        }

        *shared = working;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }
}

struct MemoryTx<'a> {
    state: &'a mut MemoryState,
}

impl LedgerTx for MemoryTx<'_> {
    fn insert_user(&mut self, user: &User) -> Result<()> {
        if self.state.users.contains_key(&user.id) {
            return Err(Error::Database(format!("duplicate user id {}", user.id)));
        }
        self.state.users.insert(user.id, user.clone());
        Ok(())
    }

    fn get_user(&mut self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.users.get(&id).cloned())
    }

    fn update_user(&mut self, user: &User) -> Result<bool> {
        match self.state.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_user(&mut self, id: Uuid) -> Result<bool> {
        Ok(self.state.users.remove(&id).is_some())
    }

    fn insert_account(&mut self, account: &Account) -> Result<()> {
        if self.state.accounts.contains_key(&account.id) {
            return Err(Error::Database(format!("duplicate account id {}", account.id)));
        }
        self.state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    fn get_account(&mut self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.state.accounts.get(&id).cloned())
    }

    fn accounts_for_user(&mut self, user_id: Uuid) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .state
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(accounts)
    }

    fn update_balance(&mut self, id: Uuid, expected: Decimal, new_balance: Decimal) -> Result<()> {
        match self.state.accounts.get_mut(&id) {
            Some(account) if account.balance == expected => {
                account.balance = new_balance;
                Ok(())
            }
            _ => Err(Error::conflict(format!(
                "balance of account {} changed since it was read",
                id
            ))),
        }
    }

    fn delete_account(&mut self, id: Uuid) -> Result<bool> {
        Ok(self.state.accounts.remove(&id).is_some())
    }

    fn insert_transfer(&mut self, transfer: &Transfer) -> Result<()> {
        if self
            .state
            .transfers
            .iter()
            .any(|t| t.request_id == transfer.request_id)
        {
            return Err(Error::DuplicateRequest(transfer.request_id.clone()));
        }
        self.state.transfers.push(transfer.clone());
        Ok(())
    }

    fn get_transfer_by_request_id(&mut self, request_id: &str) -> Result<Option<Transfer>> {
        Ok(self
            .state
            .transfers
            .iter()
            .find(|t| t.request_id == request_id)
            .cloned())
    }

    fn transfers_for_account(&mut self, account_id: Uuid) -> Result<Vec<Transfer>> {
        Ok(self
            .state
            .transfers
            .iter()
            .filter(|t| t.involves(account_id))
            .cloned()
            .collect())
    }
}
