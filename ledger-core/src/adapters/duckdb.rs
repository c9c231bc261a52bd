//! DuckDB store implementation
//!
//! Every unit of work gets its own connection cloned from the root
//! connection, so units of work on unrelated accounts run in parallel.
//! DuckDB's MVCC reports a write-write conflict when two open transactions
//! update the same row; that and the compare-and-set balance update are what
//! rule out lost updates.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection, OptionalExt};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Transfer, User};
use crate::ports::{LedgerStore, LedgerTx};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str =
    "account_id, user_id, currency, CAST(balance AS VARCHAR), created_at";

const TRANSFER_COLUMNS: &str = "transfer_id, from_account_id, to_account_id, \
     CAST(amount AS VARCHAR), request_id, receipt, created_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_open_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

fn is_conflict_message(lower: &str) -> bool {
    lower.contains("conflict")
}

fn is_unique_violation_message(lower: &str) -> bool {
    lower.contains("duplicate key")
        || lower.contains("unique constraint")
        || lower.contains("primary key or unique constraint")
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        let msg = err.to_string();
        let lower = msg.to_lowercase();
        if is_unique_violation_message(&lower) {
            Error::DuplicateRequest(msg)
        } else if is_conflict_message(&lower) {
            Error::Conflict(msg)
        } else {
            Error::Database(msg)
        }
    }
}

/// DuckDB-backed ledger store
pub struct DuckDbStore {
    root: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbStore {
    /// Open (or create) the database file at `db_path`
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Connection::open(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        root: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_open_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "Database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.map(Error::from).unwrap_or_else(|| {
            Error::internal(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            root: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        })
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.connect()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// New connection to the same database for one unit of work
    fn connect(&self) -> Result<Connection> {
        let root = self
            .root
            .lock()
            .map_err(|e| Error::internal(format!("Lock poisoned: {}", e)))?;
        Ok(root.try_clone()?)
    }
}

impl LedgerStore for DuckDbStore {
    fn run_atomic<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTx) -> Result<T>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        // An early return drops `tx`, which rolls the transaction back.
        let value = work(&mut DuckDbTx { conn: &tx })?;

        tx.commit()?;
        Ok(value)
    }
}

/// One open DuckDB transaction
struct DuckDbTx<'a> {
    conn: &'a Connection,
}

impl LedgerTx for DuckDbTx<'_> {
    // === Users ===

    fn insert_user(&mut self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sys_users (user_id, first_name, last_name, email) VALUES (?, ?, ?, ?)",
            params![user.id.to_string(), user.first_name, user.last_name, user.email],
        )?;
        Ok(())
    }

    fn get_user(&mut self, id: Uuid) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, first_name, last_name, email FROM sys_users WHERE user_id = ?",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, first_name, last_name, email)| {
            Ok(User {
                id: parse_uuid(&id)?,
                first_name,
                last_name,
                email,
            })
        })
        .transpose()
    }

    fn update_user(&mut self, user: &User) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE sys_users SET first_name = ?, last_name = ?, email = ? WHERE user_id = ?",
            params![user.first_name, user.last_name, user.email, user.id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn delete_user(&mut self, id: Uuid) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM sys_users WHERE user_id = ?", [id.to_string()])?;
        Ok(changed > 0)
    }

    // === Accounts ===

    fn insert_account(&mut self, account: &Account) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sys_accounts (account_id, user_id, currency, balance, created_at)
             VALUES (?, ?, ?, CAST(? AS DECIMAL(18, 4)), ?)",
            params![
                account.id.to_string(),
                account.user_id.to_string(),
                account.currency,
                account.balance.to_string(),
                format_timestamp(&account.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_account(&mut self, id: Uuid) -> Result<Option<Account>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sys_accounts WHERE account_id = ?", ACCOUNT_COLUMNS),
                [id.to_string()],
                AccountRow::read,
            )
            .optional()?;
        row.map(AccountRow::into_account).transpose()
    }

    fn accounts_for_user(&mut self, user_id: Uuid) -> Result<Vec<Account>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM sys_accounts WHERE user_id = ? ORDER BY created_at, account_id",
            ACCOUNT_COLUMNS
        ))?;
        let rows = stmt.query_map([user_id.to_string()], AccountRow::read)?;

        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?.into_account()?);
        }
        Ok(accounts)
    }

    fn update_balance(&mut self, id: Uuid, expected: Decimal, new_balance: Decimal) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE sys_accounts SET balance = CAST(? AS DECIMAL(18, 4))
             WHERE account_id = ? AND balance = CAST(? AS DECIMAL(18, 4))",
            params![new_balance.to_string(), id.to_string(), expected.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::conflict(format!(
                "balance of account {} changed since it was read",
                id
            )));
        }
        Ok(())
    }

    fn delete_account(&mut self, id: Uuid) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM sys_accounts WHERE account_id = ?", [id.to_string()])?;
        Ok(changed > 0)
    }

    // === Transfers ===

    fn insert_transfer(&mut self, transfer: &Transfer) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT INTO sys_transfers (transfer_id, from_account_id, to_account_id, amount,
                                        request_id, receipt, created_at)
             VALUES (?, ?, ?, CAST(? AS DECIMAL(18, 4)), ?, ?, ?)",
            params![
                transfer.id.to_string(),
                transfer.from_account_id.to_string(),
                transfer.to_account_id.to_string(),
                transfer.amount.to_string(),
                transfer.request_id,
                transfer.receipt,
                format_timestamp(&transfer.created_at),
            ],
        );

        match inserted.map_err(Error::from) {
            Ok(_) => Ok(()),
            Err(Error::DuplicateRequest(_)) => {
                Err(Error::DuplicateRequest(transfer.request_id.clone()))
            }
            Err(e) => Err(e),
        }
    }

    fn get_transfer_by_request_id(&mut self, request_id: &str) -> Result<Option<Transfer>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sys_transfers WHERE request_id = ?", TRANSFER_COLUMNS),
                [request_id],
                TransferRow::read,
            )
            .optional()?;
        row.map(TransferRow::into_transfer).transpose()
    }

    fn transfers_for_account(&mut self, account_id: Uuid) -> Result<Vec<Transfer>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM sys_transfers
             WHERE from_account_id = ? OR to_account_id = ?
             ORDER BY created_at, transfer_id",
            TRANSFER_COLUMNS
        ))?;
        let id = account_id.to_string();
        let rows = stmt.query_map(params![id, id], TransferRow::read)?;

        let mut transfers = Vec::new();
        for row in rows {
            transfers.push(row?.into_transfer()?);
        }
        Ok(transfers)
    }
}

/// Raw column values of one sys_accounts row
struct AccountRow {
    id: String,
    user_id: String,
    currency: String,
    balance: String,
    created_at: String,
}

impl AccountRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            currency: row.get(2)?,
            balance: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_account(self) -> Result<Account> {
        Ok(Account {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            currency: self.currency,
            balance: parse_decimal(&self.balance)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Raw column values of one sys_transfers row
struct TransferRow {
    id: String,
    from_account_id: String,
    to_account_id: String,
    amount: String,
    request_id: String,
    receipt: String,
    created_at: String,
}

impl TransferRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            from_account_id: row.get(1)?,
            to_account_id: row.get(2)?,
            amount: row.get(3)?,
            request_id: row.get(4)?,
            receipt: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_transfer(self) -> Result<Transfer> {
        Ok(Transfer {
            id: parse_uuid(&self.id)?,
            from_account_id: parse_uuid(&self.from_account_id)?,
            to_account_id: parse_uuid(&self.to_account_id)?,
            amount: parse_decimal(&self.amount)?,
            request_id: self.request_id,
            receipt: self.receipt,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Database(format!("invalid id '{}': {}", s, e)))
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|e| Error::Database(format!("invalid decimal '{}': {}", s, e)))
}

/// Fixed-width RFC 3339 so that text order is time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("invalid timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DuckDbStore {
        let store = DuckDbStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store
    }

    fn seed_account(store: &DuckDbStore, balance: i64) -> Account {
        let account = Account::new(Uuid::new_v4(), "usd", Decimal::new(balance, 0));
        store
            .run_atomic(|tx| tx.insert_account(&account))
            .unwrap();
        account
    }

    #[test]
    fn test_error_classification() {
        assert!(is_conflict_message(
            &"TransactionContext Error: Conflict on tuple deletion!".to_lowercase()
        ));
        assert!(is_unique_violation_message(
            &"Constraint Error: Duplicate key \"request_id: r\" violates unique constraint."
                .to_lowercase()
        ));
        assert!(!is_conflict_message("catalog error: table does not exist"));
    }

    #[test]
    fn test_account_roundtrip_keeps_scale() {
        let store = store();
        let account = seed_account(&store, 300);

        let loaded = store
            .run_atomic(|tx| tx.get_account(account.id))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.balance.to_string(), "300.0000");
        assert_eq!(loaded.currency, "USD");
        assert_eq!(loaded.user_id, account.user_id);
    }

    #[test]
    fn test_compare_and_set_rejects_stale_balance() {
        let store = store();
        let account = seed_account(&store, 10);

        let err = store
            .run_atomic(|tx| tx.update_balance(account.id, Decimal::new(9, 0), Decimal::ZERO))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        store
            .run_atomic(|tx| tx.update_balance(account.id, Decimal::new(10, 0), Decimal::ONE))
            .unwrap();
        let loaded = store.run_atomic(|tx| tx.get_account(account.id)).unwrap().unwrap();
        assert_eq!(loaded.balance, Decimal::ONE);
    }

    #[test]
    fn test_failed_unit_of_work_rolls_back() {
        let store = store();
        let account = seed_account(&store, 10);

        let result: Result<()> = store.run_atomic(|tx| {
            tx.update_balance(account.id, Decimal::new(10, 0), Decimal::ZERO)?;
            Err(Error::internal("abort"))
        });
        assert!(result.is_err());

        let loaded = store.run_atomic(|tx| tx.get_account(account.id)).unwrap().unwrap();
        assert_eq!(loaded.balance, Decimal::new(10, 0));
    }

    #[test]
    fn test_duplicate_request_id_is_signalled() {
        let store = store();
        let from = seed_account(&store, 10);
        let to = seed_account(&store, 0);
        let request = crate::domain::TransferRequest::new(from.id, to.id, Decimal::ONE, "req-dup");

        let first = Transfer::from_request(&request, Decimal::ONE);
        store.run_atomic(|tx| tx.insert_transfer(&first)).unwrap();

        let second = Transfer::from_request(&request, Decimal::ONE);
        let err = store.run_atomic(|tx| tx.insert_transfer(&second)).unwrap_err();
        assert!(matches!(err, Error::DuplicateRequest(ref id) if id == "req-dup"));

        let history = store.run_atomic(|tx| tx.transfers_for_account(to.id)).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].receipt(), first.receipt());
        assert_eq!(history[0].amount.to_string(), "1.0000");
    }
}
