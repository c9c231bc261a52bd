//! Ledger Core - accounts, users and idempotent transfers
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, Transfer, User) and money rules
//! - **ports**: Trait definitions for external dependencies (LedgerStore)
//! - **services**: Business logic orchestration (accounts, users, the transfer engine)
//! - **adapters**: Concrete implementations (DuckDB, in-memory)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbStore;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    Account, AccountBalance, NewUser, Transfer, TransferReceipt, TransferRequest, User,
};
pub use domain::result::{Error, ErrorKind, OperationResult};

/// Main context for ledger operations
///
/// This is the primary entry point for all business logic. It holds
/// the store, configuration, and all services.
pub struct LedgerContext {
    pub config: Config,
    pub store: Arc<DuckDbStore>,
    pub user_service: UserService<DuckDbStore>,
    pub account_service: AccountService<DuckDbStore>,
    pub transfer_service: TransferService<DuckDbStore>,
}

impl LedgerContext {
    /// Open (or create) the ledger stored in `ledger_dir`
    pub fn new(ledger_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(ledger_dir)?;
        let config = Config::load(ledger_dir)?;

        let db_path = ledger_dir.join(&config.database);
        let store = Arc::new(DuckDbStore::new(&db_path)?);

        // Initialize schema
        store.ensure_schema()?;

        let user_service = UserService::new(Arc::clone(&store));
        let account_service = AccountService::new(Arc::clone(&store), config.retry);
        let transfer_service = TransferService::new(Arc::clone(&store), config.retry);

        Ok(Self {
            config,
            store,
            user_service,
            account_service,
            transfer_service,
        })
    }
}
