//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services
//! depend only on these traits, not on concrete implementations.

mod store;

pub use store::{LedgerStore, LedgerTx};
