//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the durable LedgerStore
//! - An in-memory LedgerStore for tests and demos

pub mod duckdb;
pub mod memory;
