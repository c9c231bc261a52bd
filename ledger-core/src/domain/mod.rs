//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod money;
pub mod result;
mod transfer;
mod user;

pub use account::{Account, AccountBalance};
pub use transfer::{validate_request_id, Transfer, TransferReceipt, TransferRequest, MAX_REQUEST_ID_LEN};
pub use user::{NewUser, User};
