//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
pub mod migration;
mod retry;
mod transfer;
mod user;

pub use account::AccountService;
pub use migration::{MigrationResult, MigrationService};
pub use transfer::TransferService;
pub use user::UserService;
