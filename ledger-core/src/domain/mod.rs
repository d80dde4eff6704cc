//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O.

pub mod amount;
pub mod credential;
mod report;
pub mod result;
mod transaction;
mod user;

pub use amount::Amount;
pub use credential::Argon2Params;
pub use report::{HistoryEntry, LedgerSnapshot, TopTransaction, TopUser};
pub use transaction::{Direction, LedgerEntry};
pub use user::{normalize_username, User, UserId, MAX_USERNAME_LEN};
