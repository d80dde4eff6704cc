//! Ledger store port - storage abstraction

use crate::domain::result::Result;
use crate::domain::{HistoryEntry, LedgerEntry, LedgerSnapshot, TopTransaction, TopUser, User, UserId};

/// Durable ledger storage
///
/// Reads outside a [`UnitOfWork`] each run against one consistent snapshot
/// and never wait on exclusive intents.
/// Every mutation goes through [`LedgerStore::begin`].
pub trait LedgerStore: Send + Sync {
    /// Start an atomic unit of work
    fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    // === Users ===

    fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>>;

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    // === Balances ===

    /// Sum of credits to `user` minus sum of debits from `user`
    fn balance_of(&self, user: &UserId) -> Result<i64>;

    // === Reports ===

    /// Senders ranked by total debited, largest first
    fn outbound_volume_ranking(&self, limit: usize) -> Result<Vec<TopUser>>;

    /// Transfer halves involving `user`, largest magnitude first
    fn counterparty_transactions(&self, user: &UserId, limit: usize) -> Result<Vec<TopTransaction>>;

    /// Every record touching `user`, newest first
    fn history(&self, user: &UserId) -> Result<Vec<HistoryEntry>>;

    // === Integrity ===

    /// Every record plus every user's balance, all from one snapshot
    fn audit_snapshot(&self) -> Result<LedgerSnapshot>;
}

/// One all-or-nothing group of ledger reads and writes
///
/// Exclusive intents must be taken before the first read or write; the
/// underlying transaction starts only once they are all held. Dropping a
/// unit without calling [`UnitOfWork::commit`] rolls everything back.
/// Intents are released after the commit or rollback completes.
pub trait UnitOfWork: Send {
    /// Acquire exclusive intent on an account, blocking other units that
    /// want the same account until this one finishes
    fn lock_account(&mut self, user: &UserId) -> Result<()>;

    /// Acquire exclusive intent on a display name (registration)
    fn lock_username(&mut self, username: &str) -> Result<()>;

    fn find_user_by_id(&mut self, id: &UserId) -> Result<Option<User>>;

    fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>>;

    /// Derived balance as seen inside this unit
    fn balance_of(&mut self, user: &UserId) -> Result<i64>;

    fn insert_user(&mut self, user: &User) -> Result<()>;

    /// Append one record to the log
    fn append(&mut self, entry: &LedgerEntry) -> Result<()>;

    /// Make every write of this unit durable and release its intents
    fn commit(self: Box<Self>) -> Result<()>;
}
