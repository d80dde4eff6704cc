//! Read models produced by the reporting queries

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transaction::{Direction, LedgerEntry};
use super::user::UserId;

/// One row of the outbound-volume ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUser {
    pub username: String,
    pub transacted_value: i64,
}

/// One transfer half seen from the caller's side
///
/// `amount` is negative when the caller sent, positive when the caller
/// received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopTransaction {
    pub username: String,
    pub amount: i64,
}

/// A log record as listed in a user's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub direction: Direction,
    /// Signed from the owner's perspective
    pub amount: i64,
    /// Other party of a transfer; `None` for topups
    pub counterparty: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The whole log and the store's balance for every user, read in one
/// transaction
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub user_count: i64,
    /// Insertion order
    pub entries: Vec<LedgerEntry>,
    pub balances: HashMap<UserId, i64>,
}
