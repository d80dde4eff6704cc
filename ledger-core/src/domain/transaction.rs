//! Ledger log record

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::amount::Amount;
use super::result::{Error, Result};
use super::user::UserId;

/// Direction tag of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Credit => "CREDIT",
            Direction::Debit => "DEBIT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CREDIT" => Ok(Direction::Credit),
            "DEBIT" => Ok(Direction::Debit),
            other => Err(Error::storage(format!("Unknown transaction direction: {}", other))),
        }
    }
}

/// One immutable record of the append-only log
///
/// A CREDIT carries `to_user` only, a DEBIT carries `from_user` only. The
/// two halves of a transfer share `transfer_id`; topups have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub amount: i64,
    pub direction: Direction,
    pub from_user: Option<UserId>,
    pub to_user: Option<UserId>,
    pub transfer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    fn new(amount: Amount, direction: Direction) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            amount: amount.value(),
            direction,
            from_user: None,
            to_user: None,
            transfer_id: None,
            created_at: Utc::now(),
        }
    }

    /// Unconditional credit to `to`
    pub fn topup(to: &UserId, amount: Amount) -> Self {
        let mut entry = Self::new(amount, Direction::Credit);
        entry.to_user = Some(to.clone());
        entry
    }

    /// The DEBIT+CREDIT pair of a transfer, sharing one transfer id
    pub fn transfer_pair(from: &UserId, to: &UserId, amount: Amount) -> [Self; 2] {
        let transfer_id = Uuid::now_v7().to_string();

        let mut debit = Self::new(amount, Direction::Debit);
        debit.from_user = Some(from.clone());
        debit.transfer_id = Some(transfer_id.clone());

        let mut credit = Self::new(amount, Direction::Credit);
        credit.to_user = Some(to.clone());
        credit.transfer_id = Some(transfer_id);

        [debit, credit]
    }

    /// Whether the record has the shape its direction requires
    pub fn is_well_formed(&self) -> bool {
        self.amount > 0
            && match self.direction {
                Direction::Credit => self.to_user.is_some() && self.from_user.is_none(),
                Direction::Debit => self.from_user.is_some() && self.to_user.is_none(),
            }
    }

    /// Effect of this record on `user`'s derived balance
    pub fn signed_amount_for(&self, user: &UserId) -> i64 {
        match self.direction {
            Direction::Credit if self.to_user.as_ref() == Some(user) => self.amount,
            Direction::Debit if self.from_user.as_ref() == Some(user) => -self.amount,
            _ => 0,
        }
    }
}
