//! Reporting service - read-only ranked views over the log
//!
//! Reports need no intents: transfer halves are committed together, so a
//! query sees either both or neither.

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{HistoryEntry, TopTransaction, TopUser, UserId};
use crate::ports::LedgerStore;

pub struct ReportingService {
    store: Arc<dyn LedgerStore>,
    limit: usize,
}

impl ReportingService {
    pub fn new(store: Arc<dyn LedgerStore>, limit: usize) -> Self {
        Self { store, limit }
    }

    fn ensure_caller(&self, caller: &UserId) -> Result<()> {
        match self.store.find_user_by_id(caller)? {
            Some(_) => Ok(()),
            None => Err(Error::not_found(format!("User not found: {}", caller))),
        }
    }

    /// Senders ranked by total outbound volume across the whole ledger
    ///
    /// The caller only gates access; the ranking is not scoped to them.
    /// Ties are broken by username.
    pub fn top_users_by_outbound_volume(&self, caller: &UserId) -> Result<Vec<TopUser>> {
        self.ensure_caller(caller)?;
        self.store.outbound_volume_ranking(self.limit)
    }

    /// The caller's transfers, signed from their side, largest first
    ///
    /// Topups have no counterparty and are not listed. Equal magnitudes
    /// list the newest first.
    pub fn top_transactions_per_user(&self, caller: &UserId) -> Result<Vec<TopTransaction>> {
        self.ensure_caller(caller)?;
        self.store.counterparty_transactions(caller, self.limit)
    }

    /// Every record touching the caller, newest first
    pub fn history(&self, caller: &UserId) -> Result<Vec<HistoryEntry>> {
        self.ensure_caller(caller)?;
        self.store.history(caller)
    }
}
