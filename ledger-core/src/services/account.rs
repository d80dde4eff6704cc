//! Account service - registration and the only writer to the ledger log
//!
//! Every mutation runs as one unit of work that takes exclusive intent on
//! the account it touches before reading anything, then either commits all
//! of its records or none.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{normalize_username, Amount, Argon2Params, LedgerEntry, User, UserId};
use crate::ports::LedgerStore;
use crate::services::SessionService;

/// Result of a successful registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub user_id: UserId,
    pub username: String,
    /// Session token, when session signing is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Result of a committed transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: String,
    pub receiver: UserId,
    pub amount: i64,
}

/// Account service for registration, topups and transfers
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    sessions: Option<Arc<SessionService>>,
    max_amount_exclusive: i64,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        sessions: Option<Arc<SessionService>>,
        max_amount_exclusive: i64,
    ) -> Self {
        Self {
            store,
            sessions,
            max_amount_exclusive,
        }
    }

    /// Validate a raw amount against the configured ceiling
    pub fn amount(&self, value: i64) -> Result<Amount> {
        Amount::new(value, self.max_amount_exclusive)
    }

    /// Parse a textual amount against the configured ceiling
    pub fn parse_amount(&self, text: &str) -> Result<Amount> {
        Amount::parse(text, self.max_amount_exclusive)
    }

    /// Register a new user, optionally with a password
    pub fn register(&self, username: &str, password: Option<&str>) -> Result<RegisteredUser> {
        let username = normalize_username(username)?;

        let credential = match (password, &self.sessions) {
            (Some(p), Some(sessions)) => Some(sessions.hasher().hash(p)?),
            (Some(p), None) => Some(Argon2Params::default().hash(p)?),
            (None, _) => None,
        };
        let user = User::new(username, credential);

        let mut uow = self.store.begin()?;
        uow.lock_username(&user.username)?;
        if uow.find_user_by_username(&user.username)?.is_some() {
            tracing::warn!("registration rejected: username taken");
            return Err(Error::conflict(format!("Username already exists: {}", user.username)));
        }
        uow.insert_user(&user)?;
        uow.commit()?;

        tracing::info!(user_id = %user.id, "registered user");

        let token = match &self.sessions {
            Some(sessions) => Some(sessions.issue(&user)?),
            None => None,
        };

        Ok(RegisteredUser {
            user_id: user.id,
            username: user.username,
            token,
        })
    }

    /// Unconditionally credit `user`
    pub fn topup(&self, user: &UserId, amount: i64) -> Result<()> {
        let amount = self.amount(amount)?;
        self.topup_amount(user, amount)
    }

    /// Credit `user` with an already validated amount
    pub fn topup_amount(&self, user: &UserId, amount: Amount) -> Result<()> {
        let mut uow = self.store.begin()?;
        // Not needed for a credit, but keeps one serialization point per account
        uow.lock_account(user)?;

        if uow.find_user_by_id(user)?.is_none() {
            return Err(Error::not_found(format!("User not found: {}", user)));
        }

        let balance = uow.balance_of(user)?;
        ensure_credit_fits(balance, amount)?;

        let entry = LedgerEntry::topup(user, amount);
        uow.append(&entry)?;
        uow.commit()?;

        tracing::info!(user_id = %user, entry_id = %entry.id, "topup committed");
        Ok(())
    }

    /// Move `amount` from `sender` to the user named `receiver_username`
    pub fn transfer(&self, sender: &UserId, receiver_username: &str, amount: i64) -> Result<TransferReceipt> {
        let amount = self.amount(amount)?;
        self.transfer_amount(sender, receiver_username, amount)
    }

    /// Transfer with an already validated amount
    pub fn transfer_amount(
        &self,
        sender: &UserId,
        receiver_username: &str,
        amount: Amount,
    ) -> Result<TransferReceipt> {
        let receiver = self
            .store
            .find_user_by_username(receiver_username.trim())?
            .ok_or_else(|| Error::not_found(format!("User not found: {}", receiver_username.trim())))?;

        if &receiver.id == sender {
            return Err(Error::validation("Cannot transfer to yourself"));
        }

        let mut uow = self.store.begin()?;
        uow.lock_account(sender)?;

        if uow.find_user_by_id(sender)?.is_none() {
            return Err(Error::not_found(format!("User not found: {}", sender)));
        }

        // Read only after the intent is held
        let balance = uow.balance_of(sender)?;
        if balance < amount.value() {
            tracing::warn!(user_id = %sender, "transfer rejected: insufficient balance");
            return Err(Error::InsufficientBalance {
                balance,
                requested: amount.value(),
            });
        }
        ensure_credit_fits(uow.balance_of(&receiver.id)?, amount)?;

        let [debit, credit] = LedgerEntry::transfer_pair(sender, &receiver.id, amount);
        let transfer_id = debit.transfer_id.clone().unwrap_or_default();
        uow.append(&debit)?;
        uow.append(&credit)?;
        uow.commit()?;

        tracing::info!(
            sender = %sender,
            receiver = %receiver.id,
            transfer_id = %transfer_id,
            "transfer committed"
        );

        Ok(TransferReceipt {
            transfer_id,
            receiver: receiver.id,
            amount: amount.value(),
        })
    }
}

/// Reject a credit that would take a balance past what `i64` holds
fn ensure_credit_fits(balance: i64, amount: Amount) -> Result<()> {
    match balance.checked_add(amount.value()) {
        Some(_) => Ok(()),
        None => {
            tracing::warn!("credit rejected: balance would overflow");
            Err(Error::validation("Credit would overflow the receiving balance"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapters::duckdb::DuckDbStore;
    use crate::domain::amount::DEFAULT_MAX_AMOUNT_EXCLUSIVE;
    use crate::domain::result::ErrorKind;

    fn service() -> (Arc<dyn LedgerStore>, AccountService) {
        let store = DuckDbStore::open_in_memory(Duration::from_millis(500)).unwrap();
        store.ensure_schema().unwrap();
        let store: Arc<dyn LedgerStore> = Arc::new(store);
        let accounts = AccountService::new(Arc::clone(&store), None, DEFAULT_MAX_AMOUNT_EXCLUSIVE);
        (store, accounts)
    }

    #[test]
    fn test_register_normalizes_and_rejects_duplicates() {
        let (store, accounts) = service();

        let alice = accounts.register("  alice ", None).unwrap();
        assert_eq!(alice.username, "alice");
        assert!(alice.token.is_none());
        assert!(store.find_user_by_id(&alice.user_id).unwrap().is_some());

        let err = accounts.register("alice", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = accounts.register("   ", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_topup_credits_balance() {
        let (store, accounts) = service();
        let alice = accounts.register("alice", None).unwrap();

        accounts.topup(&alice.user_id, 1000).unwrap();
        accounts.topup(&alice.user_id, 1).unwrap();
        assert_eq!(store.balance_of(&alice.user_id).unwrap(), 1001);
    }

    #[test]
    fn test_topup_validation_and_unknown_user() {
        let (_store, accounts) = service();
        let alice = accounts.register("alice", None).unwrap();

        for bad in [0, -5, DEFAULT_MAX_AMOUNT_EXCLUSIVE] {
            let err = accounts.topup(&alice.user_id, bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "amount {}", bad);
        }

        let err = accounts.topup(&UserId::from("ghost"), 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_transfer_moves_value() {
        let (store, accounts) = service();
        let alice = accounts.register("alice", None).unwrap();
        let bob = accounts.register("bob", None).unwrap();
        accounts.topup(&alice.user_id, 1000).unwrap();

        let receipt = accounts.transfer(&alice.user_id, "bob", 400).unwrap();
        assert_eq!(receipt.receiver, bob.user_id);
        assert_eq!(receipt.amount, 400);

        assert_eq!(store.balance_of(&alice.user_id).unwrap(), 600);
        assert_eq!(store.balance_of(&bob.user_id).unwrap(), 400);

        let entries = store.audit_snapshot().unwrap().entries;
        let pair: Vec<_> = entries
            .iter()
            .filter(|e| e.transfer_id.as_deref() == Some(receipt.transfer_id.as_str()))
            .collect();
        assert_eq!(pair.len(), 2);
    }

    #[test]
    fn test_transfer_rejections_leave_balances_unchanged() {
        let (store, accounts) = service();
        let alice = accounts.register("alice", None).unwrap();
        let bob = accounts.register("bob", None).unwrap();
        accounts.topup(&alice.user_id, 100).unwrap();

        let err = accounts.transfer(&alice.user_id, "bob", 101).unwrap_err();
        match err {
            Error::InsufficientBalance { balance, requested } => {
                assert_eq!(balance, 100);
                assert_eq!(requested, 101);
            }
            other => panic!("expected InsufficientBalance, got {:?}", other),
        }

        assert_eq!(
            accounts.transfer(&alice.user_id, "carol", 10).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            accounts.transfer(&alice.user_id, "alice", 10).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            accounts.transfer(&alice.user_id, "bob", 0).unwrap_err().kind(),
            ErrorKind::Validation
        );

        assert_eq!(store.balance_of(&alice.user_id).unwrap(), 100);
        assert_eq!(store.balance_of(&bob.user_id).unwrap(), 0);
        assert_eq!(store.audit_snapshot().unwrap().entries.len(), 1);
    }

    #[test]
    fn test_transfer_of_exact_balance_succeeds() {
        let (store, accounts) = service();
        let alice = accounts.register("alice", None).unwrap();
        accounts.register("bob", None).unwrap();
        accounts.topup(&alice.user_id, 250).unwrap();

        accounts.transfer(&alice.user_id, "bob", 250).unwrap();
        assert_eq!(store.balance_of(&alice.user_id).unwrap(), 0);
    }

    #[test]
    fn test_credits_that_would_overflow_are_rejected() {
        let (store, _) = service();
        let accounts = AccountService::new(Arc::clone(&store), None, i64::MAX);
        let alice = accounts.register("alice", None).unwrap().user_id;
        let bob = accounts.register("bob", None).unwrap().user_id;

        accounts.topup(&alice, i64::MAX - 1).unwrap();
        let err = accounts.topup(&alice, i64::MAX - 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(accounts.topup(&alice, 2).unwrap_err().kind(), ErrorKind::Validation);
        accounts.topup(&alice, 1).unwrap();
        assert_eq!(store.balance_of(&alice).unwrap(), i64::MAX);

        // The receiving side of a transfer is checked the same way
        accounts.topup(&bob, 5).unwrap();
        let err = accounts.transfer(&bob, "alice", 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.balance_of(&bob).unwrap(), 5);
        assert_eq!(store.balance_of(&alice).unwrap(), i64::MAX);
    }

    #[test]
    fn test_parse_amount_uses_configured_ceiling() {
        let (store, _) = service();
        let accounts = AccountService::new(store, None, 1000);
        assert_eq!(accounts.parse_amount("999").unwrap().value(), 999);
        assert!(accounts.parse_amount("1000").is_err());
        assert!(accounts.parse_amount("10.5").is_err());
    }
}
