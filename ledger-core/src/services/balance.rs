//! Balance service - derived balances

use std::sync::Arc;

use crate::domain::result::Result;
use crate::domain::UserId;
use crate::ports::LedgerStore;

/// Derives balances from the log; never writes
pub struct BalanceService {
    store: Arc<dyn LedgerStore>,
}

impl BalanceService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Credits to `user` minus debits from `user`, from one snapshot
    ///
    /// A user with no records (or no account) has balance 0.
    pub fn get_balance(&self, user: &UserId) -> Result<i64> {
        self.store.balance_of(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapters::duckdb::DuckDbStore;
    use crate::services::AccountService;

    #[test]
    fn test_balance_is_pure_fold() {
        let store = DuckDbStore::open_in_memory(Duration::from_millis(200)).unwrap();
        store.ensure_schema().unwrap();
        let store: Arc<dyn LedgerStore> = Arc::new(store);
        let accounts = AccountService::new(Arc::clone(&store), None, 10_000_000);
        let balances = BalanceService::new(Arc::clone(&store));

        let alice = accounts.register("alice", None).unwrap().user_id;
        accounts.register("bob", None).unwrap();
        assert_eq!(balances.get_balance(&alice).unwrap(), 0);

        accounts.topup(&alice, 500).unwrap();
        accounts.transfer(&alice, "bob", 120).unwrap();

        let first = balances.get_balance(&alice).unwrap();
        let second = balances.get_balance(&alice).unwrap();
        assert_eq!(first, 380);
        assert_eq!(first, second);
        assert_eq!(balances.get_balance(&UserId::from("nobody")).unwrap(), 0);
    }
}
