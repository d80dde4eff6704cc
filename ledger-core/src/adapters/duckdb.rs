//! DuckDB ledger store implementation

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use parking_lot::Mutex;

use super::locks::{IntentGuard, IntentLocks};
use crate::domain::result::{Error, Result};
use crate::domain::{
    Direction, HistoryEntry, LedgerEntry, LedgerSnapshot, TopTransaction, TopUser, User, UserId,
};
use crate::ports::{LedgerStore, UnitOfWork};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Whether a storage error is a uniqueness violation
fn is_unique_violation(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("duplicate key") || lower.contains("unique constraint")
}

/// DuckDB-backed [`LedgerStore`]
///
/// The store keeps one root connection and hands out clones of it: one per
/// plain read and one per unit of work. Units for different accounts proceed
/// side by side while [`IntentLocks`] serializes units for the same account.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    locks: Arc<IntentLocks>,
}

impl DuckDbStore {
    /// Open (or create) a ledger database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which can occur when another process is briefly holding the file.
    pub fn open(db_path: &Path, lock_timeout: Duration) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        locks: IntentLocks::new(lock_timeout),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::storage(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a private in-memory ledger (tests, dry runs)
    pub fn open_in_memory(lock_timeout: Duration) -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            locks: IntentLocks::new(lock_timeout),
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs one
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn.lock();
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Intent registry shared by every unit of work on this store
    pub fn locks(&self) -> &Arc<IntentLocks> {
        &self.locks
    }

    /// A connection of its own for one plain read
    ///
    /// The root mutex is held only while cloning, never while a query runs.
    fn reader(&self) -> Result<Connection> {
        Ok(self.conn.lock().try_clone()?)
    }
}

impl LedgerStore for DuckDbStore {
    fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let conn = self.conn.lock().try_clone()?;
        Ok(Box::new(DuckDbUnitOfWork {
            conn,
            locks: Arc::clone(&self.locks),
            in_transaction: false,
            finished: false,
            intents: Vec::new(),
        }))
    }

    fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
        select_user(&self.reader()?, "id", id.as_str())
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        select_user(&self.reader()?, "username", username)
    }

    fn balance_of(&self, user: &UserId) -> Result<i64> {
        select_balance(&self.reader()?, user)
    }

    fn outbound_volume_ranking(&self, limit: usize) -> Result<Vec<TopUser>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT u.username, CAST(SUM(t.amount) AS BIGINT) AS total
             FROM ledger_transactions t
             JOIN users u ON u.id = t.from_user
             WHERE t.direction = 'DEBIT'
             GROUP BY u.username
             ORDER BY total DESC, u.username ASC
             LIMIT ?",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(TopUser {
                    username: row.get(0)?,
                    transacted_value: row.get(1)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        Ok(rows)
    }

    fn counterparty_transactions(&self, user: &UserId, limit: usize) -> Result<Vec<TopTransaction>> {
        let conn = self.reader()?;
        // The other half of the pair names the counterparty
        let mut stmt = conn.prepare(
            "SELECT cp.username,
                    CASE WHEN mine.direction = 'DEBIT' THEN -mine.amount ELSE mine.amount END
             FROM ledger_transactions mine
             JOIN ledger_transactions other
               ON other.transfer_id = mine.transfer_id AND other.id <> mine.id
             JOIN users cp ON cp.id = COALESCE(other.from_user, other.to_user)
             WHERE mine.transfer_id IS NOT NULL
               AND ((mine.direction = 'DEBIT' AND mine.from_user = ?)
                 OR (mine.direction = 'CREDIT' AND mine.to_user = ?))
             ORDER BY mine.amount DESC, mine.id DESC
             LIMIT ?",
        )?;

        let rows = stmt
            .query_map(params![user.as_str(), user.as_str(), limit as i64], |row| {
                Ok(TopTransaction {
                    username: row.get(0)?,
                    amount: row.get(1)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        Ok(rows)
    }

    fn history(&self, user: &UserId) -> Result<Vec<HistoryEntry>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT mine.id, mine.direction, mine.amount, cp.username, mine.created_at::VARCHAR
             FROM ledger_transactions mine
             LEFT JOIN ledger_transactions other
               ON other.transfer_id = mine.transfer_id AND other.id <> mine.id
             LEFT JOIN users cp ON cp.id = COALESCE(other.from_user, other.to_user)
             WHERE (mine.direction = 'DEBIT' AND mine.from_user = ?)
                OR (mine.direction = 'CREDIT' AND mine.to_user = ?)
             ORDER BY mine.id DESC",
        )?;

        let raw = stmt
            .query_map(params![user.as_str(), user.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(id, direction, amount, counterparty, created_at)| -> Result<HistoryEntry> {
                let direction: Direction = direction.parse()?;
                let amount = match direction {
                    Direction::Credit => amount,
                    Direction::Debit => -amount,
                };
                Ok(HistoryEntry {
                    id,
                    direction,
                    amount,
                    counterparty,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    fn audit_snapshot(&self) -> Result<LedgerSnapshot> {
        let conn = self.reader()?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        let snapshot = read_snapshot(&conn);
        // Nothing was written; ending the transaction is all that's left
        if let Err(e) = conn.execute_batch("ROLLBACK") {
            tracing::warn!(error = %e, "failed to end snapshot transaction");
        }
        snapshot
    }
}

/// A unit of work on its own connection
///
/// `BEGIN TRANSACTION` is issued lazily by the first read or write, which
/// is what lets every intent be in place before the snapshot is taken.
pub struct DuckDbUnitOfWork {
    conn: Connection,
    locks: Arc<IntentLocks>,
    in_transaction: bool,
    finished: bool,
    // Declared after `conn`: fields drop in order, so the rollback and the
    // connection close happen before intents are released.
    intents: Vec<IntentGuard>,
}

impl DuckDbUnitOfWork {
    fn acquire(&mut self, resource: String) -> Result<()> {
        if self.in_transaction {
            return Err(Error::storage(
                "exclusive intent must be acquired before the unit reads or writes",
            ));
        }
        if self.intents.iter().any(|g| g.resource() == resource) {
            return Ok(());
        }
        let guard = self.locks.acquire(&resource)?;
        self.intents.push(guard);
        Ok(())
    }

    fn start(&mut self) -> Result<&Connection> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN TRANSACTION")?;
            self.in_transaction = true;
        }
        Ok(&self.conn)
    }
}

impl UnitOfWork for DuckDbUnitOfWork {
    fn lock_account(&mut self, user: &UserId) -> Result<()> {
        self.acquire(IntentLocks::account_key(user.as_str()))
    }

    fn lock_username(&mut self, username: &str) -> Result<()> {
        self.acquire(IntentLocks::username_key(username))
    }

    fn find_user_by_id(&mut self, id: &UserId) -> Result<Option<User>> {
        let conn = self.start()?;
        select_user(conn, "id", id.as_str())
    }

    fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>> {
        let conn = self.start()?;
        select_user(conn, "username", username)
    }

    fn balance_of(&mut self, user: &UserId) -> Result<i64> {
        let conn = self.start()?;
        select_balance(conn, user)
    }

    fn insert_user(&mut self, user: &User) -> Result<()> {
        let conn = self.start()?;
        conn.execute(
            "INSERT INTO users (id, username, credential, created_at) VALUES (?, ?, ?, ?)",
            params![
                user.id.as_str(),
                user.username,
                user.credential,
                format_timestamp(&user.created_at),
            ],
        )
        .map_err(|e| {
            let msg = e.to_string();
            if is_unique_violation(&msg) {
                Error::conflict(format!("Username already exists: {}", user.username))
            } else {
                Error::StorageUnavailable(msg)
            }
        })?;
        Ok(())
    }

    fn append(&mut self, entry: &LedgerEntry) -> Result<()> {
        let conn = self.start()?;
        conn.execute(
            "INSERT INTO ledger_transactions
                (id, amount, direction, from_user, to_user, transfer_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.id,
                entry.amount,
                entry.direction.as_str(),
                entry.from_user.as_ref().map(|u| u.as_str()),
                entry.to_user.as_ref().map(|u| u.as_str()),
                entry.transfer_id,
                format_timestamp(&entry.created_at),
            ],
        )?;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT")?;
        }
        self.finished = true;
        Ok(())
    }
}

impl Drop for DuckDbUnitOfWork {
    fn drop(&mut self) {
        if self.in_transaction && !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "rollback failed");
            }
        }
    }
}

// Shared statements (used by both the store and units of work)

fn select_user(conn: &Connection, column: &str, value: &str) -> Result<Option<User>> {
    // `column` is always one of our own literals, never caller input
    let sql = format!(
        "SELECT id, username, credential, created_at::VARCHAR FROM users WHERE {} = ?",
        column
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![value], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    match rows.next() {
        Some(row) => {
            let (id, username, credential, created_at) = row?;
            Ok(Some(User {
                id: UserId::from(id),
                username,
                credential,
                created_at: parse_timestamp(&created_at)?,
            }))
        }
        None => Ok(None),
    }
}

fn select_balance(conn: &Connection, user: &UserId) -> Result<i64> {
    let balance: i64 = conn.query_row(
        "SELECT CAST(COALESCE(SUM(CASE WHEN direction = 'CREDIT' THEN amount ELSE -amount END), 0) AS BIGINT)
         FROM ledger_transactions
         WHERE (direction = 'CREDIT' AND to_user = ?)
            OR (direction = 'DEBIT' AND from_user = ?)",
        params![user.as_str(), user.as_str()],
        |row| row.get(0),
    )?;
    Ok(balance)
}

fn read_snapshot(conn: &Connection) -> Result<LedgerSnapshot> {
    let user_count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT u.id,
                CAST(COALESCE(SUM(CASE WHEN t.direction = 'CREDIT' THEN t.amount ELSE -t.amount END), 0) AS BIGINT)
         FROM users u
         LEFT JOIN ledger_transactions t
           ON (t.direction = 'CREDIT' AND t.to_user = u.id)
           OR (t.direction = 'DEBIT' AND t.from_user = u.id)
         GROUP BY u.id",
    )?;
    let balances = stmt
        .query_map([], |row| Ok((UserId::from(row.get::<_, String>(0)?), row.get::<_, i64>(1)?)))?
        .collect::<duckdb::Result<HashMap<_, _>>>()?;

    Ok(LedgerSnapshot {
        user_count,
        entries: select_entries(conn)?,
        balances,
    })
}

fn select_entries(conn: &Connection) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, amount, direction, from_user, to_user, transfer_id, created_at::VARCHAR
         FROM ledger_transactions
         ORDER BY id",
    )?;

    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?
        .collect::<duckdb::Result<Vec<_>>>()?;

    raw.into_iter()
        .map(|(id, amount, direction, from_user, to_user, transfer_id, created_at)| -> Result<LedgerEntry> {
            Ok(LedgerEntry {
                id,
                amount,
                direction: direction.parse()?,
                from_user: from_user.map(UserId::from),
                to_user: to_user.map(UserId::from),
                transfer_id,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .collect()
}

// Helper functions

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::storage(format!("Unreadable timestamp {:?}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Amount;

    fn store() -> DuckDbStore {
        let store = DuckDbStore::open_in_memory(Duration::from_millis(200)).unwrap();
        store.ensure_schema().unwrap();
        store
    }

    fn amount(v: i64) -> Amount {
        Amount::new(v, 10_000_000).unwrap()
    }

    fn register(store: &DuckDbStore, name: &str) -> User {
        let user = User::new(name, None);
        let mut uow = store.begin().unwrap();
        uow.insert_user(&user).unwrap();
        uow.commit().unwrap();
        user
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error("IO Error: Could not set lock on file: Resource temporarily unavailable"));
        assert!(is_retryable_error("The process cannot access the file because it is being used by another process"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }

    #[test]
    fn test_timestamp_round_trip() {
        let now = Utc::now();
        let parsed = parse_timestamp(&format_timestamp(&now)).unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
        assert!(parse_timestamp("2024-03-01 09:30:00").is_ok());
    }

    #[test]
    fn test_unreadable_timestamp_is_storage_error() {
        for bad in ["", "yesterday", "2024-13-45 99:00:00"] {
            assert!(
                matches!(parse_timestamp(bad), Err(Error::StorageUnavailable(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_user_round_trip() {
        let store = store();
        let alice = register(&store, "alice");

        let by_name = store.find_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, alice.id);
        let by_id = store.find_user_by_id(&alice.id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert!(store.find_user_by_username("nobody").unwrap().is_none());
        assert_eq!(store.audit_snapshot().unwrap().user_count, 1);
    }

    #[test]
    fn test_duplicate_username_is_conflict() {
        let store = store();
        register(&store, "alice");

        let mut uow = store.begin().unwrap();
        let err = uow.insert_user(&User::new("alice", None)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "got {:?}", err);
    }

    #[test]
    fn test_commit_makes_writes_visible() {
        let store = store();
        let alice = register(&store, "alice");

        let mut uow = store.begin().unwrap();
        uow.lock_account(&alice.id).unwrap();
        uow.append(&LedgerEntry::topup(&alice.id, amount(700))).unwrap();
        assert_eq!(uow.balance_of(&alice.id).unwrap(), 700);
        uow.commit().unwrap();

        assert_eq!(store.balance_of(&alice.id).unwrap(), 700);
    }

    #[test]
    fn test_dropped_unit_rolls_back_and_releases_intent() {
        let store = store();
        let alice = register(&store, "alice");
        let key = IntentLocks::account_key(alice.id.as_str());

        {
            let mut uow = store.begin().unwrap();
            uow.lock_account(&alice.id).unwrap();
            uow.append(&LedgerEntry::topup(&alice.id, amount(50))).unwrap();
            assert!(store.locks().is_held(&key));
        }

        assert!(!store.locks().is_held(&key));
        assert_eq!(store.balance_of(&alice.id).unwrap(), 0);
        assert!(store.audit_snapshot().unwrap().entries.is_empty());
    }

    #[test]
    fn test_intent_after_first_read_is_refused() {
        let store = store();
        let alice = register(&store, "alice");

        let mut uow = store.begin().unwrap();
        uow.balance_of(&alice.id).unwrap();
        let err = uow.lock_account(&alice.id).unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable(_)));
    }

    #[test]
    fn test_second_unit_waits_for_intent() {
        let store = store();
        let alice = register(&store, "alice");

        let mut first = store.begin().unwrap();
        first.lock_account(&alice.id).unwrap();

        let mut second = store.begin().unwrap();
        let err = second.lock_account(&alice.id).unwrap_err();
        assert!(matches!(err, Error::LockTimeout { .. }));

        first.commit().unwrap();
        second.lock_account(&alice.id).unwrap();
    }

    #[test]
    fn test_shape_constraint_enforced_by_schema() {
        let store = store();
        let alice = register(&store, "alice");

        let mut bad = LedgerEntry::topup(&alice.id, amount(10));
        bad.from_user = Some(alice.id.clone());

        let mut uow = store.begin().unwrap();
        assert!(uow.append(&bad).is_err());
    }

    #[test]
    fn test_reports_on_empty_ledger() {
        let store = store();
        let alice = register(&store, "alice");

        assert!(store.outbound_volume_ranking(10).unwrap().is_empty());
        assert!(store.counterparty_transactions(&alice.id, 10).unwrap().is_empty());
        assert!(store.history(&alice.id).unwrap().is_empty());
        assert_eq!(store.balance_of(&alice.id).unwrap(), 0);
    }

    #[test]
    fn test_history_names_counterparty() {
        let store = store();
        let alice = register(&store, "alice");
        let bob = register(&store, "bob");

        let mut uow = store.begin().unwrap();
        uow.append(&LedgerEntry::topup(&alice.id, amount(1000))).unwrap();
        for entry in LedgerEntry::transfer_pair(&alice.id, &bob.id, amount(250)) {
            uow.append(&entry).unwrap();
        }
        uow.commit().unwrap();

        let history = store.history(&alice.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].amount, -250);
        assert_eq!(history[0].counterparty.as_deref(), Some("bob"));
        assert_eq!(history[1].amount, 1000);
        assert_eq!(history[1].counterparty, None);

        let bob_history = store.history(&bob.id).unwrap();
        assert_eq!(bob_history.len(), 1);
        assert_eq!(bob_history[0].amount, 250);
        assert_eq!(bob_history[0].counterparty.as_deref(), Some("alice"));
    }

    #[test]
    fn test_snapshot_balances_cover_every_user() {
        let store = store();
        let alice = register(&store, "alice");
        let bob = register(&store, "bob");
        let carol = register(&store, "carol");

        let mut uow = store.begin().unwrap();
        uow.append(&LedgerEntry::topup(&alice.id, amount(500))).unwrap();
        for entry in LedgerEntry::transfer_pair(&alice.id, &bob.id, amount(120)) {
            uow.append(&entry).unwrap();
        }
        uow.commit().unwrap();

        let snapshot = store.audit_snapshot().unwrap();
        assert_eq!(snapshot.user_count, 3);
        assert_eq!(snapshot.entries.len(), 3);
        assert_eq!(snapshot.balances[&alice.id], 380);
        assert_eq!(snapshot.balances[&bob.id], 120);
        assert_eq!(snapshot.balances[&carol.id], 0);
    }

    #[test]
    fn test_reads_proceed_while_units_are_open() {
        let store = Arc::new(store());
        let alice = register(&store, "alice");

        let mut seed = store.begin().unwrap();
        seed.append(&LedgerEntry::topup(&alice.id, amount(300))).unwrap();
        seed.commit().unwrap();

        // An open unit holding intent and an uncommitted write
        let mut open_unit = store.begin().unwrap();
        open_unit.lock_account(&alice.id).unwrap();
        open_unit.append(&LedgerEntry::topup(&alice.id, amount(50))).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let alice = alice.id.clone();
                thread::spawn(move || {
                    for _ in 0..20 {
                        assert_eq!(store.balance_of(&alice).unwrap(), 300);
                        assert_eq!(store.history(&alice).unwrap().len(), 1);
                    }
                })
            })
            .collect();
        for reader in readers {
            reader.join().unwrap();
        }

        open_unit.commit().unwrap();
        assert_eq!(store.balance_of(&alice.id).unwrap(), 350);
    }
}
