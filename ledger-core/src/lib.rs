//! Ledger Core - an append-only ledger with derived balances
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (User, LedgerEntry, Amount) and the error taxonomy
//! - **ports**: Trait definitions for storage (LedgerStore, UnitOfWork)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, intent locks)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbStore;
use config::LedgerConfig;
use ports::LedgerStore;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind, OperationResult, Result};
pub use domain::{Amount, Direction, HistoryEntry, LedgerEntry, TopTransaction, TopUser, User, UserId};
pub use services::{EntryPoint, LogEntry, LogEvent, LoggingService};

/// Main context for ledger operations
///
/// Holds the one store every service shares. Building it opens (and
/// migrates) the database.
pub struct LedgerContext {
    pub config: LedgerConfig,
    pub store: Arc<DuckDbStore>,
    pub account_service: AccountService,
    pub balance_service: BalanceService,
    pub reporting_service: ReportingService,
    pub integrity_service: IntegrityService,
    /// Present only when a session secret is configured
    pub session_service: Option<Arc<SessionService>>,
}

impl LedgerContext {
    /// Open the ledger in `ledger_dir`, loading settings.json and `LEDGER_*` overrides
    pub fn new(ledger_dir: &Path) -> Result<Self> {
        let config = LedgerConfig::load(ledger_dir)?;
        Self::with_config(ledger_dir, config)
    }

    /// Open the ledger in `ledger_dir` with an explicit configuration
    pub fn with_config(ledger_dir: &Path, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(ledger_dir)?;
        let store = DuckDbStore::open(&ledger_dir.join("ledger.duckdb"), config.lock_timeout())?;
        Self::build(store, config)
    }

    /// A private in-memory ledger
    pub fn in_memory(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let store = DuckDbStore::open_in_memory(config.lock_timeout())?;
        Self::build(store, config)
    }

    fn build(store: DuckDbStore, config: LedgerConfig) -> Result<Self> {
        store.ensure_schema()?;
        let store = Arc::new(store);
        let shared: Arc<dyn LedgerStore> = store.clone();

        let session_service = config
            .session_secret
            .as_deref()
            .map(|secret| Arc::new(SessionService::new(Arc::clone(&shared), secret, config.session_ttl_secs)));

        Ok(Self {
            account_service: AccountService::new(
                Arc::clone(&shared),
                session_service.clone(),
                config.max_amount_exclusive,
            ),
            balance_service: BalanceService::new(Arc::clone(&shared)),
            reporting_service: ReportingService::new(Arc::clone(&shared), config.report_limit),
            integrity_service: IntegrityService::new(shared),
            session_service,
            store,
            config,
        })
    }

    /// Session service, or a configuration error when no secret is set
    pub fn sessions(&self) -> Result<&SessionService> {
        self.session_service.as_deref().ok_or_else(|| {
            Error::Config(
                "No session secret configured (set LEDGER_SESSION_SECRET or sessionSecret)".to_string(),
            )
        })
    }

    /// Resolve a session token to the calling user
    pub fn authenticate(&self, token: &str) -> Result<UserId> {
        self.sessions()?.resolve(token)
    }
}
