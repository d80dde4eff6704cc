//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
mod balance;
mod integrity;
pub mod logging;
pub mod migration;
mod reporting;
mod session;

pub use account::{AccountService, RegisteredUser, TransferReceipt};
pub use balance::BalanceService;
pub use integrity::{CheckResult, CheckStatus, IntegrityReport, IntegrityService, IntegritySummary};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use reporting::ReportingService;
pub use session::{SessionClaims, SessionService};
