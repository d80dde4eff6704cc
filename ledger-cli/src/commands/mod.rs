//! CLI command implementations

pub mod account;
pub mod doctor;
pub mod logs;
pub mod reports;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use ledger_core::{EntryPoint, LedgerContext, LogEvent, LoggingService, UserId};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let ledger_dir = get_ledger_dir().ok()?;
    std::fs::create_dir_all(&ledger_dir).ok()?;
    LoggingService::new(&ledger_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!(error = %e, "failed to record log event");
        }
    }
}

/// Get the ledger directory from LEDGER_DIR or ~/.ledger
pub fn get_ledger_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LEDGER_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".ledger"))
        .ok_or_else(|| anyhow!("Could not find home directory; set LEDGER_DIR"))
}

/// Open the ledger context
pub fn get_context() -> Result<LedgerContext> {
    let ledger_dir = get_ledger_dir()?;
    std::fs::create_dir_all(&ledger_dir)
        .with_context(|| format!("Failed to create ledger directory: {:?}", ledger_dir))?;

    LedgerContext::new(&ledger_dir).context("Failed to open ledger")
}

/// Resolve the calling user from the session token
pub fn require_caller(ctx: &LedgerContext, token: Option<&str>) -> Result<UserId> {
    let token = token.ok_or_else(|| anyhow!("Not logged in: pass --token or set LEDGER_TOKEN"))?;
    Ok(ctx.authenticate(token)?)
}

/// Password from LEDGER_PASSWORD, or an interactive hidden prompt
pub fn read_password(confirm: bool) -> Result<String> {
    if let Ok(password) = std::env::var("LEDGER_PASSWORD") {
        return Ok(password);
    }

    let mut prompt = dialoguer::Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}
