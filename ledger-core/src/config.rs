//! Configuration management
//!
//! Settings live in `settings.json` inside the ledger directory:
//! ```json
//! {
//!   "maxAmountExclusive": 10000000,
//!   "lockTimeoutMs": 5000,
//!   "reportLimit": 10,
//!   "sessionTtlSecs": 900,
//!   "sessionSecret": "..."
//! }
//! ```
//! Every field may be overridden by a `LEDGER_*` environment variable.
//! Keys this crate doesn't manage are ignored.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::amount::{DEFAULT_MAX_AMOUNT_EXCLUSIVE, MAX_AMOUNT_CEILING};
use crate::domain::result::{Error, Result};

pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_REPORT_LIMIT: usize = 10;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 900;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    max_amount_exclusive: Option<i64>,
    #[serde(default)]
    lock_timeout_ms: Option<u64>,
    #[serde(default)]
    report_limit: Option<usize>,
    #[serde(default)]
    session_ttl_secs: Option<u64>,
    #[serde(default)]
    session_secret: Option<String>,
}

/// Ledger configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Exclusive upper bound for a single topup or transfer
    pub max_amount_exclusive: i64,
    /// Longest wait for exclusive intent on an account
    pub lock_timeout_ms: u64,
    /// Rows returned by each report
    pub report_limit: usize,
    pub session_ttl_secs: u64,
    /// HS256 signing key; session operations are unavailable without one
    pub session_secret: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_amount_exclusive: DEFAULT_MAX_AMOUNT_EXCLUSIVE,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            report_limit: DEFAULT_REPORT_LIMIT,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            session_secret: None,
        }
    }
}

impl LedgerConfig {
    /// Load config from the ledger directory, then apply `LEDGER_*` overrides
    pub fn load(ledger_dir: &Path) -> Result<Self> {
        let raw = read_settings(ledger_dir)?;
        let mut config = Self::from_settings(&raw);
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_settings(raw: &SettingsFile) -> Self {
        let defaults = Self::default();
        Self {
            max_amount_exclusive: raw.max_amount_exclusive.unwrap_or(defaults.max_amount_exclusive),
            lock_timeout_ms: raw.lock_timeout_ms.unwrap_or(defaults.lock_timeout_ms),
            report_limit: raw.report_limit.unwrap_or(defaults.report_limit),
            session_ttl_secs: raw.session_ttl_secs.unwrap_or(defaults.session_ttl_secs),
            session_secret: raw.session_secret.clone().filter(|s| !s.is_empty()),
        }
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LEDGER_MAX_AMOUNT") {
            self.max_amount_exclusive = parse_var("LEDGER_MAX_AMOUNT", &v)?;
        }
        if let Some(v) = lookup("LEDGER_LOCK_TIMEOUT_MS") {
            self.lock_timeout_ms = parse_var("LEDGER_LOCK_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("LEDGER_REPORT_LIMIT") {
            self.report_limit = parse_var("LEDGER_REPORT_LIMIT", &v)?;
        }
        if let Some(v) = lookup("LEDGER_SESSION_TTL_SECS") {
            self.session_ttl_secs = parse_var("LEDGER_SESSION_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("LEDGER_SESSION_SECRET") {
            self.session_secret = Some(v).filter(|s| !s.is_empty());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(2..=MAX_AMOUNT_CEILING).contains(&self.max_amount_exclusive) {
            return Err(Error::Config(format!(
                "maxAmountExclusive must be between 2 and {}, got {}",
                MAX_AMOUNT_CEILING, self.max_amount_exclusive
            )));
        }
        if self.lock_timeout_ms == 0 {
            return Err(Error::Config("lockTimeoutMs must be positive".to_string()));
        }
        if self.report_limit == 0 {
            return Err(Error::Config("reportLimit must be positive".to_string()));
        }
        if self.session_ttl_secs == 0 {
            return Err(Error::Config("sessionTtlSecs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

fn read_settings(ledger_dir: &Path) -> Result<SettingsFile> {
    let settings_path = ledger_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid {}: {}", settings_path.display(), e)))
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = tempdir().unwrap();
        let raw = read_settings(dir.path()).unwrap();
        let config = LedgerConfig::from_settings(&raw);

        assert_eq!(config.max_amount_exclusive, 10_000_000);
        assert_eq!(config.lock_timeout_ms, 5000);
        assert_eq!(config.report_limit, 10);
        assert_eq!(config.session_ttl_secs, 900);
        assert!(config.session_secret.is_none());
    }

    #[test]
    fn test_reads_camel_case_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"maxAmountExclusive": 500, "reportLimit": 3, "sessionSecret": "s3cret"}"#,
        )
        .unwrap();

        let config = LedgerConfig::from_settings(&read_settings(dir.path()).unwrap());
        assert_eq!(config.max_amount_exclusive, 500);
        assert_eq!(config.report_limit, 3);
        assert_eq!(config.lock_timeout_ms, DEFAULT_LOCK_TIMEOUT_MS);
        assert_eq!(config.session_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = LedgerConfig::default();
        config
            .apply_overrides(|key| match key {
                "LEDGER_LOCK_TIMEOUT_MS" => Some("250".to_string()),
                "LEDGER_SESSION_SECRET" => Some("from-env".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.lock_timeout(), Duration::from_millis(250));
        assert_eq!(config.session_secret.as_deref(), Some("from-env"));
        assert_eq!(config.report_limit, DEFAULT_REPORT_LIMIT);
    }

    #[test]
    fn test_bad_override_is_config_error() {
        let mut config = LedgerConfig::default();
        let err = config
            .apply_overrides(|key| (key == "LEDGER_REPORT_LIMIT").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = LedgerConfig { report_limit: 0, ..LedgerConfig::default() };
        assert!(config.validate().is_err());

        let config = LedgerConfig { max_amount_exclusive: 1, ..LedgerConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_settings_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
        assert!(matches!(read_settings(dir.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"theme": "dark", "reportLimit": 4}"#,
        )
        .unwrap();

        let config = LedgerConfig::from_settings(&read_settings(dir.path()).unwrap());
        assert_eq!(config.report_limit, 4);
    }

    #[test]
    fn test_ceiling_is_capped() {
        let mut config = LedgerConfig::default();
        config
            .apply_overrides(|key| (key == "LEDGER_MAX_AMOUNT").then(|| i64::MAX.to_string()))
            .unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = LedgerConfig { max_amount_exclusive: MAX_AMOUNT_CEILING, ..LedgerConfig::default() };
        assert!(config.validate().is_ok());

        let config = LedgerConfig { max_amount_exclusive: MAX_AMOUNT_CEILING + 1, ..LedgerConfig::default() };
        assert!(config.validate().is_err());
    }
}
