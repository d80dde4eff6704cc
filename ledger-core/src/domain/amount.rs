//! Validated transfer/topup amount

use std::fmt;

use serde::Serialize;

use super::result::{Error, Result};

/// Exclusive upper bound for a single topup or transfer
pub const DEFAULT_MAX_AMOUNT_EXCLUSIVE: i64 = 10_000_000;

/// Largest ceiling a configuration may set
///
/// About nine million records at this size still sum within `i64`.
pub const MAX_AMOUNT_CEILING: i64 = 1_000_000_000_000;

/// A strictly positive amount in the smallest currency unit
///
/// Only constructible through validation, so holding an `Amount` means
/// `0 < value < ceiling` was checked against the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Validate an integral amount against an exclusive ceiling
    pub fn new(value: i64, ceiling: i64) -> Result<Self> {
        if value <= 0 {
            return Err(Error::validation("Amount must be a positive integer"));
        }
        if value >= ceiling {
            return Err(Error::validation(format!(
                "Amount must be less than {}",
                ceiling
            )));
        }
        Ok(Self(value))
    }

    /// Parse user input, rejecting anything that is not a plain integer
    ///
    /// `"10.5"`, `"1e3"`, `"0x10"` and out-of-range values all fail with a
    /// validation error rather than being rounded or truncated.
    pub fn parse(text: &str, ceiling: i64) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("Amount is required"));
        }
        let digits = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::validation(format!("Invalid amount: {}", trimmed)));
        }
        let value: i64 = trimmed
            .parse()
            .map_err(|_| Error::validation(format!("Amount out of allowed range: {}", trimmed)))?;
        Self::new(value, ceiling)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
