//! User domain model

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Longest display name accepted at registration
pub const MAX_USERNAME_LEN: usize = 64;

/// Opaque user identifier
///
/// Backed by a UUIDv7 string, so identifiers sort lexicographically by
/// creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered ledger participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Hashed credential material, owned by the session collaborator
    #[serde(skip_serializing, default)]
    pub credential: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a generated identifier
    pub fn new(username: impl Into<String>, credential: Option<String>) -> Self {
        Self {
            id: UserId::generate(),
            username: username.into(),
            credential,
            created_at: Utc::now(),
        }
    }
}

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("username pattern is valid"))
}

/// Normalize and validate a display name
///
/// Surrounding whitespace is dropped; what remains must be 1..=64
/// characters of letters, digits, `_`, `.` or `-`.
pub fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim();

    if username.is_empty() {
        return Err(Error::validation("Username must not be empty"));
    }

    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(Error::validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }

    if !username_pattern().is_match(username) {
        return Err(Error::validation(
            "Username may only contain letters, digits, '_', '.' and '-'",
        ));
    }

    Ok(username.to_string())
}
