//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// The first four variants are the business taxonomy callers branch on.
/// Every storage failure, including a lock wait that ran out of time,
/// reports [`ErrorKind::StorageUnavailable`] so it can never be mistaken
/// for a declined operation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient balance: requested {requested}, available {balance}")]
    InsufficientBalance { balance: i64, requested: i64 },

    #[error("Timed out after {waited_ms}ms waiting for exclusive access to {resource}")]
    LockTimeout { resource: String, waited_ms: u64 },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of [`Error`] for transport layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    InsufficientBalance,
    StorageUnavailable,
    Unauthorized,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::StorageUnavailable => "storage_unavailable",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Internal => "internal",
        }
    }
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Error::LockTimeout { .. } | Error::StorageUnavailable(_) => {
                ErrorKind::StorageUnavailable
            }
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::Config(_) | Error::Io(_) | Error::Json(_) => ErrorKind::Internal,
        }
    }

    /// Only a lock wait that ran out of time may be retried as-is: the unit
    /// of work it belonged to never wrote anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockTimeout { .. })
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Error::StorageUnavailable(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for transport serialization)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: &Error) -> Self {
        let mut context = HashMap::new();
        context.insert("retryable".to_string(), serde_json::Value::Bool(error.is_retryable()));
        if let Error::InsufficientBalance { balance, requested } = error {
            context.insert("balance".to_string(), (*balance).into());
            context.insert("requested".to_string(), (*requested).into());
        }

        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            context: Some(context),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(&e),
        }
    }
}
