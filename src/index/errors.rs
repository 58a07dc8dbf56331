//! Index error types
//!
//! Error codes:
//! - CHAINPLAN_INDEX_UNSUPPORTED_OPERATION (FATAL)
//! - CHAINPLAN_INDEX_KEY_CONVERSION (ERROR)
//! - CHAINPLAN_INDEX_DUPLICATE_KEY (ERROR)
//! - CHAINPLAN_QUERY_CANCELLED (ERROR)
//! - CHAINPLAN_QUERY_TIMEOUT (ERROR)
//! - CHAINPLAN_INDEX_ENGINE (ERROR)

use thiserror::Error;

use super::key::{IndexKey, KeyType};

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// A filter value could not be coerced to the key type an index declares.
///
/// This is a genuine mismatch between predicate and schema and is surfaced
/// to the caller as a query execution error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot convert {value} to index key of type {key_type}: {reason}")]
pub struct KeyConversionError {
    /// Rendered source value
    pub value: String,
    /// Target key type
    pub key_type: KeyType,
    /// Why the conversion failed
    pub reason: String,
}

impl KeyConversionError {
    pub fn new(value: impl ToString, key_type: KeyType, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            key_type,
            reason: reason.into(),
        }
    }
}

/// Errors raised by index reads and writes
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// Operation not allowed on this index (e.g. mutating a chained proxy)
    #[error("operation '{operation}' is not supported by index '{index}'")]
    UnsupportedOperation { index: String, operation: &'static str },

    /// Filter value does not match the index key type
    #[error(transparent)]
    KeyConversion(#[from] KeyConversionError),

    /// Unique index already holds a different record for this key
    #[error("index '{index}' already contains key {key:?}")]
    DuplicateKey { index: String, key: IndexKey },

    /// The surrounding query was cancelled
    #[error("query cancelled")]
    Cancelled,

    /// The surrounding query ran past its deadline
    #[error("query timed out")]
    Timeout,

    /// Failure inside the index engine itself
    #[error("index engine failure: {0}")]
    Engine(String),
}

impl IndexError {
    /// Creates an unsupported operation error
    pub fn unsupported(index: impl Into<String>, operation: &'static str) -> Self {
        IndexError::UnsupportedOperation {
            index: index.into(),
            operation,
        }
    }

    /// Returns the string error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::UnsupportedOperation { .. } => "CHAINPLAN_INDEX_UNSUPPORTED_OPERATION",
            IndexError::KeyConversion(_) => "CHAINPLAN_INDEX_KEY_CONVERSION",
            IndexError::DuplicateKey { .. } => "CHAINPLAN_INDEX_DUPLICATE_KEY",
            IndexError::Cancelled => "CHAINPLAN_QUERY_CANCELLED",
            IndexError::Timeout => "CHAINPLAN_QUERY_TIMEOUT",
            IndexError::Engine(_) => "CHAINPLAN_INDEX_ENGINE",
        }
    }

    /// Unsupported operations indicate a caller bug and cannot be recovered from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IndexError::UnsupportedOperation { .. })
    }
}
