//! Schema error types
//!
//! Error codes:
//! - CHAINPLAN_SCHEMA_CLASS_NOT_FOUND
//! - CHAINPLAN_SCHEMA_DUPLICATE_CLASS
//! - CHAINPLAN_SCHEMA_DUPLICATE_INDEX
//! - CHAINPLAN_SCHEMA_PROPERTY_NOT_FOUND
//! - CHAINPLAN_SCHEMA_INVALID_DEFINITION
//! - CHAINPLAN_SCHEMA_LOAD_FAILED

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while assembling a catalog
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("class '{0}' not found")]
    ClassNotFound(String),

    #[error("class '{0}' already defined")]
    DuplicateClass(String),

    #[error("index '{0}' already defined")]
    DuplicateIndex(String),

    #[error("property '{property}' not found on class '{class}'")]
    PropertyNotFound { class: String, property: String },

    #[error("invalid schema definition: {0}")]
    InvalidDefinition(String),

    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse schema definition: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SchemaError {
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::ClassNotFound(_) => "CHAINPLAN_SCHEMA_CLASS_NOT_FOUND",
            SchemaError::DuplicateClass(_) => "CHAINPLAN_SCHEMA_DUPLICATE_CLASS",
            SchemaError::DuplicateIndex(_) => "CHAINPLAN_SCHEMA_DUPLICATE_INDEX",
            SchemaError::PropertyNotFound { .. } => "CHAINPLAN_SCHEMA_PROPERTY_NOT_FOUND",
            SchemaError::InvalidDefinition(_) => "CHAINPLAN_SCHEMA_INVALID_DEFINITION",
            SchemaError::Io(_) | SchemaError::Parse(_) => "CHAINPLAN_SCHEMA_LOAD_FAILED",
        }
    }
}
