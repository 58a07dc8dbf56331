//! Planner error types
//!
//! Error codes:
//! - CHAINPLAN_PLAN_CLASS_NOT_FOUND
//! - CHAINPLAN_PLAN_PROPERTY_NOT_FOUND
//! - CHAINPLAN_PLAN_LINKED_CLASS_MISSING
//! - CHAINPLAN_PLAN_MISSING_INDEX
//! - CHAINPLAN_PLAN_INVALID_FIELD_CHAIN
//! - CHAINPLAN_PLAN_CHAIN_TOO_LONG
//! - CHAINPLAN_PLAN_BASE_INDEX_MISMATCH
//! - CHAINPLAN_PLAN_UNSUITABLE_BASE_INDEX
//!
//! Index errors keep their own codes.
//!
//! Apart from `ClassNotFound` and wrapped index errors, planning errors mean
//! "this candidate cannot use an index". The selector downgrades them and the
//! query falls back to a full scan.

use thiserror::Error;

use crate::index::IndexError;

/// Result type for planning operations
pub type PlanResult<T> = Result<T, PlanningError>;

#[derive(Debug, Clone, Error)]
pub enum PlanningError {
    #[error("class '{0}' not found")]
    ClassNotFound(String),

    #[error("property '{property}' not found on class '{class}'")]
    PropertyNotFound { class: String, property: String },

    #[error("property '{class}.{property}' has no linked class")]
    LinkedClassMissing { class: String, property: String },

    #[error("no usable index on '{class}.{field}'")]
    MissingIndex { class: String, field: String },

    #[error("invalid field chain '{chain}': {reason}")]
    InvalidFieldChain { chain: String, reason: String },

    #[error("field chain '{chain}' has {hops} hops, more than the limit of {limit}")]
    ChainTooLong { chain: String, hops: usize, limit: usize },

    #[error("index '{index}' does not start with field '{field}'")]
    BaseIndexMismatch { index: String, field: String },

    #[error("index '{0}' cannot serve as the base of an index chain")]
    UnsuitableBaseIndex(String),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl PlanningError {
    /// Returns the string error code
    pub fn code(&self) -> &'static str {
        match self {
            PlanningError::ClassNotFound(_) => "CHAINPLAN_PLAN_CLASS_NOT_FOUND",
            PlanningError::PropertyNotFound { .. } => "CHAINPLAN_PLAN_PROPERTY_NOT_FOUND",
            PlanningError::LinkedClassMissing { .. } => "CHAINPLAN_PLAN_LINKED_CLASS_MISSING",
            PlanningError::MissingIndex { .. } => "CHAINPLAN_PLAN_MISSING_INDEX",
            PlanningError::InvalidFieldChain { .. } => "CHAINPLAN_PLAN_INVALID_FIELD_CHAIN",
            PlanningError::ChainTooLong { .. } => "CHAINPLAN_PLAN_CHAIN_TOO_LONG",
            PlanningError::BaseIndexMismatch { .. } => "CHAINPLAN_PLAN_BASE_INDEX_MISMATCH",
            PlanningError::UnsuitableBaseIndex(_) => "CHAINPLAN_PLAN_UNSUITABLE_BASE_INDEX",
            PlanningError::Index(err) => err.code(),
        }
    }

    /// True when the failure only rules out one candidate
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PlanningError::ClassNotFound(_) | PlanningError::Index(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = PlanningError::ChainTooLong {
            chain: "a.b.c".into(),
            hops: 3,
            limit: 2,
        };
        assert_eq!(err.code(), "CHAINPLAN_PLAN_CHAIN_TOO_LONG");
        assert!(err.to_string().contains("more than the limit of 2"));

        let wrapped: PlanningError = IndexError::Cancelled.into();
        assert_eq!(wrapped.code(), "CHAINPLAN_QUERY_CANCELLED");
    }

    #[test]
    fn test_recoverability() {
        assert!(PlanningError::MissingIndex {
            class: "Group".into(),
            field: "curator".into()
        }
        .is_recoverable());
        assert!(!PlanningError::ClassNotFound("Nope".into()).is_recoverable());
        assert!(!PlanningError::Index(IndexError::Timeout).is_recoverable());
    }
}
