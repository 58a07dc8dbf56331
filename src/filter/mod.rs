//! Filter model for the planner
//!
//! Conditions arrive already parsed. This module holds the tree shape the
//! planner walks and the operator table that decides how each node can use
//! an index.
//!
//! # Design Principles
//!
//! - Operators are a closed enum described by a flat descriptor table
//! - Field references keep method calls so non-indexable paths are visible
//! - Field chains are never empty

mod chain;
mod condition;
mod operator;

pub use chain::{FieldChain, FieldItem, FieldRef};
pub use condition::{Condition, Operand};
pub use operator::{IndexReuseType, Operator, OperatorDescriptor};
