//! Query executor integration
//!
//! Consumes a [`QueryPlan`](crate::planner::QueryPlan) and streams the record
//! ids its indexes produce. Chained proxies are used exactly like plain
//! indexes.
//!
//! # Execution Flow
//!
//! 1. Open one cursor per OR branch
//! 2. Stream record ids, dropping duplicates across branches
//! 3. Apply the limit
//!
//! # Invariants
//!
//! - A full-scan plan is handed back to the caller untouched
//! - Index engine failures degrade to a full scan
//! - Key conversion errors and cancellation fail the query

mod executor;

pub use executor::{FetchOutcome, IndexFetch, QueryExecutor};
